//! Error types and user-friendly error reporting.
//!
//! [`MirrorError`] enumerates the failure modes of the mirroring pipeline.
//! The taxonomy distinguishes conditions that abort a run from conditions
//! that only fail a single module:
//!
//! - **Probe failures** ([`MirrorError::ProbeFailed`]) - the registry was
//!   unreachable or rejected the existence check; fatal for that module.
//! - **Publish failures** ([`MirrorError::PublishFailed`]) - an upload was
//!   rejected; aborts the run in fail-fast mode, logged otherwise.
//! - **Toolchain failures** ([`MirrorError::ToolchainCommandError`],
//!   [`MirrorError::GoNotFound`]) - `go mod tidy` or graph computation
//!   failed.
//!
//! A missing local archive is deliberately *not* an error variant: the
//! materializer signals it with `Ok(None)` and the resolver turns it into a
//! failed counter, never into an `Err`.
//!
//! [`ErrorContext`] wraps a [`MirrorError`] with a suggestion and details for
//! terminal display; [`user_friendly_error`] converts any [`anyhow::Error`]
//! into that form at the CLI boundary.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for modmirror operations.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// The `go` executable was not found in PATH.
    #[error("go toolchain is not installed or not found in PATH")]
    GoNotFound,

    /// A `go` command returned a non-zero exit code.
    #[error("go command failed: {operation}")]
    ToolchainCommandError {
        /// The operation that failed (e.g. "mod graph", "mod tidy").
        operation: String,
        /// Standard error output of the command.
        stderr: String,
    },

    /// A `go` command exceeded its timeout.
    #[error("go command timed out after {seconds}s: {operation}")]
    ToolchainTimeout {
        /// The operation that timed out.
        operation: String,
        /// Configured timeout in seconds.
        seconds: u64,
    },

    /// The registry existence probe failed for transport or auth reasons.
    ///
    /// A clean "not found" response is not a probe failure; it simply means
    /// the module must come from its original source.
    #[error("registry probe failed for {module}: {reason}")]
    ProbeFailed {
        /// Module key that was being probed.
        module: String,
        /// Transport or HTTP-level reason.
        reason: String,
    },

    /// The registry rejected an artifact upload.
    #[error("failed to publish {module} to repository '{repo}': {reason}")]
    PublishFailed {
        /// Module key that was being published.
        module: String,
        /// Target repository name.
        repo: String,
        /// Rejection or transport reason.
        reason: String,
    },

    /// Registry authentication was rejected.
    #[error("registry authentication failed for {url}")]
    RegistryAuthFailed {
        /// Registry endpoint that rejected the credentials.
        url: String,
    },

    /// No registry URL is configured.
    #[error("no registry URL configured")]
    RegistryNotConfigured,

    /// The project manifest (go.mod) could not be found.
    #[error("go.mod not found in {dir}")]
    ManifestNotFound {
        /// Directory that was searched.
        dir: String,
    },

    /// A configuration file problem.
    #[error("configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error.
        message: String,
    },

    /// An archive in the module cache could not be read or extracted.
    #[error("failed to read module archive {path}: {reason}")]
    ArchiveError {
        /// Path to the offending archive.
        path: String,
        /// Underlying reason.
        reason: String,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error wrapper.
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Other uncategorized error.
    #[error("{message}")]
    Other {
        /// Description of the error.
        message: String,
    },
}

/// A [`MirrorError`] decorated with display-oriented context.
///
/// Suggestions are actionable steps shown in green; details explain why the
/// error occurred and are shown in yellow.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error.
    pub error: MirrorError,
    /// Optional suggestion for resolving the error.
    pub suggestion: Option<String>,
    /// Optional additional details about the error.
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a bare context from an error.
    #[must_use]
    pub const fn new(error: MirrorError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add explanatory details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details, and suggestion to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Recognizes [`MirrorError`] variants and common wrapped errors and attaches
/// tailored suggestions; everything else gets the full `anyhow` cause chain
/// in the message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(mirror_error) = error.downcast_ref::<MirrorError>() {
        return contextualize(mirror_error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(MirrorError::Other {
                    message: error.to_string(),
                })
                .with_suggestion("Check file ownership or re-run with elevated permissions")
                .with_details("modmirror could not read or write a required file");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(MirrorError::Other {
                    message: error.to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(MirrorError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in your config file")
        .with_details("Parsing errors are usually caused by missing quotes or mismatched brackets");
    }

    // Generic error: include the full cause chain for diagnostics.
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(MirrorError::Other { message })
}

fn contextualize(error: &MirrorError) -> ErrorContext {
    match error {
        MirrorError::GoNotFound => ErrorContext::new(MirrorError::GoNotFound)
            .with_suggestion("Install Go from https://go.dev/dl/ and ensure it is in your PATH")
            .with_details("modmirror shells out to the go tool for graph computation and tidy"),
        MirrorError::RegistryNotConfigured => {
            ErrorContext::new(MirrorError::RegistryNotConfigured)
                .with_suggestion("Run 'modmirror config set-registry <url>' first")
        }
        MirrorError::RegistryAuthFailed { url } => {
            ErrorContext::new(MirrorError::RegistryAuthFailed { url: url.clone() })
                .with_suggestion("Run 'modmirror config set-token <token>' to update credentials")
                .with_details("The registry rejected the configured credentials")
        }
        MirrorError::ManifestNotFound { dir } => {
            ErrorContext::new(MirrorError::ManifestNotFound { dir: dir.clone() })
                .with_suggestion("Run modmirror from a directory containing go.mod, or pass --project-dir")
        }
        MirrorError::ToolchainCommandError { operation, stderr } => {
            ErrorContext::new(MirrorError::ToolchainCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            })
            .with_details(stderr.clone())
        }
        other => ErrorContext::new(MirrorError::Other {
            message: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_failure_message_names_module() {
        let err = MirrorError::ProbeFailed {
            module: "example.com/m@v1.0.0".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("example.com/m@v1.0.0"));
    }

    #[test]
    fn friendly_error_recognizes_go_not_found() {
        let ctx = user_friendly_error(anyhow::Error::new(MirrorError::GoNotFound));
        assert!(ctx.suggestion.as_deref().unwrap_or_default().contains("go.dev"));
    }

    #[test]
    fn friendly_error_includes_cause_chain() {
        let err = anyhow::anyhow!("root cause").context("failed to mirror");
        let ctx = user_friendly_error(err);
        assert!(ctx.error.to_string().contains("Caused by"));
        assert!(ctx.error.to_string().contains("root cause"));
    }
}
