//! Type-safe builder for invoking the `go` tool.
//!
//! Provides a fluent API for constructing and executing go commands with
//! consistent error handling, output capture, and timeout management, so the
//! rest of the crate never touches `tokio::process` directly.

use anyhow::Result;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::MirrorError;

/// Default timeout for go invocations; graph computation over a cold module
/// cache can take minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Builder for a single `go` invocation.
///
/// # Examples
///
/// ```rust,ignore
/// let output = GoCommand::new()
///     .args(["mod", "graph"])
///     .current_dir(&module_dir)
///     .env("GOPROXY", "direct")
///     .execute()
///     .await?;
/// ```
pub struct GoCommand {
    /// Arguments passed to go (e.g. ["mod", "tidy"]).
    args: Vec<String>,
    /// Working directory for the invocation.
    current_dir: Option<std::path::PathBuf>,
    /// Environment variables to set for the child process.
    env_vars: Vec<(String, String)>,
    /// Maximum duration to wait for completion.
    timeout_duration: Duration,
    /// Optional context string (typically a module id) for log lines.
    context: Option<String>,
}

/// Captured output of a completed go command.
pub struct GoCommandOutput {
    /// Decoded standard output.
    pub stdout: String,
    /// Decoded standard error.
    pub stderr: String,
}

impl Default for GoCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            env_vars: Vec::new(),
            timeout_duration: DEFAULT_TIMEOUT,
            context: None,
        }
    }
}

impl GoCommand {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory for the invocation.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Override the default 5-minute timeout.
    pub const fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Attach a context identifier (typically the module id) to log lines,
    /// to distinguish interleaved invocations.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Execute the command, capturing output.
    ///
    /// Returns [`MirrorError::GoNotFound`] when the go binary is missing and
    /// [`MirrorError::ToolchainCommandError`] on a non-zero exit status.
    pub async fn execute(self) -> Result<GoCommandOutput> {
        let go = which::which("go").map_err(|_| MirrorError::GoNotFound)?;
        let operation = self.args.join(" ");

        if let Some(ref ctx) = self.context {
            tracing::debug!(target: "go", "({}) Executing command: go {}", ctx, operation);
        } else {
            tracing::debug!(target: "go", "Executing command: go {}", operation);
        }

        let mut cmd = Command::new(go);
        cmd.args(&self.args);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env_vars {
            tracing::trace!(target: "go", "Setting env var: {}={}", key, value);
            cmd.env(key, value);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());

        let output = match timeout(self.timeout_duration, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(MirrorError::ToolchainTimeout {
                    operation,
                    seconds: self.timeout_duration.as_secs(),
                }
                .into());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            tracing::debug!(target: "go", "Command failed ({}): {}", output.status, stderr.trim());
            return Err(MirrorError::ToolchainCommandError { operation, stderr }.into());
        }

        Ok(GoCommandOutput { stdout, stderr })
    }
}
