//! Shared data models for module identification and materialized modules.
//!
//! The central type is [`ModuleId`], the name+version pair that identifies a
//! Go module everywhere in modmirror. Producers emit module keys in two
//! spellings (`name@version` from the module graph, `name:version` from build
//! metadata); both normalize to the same [`ModuleId`] before any cache lookup.
//!
//! A [`Module`] is a dependency that has been materialized from the local
//! module cache: its mod-file bytes, the path to its archive, and the two
//! checksum records that accompany every upload.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Result, bail};

/// Identifies a module by name and version.
///
/// The `name` is kept in its import-path form; use [`ModuleId::escaped_name`]
/// whenever the name participates in an on-disk or registry path, since
/// upper-case letters are not permitted there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleId {
    /// Module import path, e.g. `github.com/Sirupsen/logrus`.
    pub name: String,
    /// Module version, e.g. `v1.9.3`.
    pub version: String,
}

impl ModuleId {
    /// Create a module id from name and version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parse a producer key in either `name@version` or `name:version` form.
    ///
    /// Both spellings occur in the wild: `go mod graph` emits `@`, build-info
    /// identifiers use `:`. Returns an error when the key has no separator or
    /// an empty name/version component.
    pub fn parse_key(key: &str) -> Result<Self> {
        let (name, version) = match key.rsplit_once('@') {
            Some(parts) => parts,
            None => match key.split_once(':') {
                Some(parts) => parts,
                None => bail!("invalid module key '{key}': missing '@' or ':' separator"),
            },
        };
        if name.is_empty() || version.is_empty() {
            bail!("invalid module key '{key}': empty name or version");
        }
        Ok(Self::new(name, version))
    }

    /// The canonical cache key, `name@version`.
    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// The escaped on-disk form of the module name.
    ///
    /// Each upper-case ASCII letter becomes `!` followed by its lower-case
    /// form, matching the module cache and proxy path encoding. Stable under
    /// repeated application since the output contains no upper-case letters.
    pub fn escaped_name(&self) -> String {
        escape_module_path(&self.name)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Escape a module path for use as a file-system or registry path segment.
pub fn escape_module_path(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(c.to_ascii_lowercase());
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Checksum record attached to one uploaded artifact (mod file or archive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    /// Build-info identifier, `name:version`.
    pub id: String,
    /// Hex-encoded SHA-1 of the artifact bytes.
    pub sha1: String,
    /// Hex-encoded MD5 of the artifact bytes.
    pub md5: String,
}

/// A module materialized from the local module cache.
///
/// A `Module` only exists when an archive binary was found in the cache; the
/// materializer returns `None` otherwise, which callers treat as a skip
/// signal rather than an error.
#[derive(Debug, Clone)]
pub struct Module {
    /// Identity of this module.
    pub id: ModuleId,
    /// Raw bytes of the module's `.mod` file.
    pub mod_content: Vec<u8>,
    /// Path to the module's archive in the local module cache.
    pub archive_path: PathBuf,
    /// Exactly two records: one for the mod file, one for the archive.
    pub build_records: Vec<DependencyRecord>,
}

/// A node in the resolution tree built during deep (recursive) mirroring.
///
/// Distinct from the raw dependency graph: it is only populated for modules
/// visited in recursive mode and is reconstructed per invocation.
#[derive(Debug)]
pub struct PackageWithDeps {
    /// The materialized module at this node.
    pub module: Module,
    /// Resolution subtrees for this module's own dependencies.
    pub transitive: Vec<PackageWithDeps>,
}

/// Final counters of one resolve-and-publish run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Modules published (or confirmed mirrored) this run.
    pub succeeded: usize,
    /// Modules that reached a failure state this run.
    pub failed: usize,
    /// Unique modules processed past the memoization check.
    pub total: usize,
}

impl fmt::Display for ResolutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed out of {} total",
            self.succeeded, self.failed, self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_key_accepts_both_separators() {
        let at = ModuleId::parse_key("github.com/pkg/errors@v0.9.1").unwrap();
        let colon = ModuleId::parse_key("github.com/pkg/errors:v0.9.1").unwrap();
        assert_eq!(at, colon);
        assert_eq!(at.key(), "github.com/pkg/errors@v0.9.1");
    }

    #[test]
    fn parse_key_prefers_version_after_last_at() {
        // Names never contain '@', but be robust to pseudo-version noise.
        let id = ModuleId::parse_key("example.com/m@v0.0.0-20230101000000-abcdef123456").unwrap();
        assert_eq!(id.name, "example.com/m");
        assert_eq!(id.version, "v0.0.0-20230101000000-abcdef123456");
    }

    #[test]
    fn parse_key_rejects_malformed() {
        assert!(ModuleId::parse_key("no-separator").is_err());
        assert!(ModuleId::parse_key("@v1.0.0").is_err());
        assert!(ModuleId::parse_key("example.com/m@").is_err());
    }

    #[test]
    fn escape_replaces_uppercase() {
        let id = ModuleId::new("github.com/Sirupsen/logrus", "v1.0.6");
        assert_eq!(id.escaped_name(), "github.com/!sirupsen/logrus");
    }

    #[test]
    fn escape_is_idempotent() {
        let once = escape_module_path("github.com/Azure/azure-sdk-for-go");
        let twice = escape_module_path(&once);
        assert_eq!(once, "github.com/!azure/azure-sdk-for-go");
        assert_eq!(once, twice);
    }

    #[test]
    fn escape_leaves_lowercase_untouched() {
        assert_eq!(escape_module_path("golang.org/x/text"), "golang.org/x/text");
    }
}
