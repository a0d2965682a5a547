//! Local module-cache content access: archive discovery, checksums, and
//! archive extraction.
//!
//! The Go toolchain lays downloaded modules out under
//! `$GOMODCACHE/cache/download/<escaped-name>/@v/<version>.{mod,zip}`.
//! Modules fetched straight from version control can land in a sibling
//! directory of the configured cache path, so archive lookup probes the
//! parent directory as a fallback before concluding an archive is missing.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use md5::Md5;
use sha1::{Digest, Sha1};

use crate::core::MirrorError;
use crate::models::ModuleId;

/// SHA-1 and MD5 digests of one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactChecksums {
    /// Hex-encoded SHA-1.
    pub sha1: String,
    /// Hex-encoded MD5.
    pub md5: String,
}

/// Local module-cache capability consumed by the materializer.
pub trait ContentStore {
    /// Find the archive for `id` under `cache_path`, probing the parent cache
    /// directory as a fallback. Returns `None` when no archive exists.
    fn find_archive(&self, cache_path: &Path, id: &ModuleId) -> Result<Option<PathBuf>>;

    /// Compute SHA-1 and MD5 over the file at `path`.
    fn checksum(&self, path: &Path) -> Result<ArtifactChecksums>;

    /// Extract a module zip archive into `dest_dir`.
    fn extract_archive(&self, path: &Path, dest_dir: &Path) -> Result<()>;
}

/// Filesystem-backed [`ContentStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FsContentStore;

impl FsContentStore {
    /// Create a new store.
    pub const fn new() -> Self {
        Self
    }
}

impl ContentStore for FsContentStore {
    fn find_archive(&self, cache_path: &Path, id: &ModuleId) -> Result<Option<PathBuf>> {
        let relative = archive_relative_path(id);

        let direct = cache_path.join(&relative);
        if direct.is_file() {
            return Ok(Some(direct));
        }

        // Proxy-downloaded and VCS-downloaded archives can live in sibling
        // directories of the cache root; probe one level up before giving up.
        if let Some(parent) = cache_path.parent() {
            for entry in walkdir::WalkDir::new(parent)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_dir())
            {
                let candidate = entry.path().join(&relative);
                if candidate.is_file() {
                    tracing::debug!(
                        "archive for {} found in sibling cache directory {}",
                        id,
                        entry.path().display()
                    );
                    return Ok(Some(candidate));
                }
            }
        }

        tracing::debug!("no archive in module cache for {}", id);
        Ok(None)
    }

    fn checksum(&self, path: &Path) -> Result<ArtifactChecksums> {
        let file = File::open(path)
            .with_context(|| format!("failed to open {} for checksumming", path.display()))?;
        let mut reader = BufReader::new(file);
        let mut sha1 = Sha1::new();
        let mut md5 = Md5::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            sha1.update(&buf[..n]);
            md5.update(&buf[..n]);
        }
        Ok(ArtifactChecksums {
            sha1: hex::encode(sha1.finalize()),
            md5: hex::encode(md5.finalize()),
        })
    }

    fn extract_archive(&self, path: &Path, dest_dir: &Path) -> Result<()> {
        let file = File::open(path).map_err(|e| MirrorError::ArchiveError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut archive =
            zip::ZipArchive::new(BufReader::new(file)).map_err(|e| MirrorError::ArchiveError {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        archive.extract(dest_dir).map_err(|e| MirrorError::ArchiveError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

/// Compute SHA-1 and MD5 over an in-memory byte buffer.
pub fn checksum_bytes(bytes: &[u8]) -> ArtifactChecksums {
    ArtifactChecksums {
        sha1: hex::encode(Sha1::digest(bytes)),
        md5: hex::encode(Md5::digest(bytes)),
    }
}

/// Relative path of a module's archive inside a cache directory.
fn archive_relative_path(id: &ModuleId) -> PathBuf {
    PathBuf::from(id.escaped_name()).join("@v").join(format!("{}.zip", id.version))
}

/// Path of the `.mod` file sitting beside a cached archive.
pub fn mod_file_path_for_archive(archive_path: &Path) -> PathBuf {
    archive_path.with_extension("mod")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed_archive(root: &Path, id: &ModuleId) -> PathBuf {
        let dir = root.join(id.escaped_name()).join("@v");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.zip", id.version));
        std::fs::write(&path, b"zip-bytes").unwrap();
        path
    }

    #[test]
    fn find_archive_in_primary_cache() {
        let temp = TempDir::new().unwrap();
        let id = ModuleId::new("github.com/a/x", "v1.0.0");
        let expected = seed_archive(temp.path(), &id);

        let store = FsContentStore::new();
        let found = store.find_archive(temp.path(), &id).unwrap();
        assert_eq!(found, Some(expected));
    }

    #[test]
    fn find_archive_escapes_uppercase_names() {
        let temp = TempDir::new().unwrap();
        let id = ModuleId::new("github.com/Sirupsen/logrus", "v1.0.6");
        let expected = seed_archive(temp.path(), &id);
        assert!(expected.to_string_lossy().contains("!sirupsen"));

        let store = FsContentStore::new();
        assert_eq!(store.find_archive(temp.path(), &id).unwrap(), Some(expected));
    }

    #[test]
    fn find_archive_falls_back_to_sibling_directory() {
        let temp = TempDir::new().unwrap();
        let primary = temp.path().join("download");
        std::fs::create_dir_all(&primary).unwrap();
        let sibling = temp.path().join("vcs");
        let id = ModuleId::new("github.com/a/x", "v1.0.0");
        let expected = seed_archive(&sibling, &id);

        let store = FsContentStore::new();
        assert_eq!(store.find_archive(&primary, &id).unwrap(), Some(expected));
    }

    #[test]
    fn find_archive_missing_is_none() {
        let temp = TempDir::new().unwrap();
        let id = ModuleId::new("github.com/a/x", "v9.9.9");
        let store = FsContentStore::new();
        assert_eq!(store.find_archive(temp.path(), &id).unwrap(), None);
    }

    #[test]
    fn checksums_match_known_digests() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("artifact");
        std::fs::write(&path, b"abc").unwrap();

        let store = FsContentStore::new();
        let sums = store.checksum(&path).unwrap();
        assert_eq!(sums.sha1, "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(sums.md5, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(checksum_bytes(b"abc"), sums);
    }
}
