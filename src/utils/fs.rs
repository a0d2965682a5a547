//! File system operations with atomic writes.

use std::path::Path;

use anyhow::{Context, Result};

/// Ensure a directory exists, creating it and any parents if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Write a file atomically via a temporary file in the same directory.
///
/// The rename is atomic on all supported platforms, so readers never observe
/// a partially written file. The parent directory is created if needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    std::io::Write::write_all(&mut temp, content)
        .with_context(|| format!("failed to write temp file for {}", path.display()))?;
    temp.persist(path)
        .with_context(|| format!("failed to persist {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a").join("b").join("file.mod");
        atomic_write(&path, b"module example.com/m\n").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"module example.com/m\n");
    }

    #[test]
    fn atomic_write_replaces_existing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file.mod");
        atomic_write(&path, b"old").unwrap();
        atomic_write(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested");
        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
