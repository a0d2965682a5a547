//! Module materialization from the local module cache.
//!
//! The materializer turns a [`ModuleId`] into a [`Module`] value: the
//! mod-file bytes, the archive path, and the two checksum records the
//! registry wants as build metadata. A module whose archive was never fully
//! downloaded by the toolchain is *not* an error; it is reported as `None`
//! and the caller treats it as "not resolvable locally".

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::{DependencyRecord, Module, ModuleId};
use crate::store::{ContentStore, mod_file_path_for_archive};

/// Produces [`Module`] values from the local module cache.
pub struct ModuleMaterializer<'a, S> {
    store: &'a S,
    cache_path: PathBuf,
}

impl<'a, S: ContentStore> ModuleMaterializer<'a, S> {
    /// Create a materializer reading from the cache rooted at `cache_path`
    /// (typically `$GOMODCACHE/cache/download`).
    pub fn new(store: &'a S, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            cache_path: cache_path.into(),
        }
    }

    /// Materialize `id`, or `None` when no archive binary exists locally.
    ///
    /// A missing archive reflects a known toolchain quirk where a module
    /// appears in the graph without its binary ever being downloaded;
    /// callers skip such modules. I/O errors on files that do exist are
    /// propagated.
    pub fn materialize(&self, id: &ModuleId) -> Result<Option<Module>> {
        let Some(archive_path) = self.store.find_archive(&self.cache_path, id)? else {
            return Ok(None);
        };

        let mod_path = mod_file_path_for_archive(&archive_path);
        let mod_content = std::fs::read(&mod_path)
            .with_context(|| format!("failed to read mod file {}", mod_path.display()))?;

        let records = build_records(self.store, id, &mod_content, &archive_path)?;
        Ok(Some(Module {
            id: id.clone(),
            mod_content,
            archive_path,
            build_records: records,
        }))
    }

    /// Root of the module cache this materializer reads from.
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Path of the cached `.mod` file for `id`, whether or not it exists yet.
    pub fn mod_file_path(&self, id: &ModuleId) -> PathBuf {
        self.cache_path
            .join(id.escaped_name())
            .join("@v")
            .join(format!("{}.mod", id.version))
    }
}

/// Build the two checksum records for a module: mod file first, archive
/// second.
pub fn build_records<S: ContentStore>(
    store: &S,
    id: &ModuleId,
    mod_content: &[u8],
    archive_path: &Path,
) -> Result<Vec<DependencyRecord>> {
    let record_id = format!("{}:{}", id.name, id.version);

    let mod_sums = crate::store::checksum_bytes(mod_content);
    let zip_sums = store
        .checksum(archive_path)
        .with_context(|| format!("failed to checksum archive for {id}"))?;

    Ok(vec![
        DependencyRecord {
            id: record_id.clone(),
            sha1: mod_sums.sha1,
            md5: mod_sums.md5,
        },
        DependencyRecord {
            id: record_id,
            sha1: zip_sums.sha1,
            md5: zip_sums.md5,
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsContentStore;
    use tempfile::TempDir;

    fn seed_module(root: &Path, id: &ModuleId, with_mod: bool) {
        let dir = root.join(id.escaped_name()).join("@v");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{}.zip", id.version)), b"zip-bytes").unwrap();
        if with_mod {
            std::fs::write(
                dir.join(format!("{}.mod", id.version)),
                format!("module {}\n", id.name),
            )
            .unwrap();
        }
    }

    #[test]
    fn materializes_cached_module_with_two_records() {
        let temp = TempDir::new().unwrap();
        let id = ModuleId::new("github.com/a/x", "v1.0.0");
        seed_module(temp.path(), &id, true);

        let store = FsContentStore::new();
        let materializer = ModuleMaterializer::new(&store, temp.path());
        let module = materializer.materialize(&id).unwrap().unwrap();

        assert_eq!(module.id, id);
        assert_eq!(module.mod_content, b"module github.com/a/x\n");
        assert_eq!(module.build_records.len(), 2);
        assert_eq!(module.build_records[0].id, "github.com/a/x:v1.0.0");
        assert_ne!(module.build_records[0].sha1, module.build_records[1].sha1);
    }

    #[test]
    fn missing_archive_is_a_skip_not_an_error() {
        let temp = TempDir::new().unwrap();
        let store = FsContentStore::new();
        let materializer = ModuleMaterializer::new(&store, temp.path());
        let id = ModuleId::new("github.com/a/x", "v1.0.0");

        assert!(materializer.materialize(&id).unwrap().is_none());
    }

    #[test]
    fn missing_mod_file_with_present_archive_is_an_error() {
        let temp = TempDir::new().unwrap();
        let id = ModuleId::new("github.com/a/x", "v1.0.0");
        seed_module(temp.path(), &id, false);

        let store = FsContentStore::new();
        let materializer = ModuleMaterializer::new(&store, temp.path());
        assert!(materializer.materialize(&id).is_err());
    }

    #[test]
    fn mod_file_path_uses_escaped_name() {
        let temp = TempDir::new().unwrap();
        let store = FsContentStore::new();
        let materializer = ModuleMaterializer::new(&store, temp.path());
        let id = ModuleId::new("github.com/Azure/go-autorest", "v14.2.0");

        let path = materializer.mod_file_path(&id);
        assert!(path.to_string_lossy().contains("!azure"));
        assert!(path.to_string_lossy().ends_with("v14.2.0.mod"));
    }
}
