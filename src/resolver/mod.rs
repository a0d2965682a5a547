//! Dependency resolution and publication: the core mirroring pipeline.
//!
//! Given a merged dependency graph, the [`DependencyResolver`] walks every
//! module exactly once, decides whether it is already mirrored in the target
//! registry, materializes it from the local module cache, optionally expands
//! its own transitive graph (deep mode), and publishes whatever is missing.
//!
//! The walk is memoized through a caller-owned [`ResolutionCache`]: the
//! first branch to probe a module claims it, which is what breaks both
//! duplicate work across shared transitive dependencies and any cycle the
//! input graph might contain. Deep mode recurses depth-first, so a module's
//! dependencies are always published before the module itself (post-order).
//!
//! Failure policy differs by mode:
//! - **flat** (non-recursive): a publish failure aborts the whole run
//!   (fail-fast);
//! - **deep** (recursive): failures are logged with the offending module id
//!   and sibling resolution continues (continue-on-error).
//!
//! In both modes the final counters always reach the caller, even on an
//! aborted run ([`AbortedRun`] carries the report).

pub mod cache;
pub mod materializer;
pub mod publisher;


pub use cache::ResolutionCache;
pub use materializer::ModuleMaterializer;
pub use publisher::Publisher;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use thiserror::Error;

use crate::manifest::{merge_graph, parse_replace_directives};
use crate::models::{Module, ModuleId, PackageWithDeps, ResolutionReport};
use crate::registry::{AvailabilityChecker, Registry};
use crate::store::ContentStore;
use crate::toolchain::{ResolutionSource, Toolchain};
use crate::utils::atomic_write;

/// Matches a manifest that declares at least one requirement.
static REQUIRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*require(\s+\S|\s*\()").expect("valid require regex"));

/// Matches stray indirect markers left behind after mirroring.
static INDIRECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"// indirect").expect("valid indirect regex"));

/// A run-aborting failure. Carries the counters accumulated up to the abort
/// so partial progress is always reportable.
#[derive(Debug, Error)]
#[error("mirroring aborted ({report})")]
pub struct AbortedRun {
    /// Counters at the moment of the abort.
    pub report: ResolutionReport,
    /// The failure that triggered the abort.
    #[source]
    pub source: anyhow::Error,
}

/// Options for one resolve-and-publish run.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Target repository to probe and publish into.
    pub target_repo: String,
    /// Root of the local module cache (`$GOMODCACHE/cache/download`).
    pub module_cache: PathBuf,
    /// Deep-mirror mode: also resolve each dependency's own transitive graph
    /// before publishing it.
    pub recursive: bool,
}

/// Orchestrates resolution and publication over the collaborator
/// capabilities.
pub struct DependencyResolver<'a, T, R, S> {
    toolchain: &'a T,
    registry: &'a R,
    store: &'a S,
    cache: &'a ResolutionCache,
    options: ResolveOptions,
}

impl<'a, T, R, S> DependencyResolver<'a, T, R, S>
where
    T: Toolchain,
    R: Registry,
    S: ContentStore,
{
    /// Create a resolver over the given collaborators and caller-owned cache.
    pub fn new(
        toolchain: &'a T,
        registry: &'a R,
        store: &'a S,
        cache: &'a ResolutionCache,
        options: ResolveOptions,
    ) -> Self {
        Self {
            toolchain,
            registry,
            store,
            cache,
            options,
        }
    }

    /// Resolve and publish every module in `root_graph`.
    ///
    /// Iteration order over the graph is insignificant for correctness; the
    /// cache enforces at-most-once processing regardless of which branch
    /// discovers a shared dependency first. Returns the final counters, also
    /// on abort.
    pub async fn resolve_and_publish(
        &self,
        root_graph: &HashMap<String, bool>,
    ) -> Result<ResolutionReport, AbortedRun> {
        for key in root_graph.keys() {
            let id = match ModuleId::parse_key(key) {
                Ok(id) => id,
                Err(e) => {
                    tracing::debug!("skipping unparsable graph entry '{}': {}", key, e);
                    continue;
                }
            };

            if let Err(e) = self.resolve(id.clone()).await {
                if self.options.recursive {
                    tracing::warn!("failed to resolve {}: {:#}", id, e);
                } else {
                    return Err(AbortedRun {
                        report: self.cache.report(),
                        source: e.context(format!("while resolving {id}")),
                    });
                }
            }
        }

        Ok(self.cache.report())
    }

    /// Resolve one module: probe, materialize, optionally expand, publish.
    ///
    /// Returns the resolution-tree node for this module, or `None` when the
    /// module was already claimed or was skipped. Boxed because deep mode
    /// recurses through it.
    fn resolve(
        &self,
        id: ModuleId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PackageWithDeps>>> + '_>> {
        Box::pin(async move {
            let key = id.key();

            // Memoization: any recorded value means another branch already
            // claimed this module. This check alone breaks graph cycles.
            if self.cache.lookup(&key).is_some() {
                tracing::debug!("{} already processed, skipping", id);
                return Ok(None);
            }

            tracing::debug!("resolving {}", id);
            let checker = AvailabilityChecker::new(self.registry, &self.options.target_repo);
            let available = checker.exists(&id).await?;
            // Reserve the slot before doing any further work so sibling
            // branches see this module as claimed rather than re-probing.
            self.cache.record_probe(&key, available);

            let materializer = ModuleMaterializer::new(self.store, &self.options.module_cache);
            // The slot is already reserved, so any failure from here on must
            // move the failed counter exactly once before surfacing.
            let mut module = match materializer.materialize(&id) {
                Ok(Some(module)) => module,
                Ok(None) => {
                    // The graph references a module whose binary the
                    // toolchain never downloaded. Skip it without failing
                    // siblings.
                    tracing::warn!("no local archive for {}, counting as failed", id);
                    self.cache.record_failure(&key);
                    return Ok(None);
                }
                Err(e) => {
                    self.cache.record_failure(&key);
                    return Err(e);
                }
            };

            let mut transitive = Vec::new();
            if self.options.recursive {
                match self.expand(&materializer, &mut module, available).await {
                    Ok(children) => transitive = children,
                    Err(e) => {
                        tracing::warn!("abandoning expansion of {}: {:#}", id, e);
                        self.cache.record_failure(&key);
                        return Ok(None);
                    }
                }
            }

            if !self.cache.is_uploaded(&key) {
                let publisher = Publisher::new(self.registry, &self.options.target_repo);
                match publisher.publish(&module).await {
                    Ok(()) => self.cache.record_success(&key),
                    Err(e) => {
                        self.cache.record_failure(&key);
                        if self.options.recursive {
                            tracing::warn!("failed to publish {}: {:#}", id, e);
                        } else {
                            return Err(e);
                        }
                    }
                }
            }

            Ok(Some(PackageWithDeps { module, transitive }))
        })
    }

    /// Deep-mode expansion: compute the module's own transitive graph and
    /// recurse into it before the module itself is published.
    ///
    /// The module's archive is extracted into a scoped temporary directory
    /// that is removed on every exit path. On return, `module.mod_content`
    /// and its checksum records reflect any tidy-normalization performed
    /// here, and the normalized mod file has been written back into the
    /// local module cache.
    async fn expand<'m>(
        &self,
        materializer: &ModuleMaterializer<'m, S>,
        module: &mut Module,
        available: bool,
    ) -> Result<Vec<PackageWithDeps>> {
        let id = module.id.clone();
        // Modules already mirrored resolve their own dependencies through
        // the registry; everything else goes to the original source.
        let source = if available {
            ResolutionSource::Registry
        } else {
            ResolutionSource::Origin
        };

        let workdir = tempfile::tempdir().context("failed to create extraction directory")?;
        self.store.extract_archive(&module.archive_path, workdir.path())?;
        let module_dir = locate_module_dir(workdir.path(), &id);

        // For already-mirrored modules the registry's mod file is
        // authoritative; refresh our copy before expanding.
        if available {
            match self
                .registry
                .download_mod_file(&self.options.target_repo, &id, workdir.path())
                .await
            {
                Ok(path) => {
                    module.mod_content = std::fs::read(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                }
                Err(e) => {
                    tracing::debug!("using cached mod file for {}: {:#}", id, e);
                }
            }
        }

        let manifest = module_dir.join("go.mod");
        std::fs::write(&manifest, &module.mod_content)
            .with_context(|| format!("failed to write {}", manifest.display()))?;

        // An empty mod file cannot produce a graph; tidy populates it first.
        let mod_text = String::from_utf8_lossy(&module.mod_content).into_owned();
        if !REQUIRE_RE.is_match(&mod_text) {
            tracing::debug!("mod file of {} has no requirements, running tidy", id);
            self.toolchain.tidy(&module_dir, source).await?;
            module.mod_content = std::fs::read(&manifest)
                .with_context(|| format!("failed to re-read {}", manifest.display()))?;
        }

        let mut graph = self.toolchain.compute_graph(&module_dir, source).await?;
        let directives = parse_replace_directives(&String::from_utf8_lossy(&module.mod_content));
        merge_graph(&mut graph, &directives);
        tracing::debug!("{} has {} modules in its own graph", id, graph.len());

        let mut transitive = Vec::new();
        for key in graph.keys() {
            if self.cache.lookup(key).is_some() {
                continue;
            }
            let child_id = match ModuleId::parse_key(key) {
                Ok(child_id) => child_id,
                Err(e) => {
                    tracing::debug!("skipping unparsable graph entry '{}': {}", key, e);
                    continue;
                }
            };
            // Depth-first: the dependency is fully resolved and published
            // before this module is.
            match self.resolve(child_id.clone()).await {
                Ok(Some(child)) => transitive.push(child),
                Ok(None) => {}
                Err(e) => tracing::warn!("failed to resolve {}: {:#}", child_id, e),
            }
        }

        // Mirroring can leave indirect markers that no longer match what was
        // actually published; normalize before the mod file is cached.
        let mod_text = std::fs::read_to_string(&manifest)
            .with_context(|| format!("failed to re-read {}", manifest.display()))?;
        if INDIRECT_RE.is_match(&mod_text) {
            tracing::debug!("{} has stray indirect markers, re-running tidy", id);
            self.toolchain.tidy(&module_dir, source).await?;
        }
        module.mod_content = std::fs::read(&manifest)
            .with_context(|| format!("failed to re-read {}", manifest.display()))?;

        // Persist the normalized mod file and refresh the checksum records
        // so the upcoming upload matches what was written back.
        let cached_mod = materializer.mod_file_path(&id);
        atomic_write(&cached_mod, &module.mod_content)
            .with_context(|| format!("failed to update cached mod file for {id}"))?;
        module.build_records = materializer::build_records(
            self.store,
            &id,
            &module.mod_content,
            &module.archive_path,
        )?;

        Ok(transitive)
    }
}

/// Locate the extracted module root inside `workdir`.
///
/// Module archives nest their content under a `name@version/` prefix; fall
/// back to the only extracted directory, then to `workdir` itself.
fn locate_module_dir(workdir: &Path, id: &ModuleId) -> PathBuf {
    let nested = workdir.join(format!("{}@{}", id.name, id.version));
    if nested.is_dir() {
        return nested;
    }

    let mut dirs = std::fs::read_dir(workdir)
        .into_iter()
        .flatten()
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir());
    if let (Some(only), None) = (dirs.next(), dirs.next()) {
        return only;
    }
    workdir.to_path_buf()
}
