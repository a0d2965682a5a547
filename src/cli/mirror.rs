//! The `mirror` command: resolve a project's dependency graph and publish
//! every missing module into the target registry.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::GlobalConfig;
use crate::core::MirrorError;
use crate::manifest::{merge_graph, parse_replace_directives};
use crate::registry::HttpRegistry;
use crate::resolver::{DependencyResolver, ResolutionCache, ResolveOptions};
use crate::store::FsContentStore;
use crate::toolchain::{GoCommand, GoToolchain, ResolutionSource, Toolchain};

/// Arguments for `modmirror mirror`.
#[derive(Args)]
pub struct MirrorCommand {
    /// Target repository (defaults to the configured repository).
    #[arg(long)]
    repo: Option<String>,

    /// Deep-mirror mode: also resolve and publish every transitive
    /// dependency's own dependency graph.
    #[arg(long)]
    recursive: bool,

    /// Project directory containing go.mod.
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Local module cache download directory (defaults to
    /// `$GOMODCACHE/cache/download`).
    #[arg(long)]
    module_cache: Option<PathBuf>,
}

impl MirrorCommand {
    /// Execute the mirror run.
    pub async fn execute(self, config_path: Option<PathBuf>, no_progress: bool) -> Result<()> {
        let config = GlobalConfig::load_with_optional(config_path).await?;
        let registry_url = config.registry_url()?.to_string();
        let repo = self
            .repo
            .clone()
            .or_else(|| config.registry.repo.clone())
            .ok_or_else(|| MirrorError::ConfigError {
                message: "no target repository given; pass --repo or run \
                          'modmirror config set-repo <name>'"
                    .to_string(),
            })?;

        let registry = HttpRegistry::new(&registry_url, config.credentials());
        let toolchain = GoToolchain::with_registry_proxy(format!("{registry_url}/{repo}"));
        let store = FsContentStore::new();

        let module_cache = match self.module_cache.clone() {
            Some(path) => path,
            None => default_module_cache().await?,
        };
        tracing::debug!("using module cache at {}", module_cache.display());

        // Root graph: the project's own graph merged with its replace
        // directives, resolved from the original sources.
        let manifest = toolchain.read_manifest(&self.project_dir).await?;
        let mut graph = toolchain
            .compute_graph(&self.project_dir, ResolutionSource::Origin)
            .await?;
        merge_graph(&mut graph, &parse_replace_directives(&String::from_utf8_lossy(&manifest)));
        tracing::info!("resolved {} modules in the dependency graph", graph.len());

        let spinner = if no_progress {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner} {msg}").expect("valid spinner template"),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb.set_message(format!("Mirroring {} modules into '{}'...", graph.len(), repo));
            pb
        };

        let cache = ResolutionCache::new();
        let resolver = DependencyResolver::new(
            &toolchain,
            &registry,
            &store,
            &cache,
            ResolveOptions {
                target_repo: repo.clone(),
                module_cache,
                recursive: self.recursive,
            },
        );

        let outcome = resolver.resolve_and_publish(&graph).await;
        spinner.finish_and_clear();

        match outcome {
            Ok(report) => {
                println!(
                    "{} mirrored {} modules into '{}' ({})",
                    "✓".green().bold(),
                    report.succeeded,
                    repo,
                    report
                );
                if report.failed > 0 {
                    println!(
                        "{} {} modules could not be mirrored; re-run with --verbose for details",
                        "!".yellow().bold(),
                        report.failed
                    );
                }
                Ok(())
            }
            Err(aborted) => {
                // Partial progress is still reportable on an aborted run.
                eprintln!("{} aborted after {}", "✗".red().bold(), aborted.report);
                Err(aborted.into())
            }
        }
    }
}

/// Resolve the default module cache download directory via `go env`.
async fn default_module_cache() -> Result<PathBuf> {
    let output = GoCommand::new()
        .args(["env", "GOMODCACHE"])
        .execute()
        .await
        .context("failed to locate the module cache")?;
    let root = output.stdout.trim();
    let root = if root.is_empty() {
        dirs::home_dir()
            .ok_or_else(|| MirrorError::ConfigError {
                message: "could not determine home directory for module cache".to_string(),
            })?
            .join("go")
            .join("pkg")
            .join("mod")
    } else {
        PathBuf::from(root)
    };
    Ok(root.join("cache").join("download"))
}
