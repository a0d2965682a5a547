//! Go toolchain integration.
//!
//! The mirroring pipeline treats the package-manager toolchain as a black
//! box behind the [`Toolchain`] trait: computing a raw dependency graph,
//! running tidy, and reading the manifest. [`GoToolchain`] is the production
//! implementation that shells out to the system `go` binary, the same way
//! the rest of the ecosystem wraps system `git`.
//!
//! Where dependencies are resolved *from* is an explicit
//! [`ResolutionSource`] parameter on every call rather than ambient process
//! environment: the implementation pins `GOPROXY` on the child process only,
//! so concurrent runs with different sources cannot interfere.

pub mod command_builder;

pub use command_builder::{GoCommand, GoCommandOutput};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::MirrorError;

/// Where the toolchain should resolve missing modules from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Resolve through the target registry's Go proxy endpoint.
    Registry,
    /// Resolve from the original version-control source.
    Origin,
}

/// Black-box package-manager toolchain capability.
pub trait Toolchain {
    /// Compute the raw dependency graph of the module rooted at `dir`.
    ///
    /// Keys are `name@version`; values mark the module as present in the
    /// graph (always `true` for freshly computed graphs).
    fn compute_graph(
        &self,
        dir: &Path,
        source: ResolutionSource,
    ) -> impl Future<Output = Result<HashMap<String, bool>>>;

    /// Run tidy in `dir` to populate/normalize its manifest.
    fn tidy(&self, dir: &Path, source: ResolutionSource) -> impl Future<Output = Result<()>>;

    /// Read the manifest (go.mod) of the module rooted at `dir`.
    fn read_manifest(&self, dir: &Path) -> impl Future<Output = Result<Vec<u8>>>;
}

/// Production [`Toolchain`] backed by the system `go` binary.
#[derive(Debug, Clone, Default)]
pub struct GoToolchain {
    /// Proxy URL used when resolving through the registry.
    registry_proxy: Option<String>,
}

impl GoToolchain {
    /// Create a toolchain without a registry proxy; [`ResolutionSource::Registry`]
    /// falls back to direct resolution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a toolchain that resolves registry-sourced modules through the
    /// given Go proxy URL.
    pub fn with_registry_proxy(proxy_url: impl Into<String>) -> Self {
        Self {
            registry_proxy: Some(proxy_url.into()),
        }
    }

    fn goproxy(&self, source: ResolutionSource) -> String {
        match source {
            ResolutionSource::Registry => {
                self.registry_proxy.clone().unwrap_or_else(|| "direct".to_string())
            }
            ResolutionSource::Origin => "direct".to_string(),
        }
    }

    fn command(&self, dir: &Path, source: ResolutionSource) -> GoCommand {
        // Checksum verification is disabled: mirrored modules are served by a
        // private registry the public sum database knows nothing about.
        GoCommand::new()
            .current_dir(dir)
            .env("GOPROXY", self.goproxy(source))
            .env("GOSUMDB", "off")
            .env("GOFLAGS", "-mod=mod")
    }
}

impl Toolchain for GoToolchain {
    async fn compute_graph(
        &self,
        dir: &Path,
        source: ResolutionSource,
    ) -> Result<HashMap<String, bool>> {
        let output = self
            .command(dir, source)
            .args(["mod", "graph"])
            .execute()
            .await
            .with_context(|| format!("failed to compute dependency graph in {}", dir.display()))?;
        Ok(parse_graph_output(&output.stdout))
    }

    async fn tidy(&self, dir: &Path, source: ResolutionSource) -> Result<()> {
        self.command(dir, source)
            .args(["mod", "tidy"])
            .execute()
            .await
            .with_context(|| format!("failed to tidy module in {}", dir.display()))?;
        Ok(())
    }

    async fn read_manifest(&self, dir: &Path) -> Result<Vec<u8>> {
        let path = manifest_path(dir)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read manifest {}", path.display()))
    }
}

/// Locate the go.mod of the module rooted at `dir`.
pub fn manifest_path(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("go.mod");
    if !path.is_file() {
        return Err(MirrorError::ManifestNotFound {
            dir: dir.display().to_string(),
        }
        .into());
    }
    Ok(path)
}

/// Parse `go mod graph` output into the raw dependency graph.
///
/// Each line is `parent child` where both sides are module keys; the root
/// module appears without a version and is excluded. Every versioned module
/// mentioned on either side becomes a `true` entry.
pub fn parse_graph_output(output: &str) -> HashMap<String, bool> {
    let mut graph = HashMap::new();
    for line in output.lines() {
        for token in line.split_whitespace() {
            if token.contains('@') {
                graph.entry(token.to_string()).or_insert(true);
            }
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_graph_collects_versioned_modules() {
        let output = "example.com/app github.com/a/x@v1.0.0\n\
                      example.com/app github.com/b/y@v2.1.0\n\
                      github.com/a/x@v1.0.0 github.com/c/z@v0.3.0\n";
        let graph = parse_graph_output(output);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.get("github.com/c/z@v0.3.0"), Some(&true));
        // The unversioned root module is not part of the graph.
        assert!(!graph.contains_key("example.com/app"));
    }

    #[test]
    fn parse_graph_deduplicates() {
        let output = "a@v1 b@v1\nc@v1 b@v1\n";
        let graph = parse_graph_output(output);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn goproxy_selection() {
        let tc = GoToolchain::with_registry_proxy("https://registry.example/api/go/go-local");
        assert_eq!(
            tc.goproxy(ResolutionSource::Registry),
            "https://registry.example/api/go/go-local"
        );
        assert_eq!(tc.goproxy(ResolutionSource::Origin), "direct");

        let bare = GoToolchain::new();
        assert_eq!(bare.goproxy(ResolutionSource::Registry), "direct");
    }
}
