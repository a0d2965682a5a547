//! Target-registry HTTP client: existence probes, uploads, and mod-file
//! downloads.
//!
//! The registry stores Go modules under the proxy layout
//! `<repo>/<escaped-name>/@v/<version>.{mod,zip,info}`. This module exposes
//! the [`Registry`] trait consumed by the resolver, a production
//! [`HttpRegistry`] implementation on `reqwest`, and the
//! [`AvailabilityChecker`] that turns a probe into the per-module
//! "already mirrored or not" decision.
//!
//! # Error semantics
//!
//! A "not found" response from an existence probe is a normal outcome
//! (`Ok(false)`), not an error. Transport and authentication failures are
//! errors and abort processing of the module being probed. Transient probe
//! failures are retried with exponential backoff before giving up.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use crate::core::MirrorError;
use crate::models::{Module, ModuleId};

/// Target-registry capability consumed by the resolver.
pub trait Registry {
    /// Probe whether `id`'s mod file is retrievable from `repo`.
    fn exists(&self, repo: &str, id: &ModuleId) -> impl Future<Output = Result<bool>>;

    /// Upload a materialized module's artifacts to `repo`.
    fn publish(&self, repo: &str, module: &Module) -> impl Future<Output = Result<()>>;

    /// Download `id`'s mod file from `repo` into `dest_dir`, returning the
    /// written path.
    fn download_mod_file(
        &self,
        repo: &str,
        id: &ModuleId,
        dest_dir: &Path,
    ) -> impl Future<Output = Result<PathBuf>>;
}

/// Credentials attached to every registry request.
#[derive(Debug, Clone, Default)]
pub struct RegistryCredentials {
    /// Basic-auth user name.
    pub username: Option<String>,
    /// Access token or password.
    pub token: Option<String>,
}

/// Production [`Registry`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: reqwest::Client,
    base_url: String,
    credentials: RegistryCredentials,
}

impl HttpRegistry {
    /// Create a registry client for `base_url` (e.g.
    /// `https://registry.example/api/go`).
    pub fn new(base_url: impl Into<String>, credentials: RegistryCredentials) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            credentials,
        }
    }

    /// URL of one module artifact inside a repository.
    fn artifact_url(&self, repo: &str, id: &ModuleId, extension: &str) -> String {
        format!(
            "{}/{}/{}/@v/{}.{}",
            self.base_url,
            repo,
            id.escaped_name(),
            id.version,
            extension
        )
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.credentials.username, &self.credentials.token) {
            (Some(user), token) => request.basic_auth(user, token.as_deref()),
            (None, Some(token)) => request.bearer_auth(token),
            (None, None) => request,
        }
    }

    async fn head_mod(&self, repo: &str, id: &ModuleId) -> Result<bool> {
        let url = self.artifact_url(repo, id, "mod");
        let response = self
            .authed(self.client.head(&url))
            .send()
            .await
            .map_err(|e| MirrorError::ProbeFailed {
                module: id.key(),
                reason: e.to_string(),
            })?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(false),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(MirrorError::RegistryAuthFailed { url }.into())
            }
            status => Err(MirrorError::ProbeFailed {
                module: id.key(),
                reason: format!("unexpected status {status}"),
            }
            .into()),
        }
    }

    async fn upload(
        &self,
        url: &str,
        body: Vec<u8>,
        sha1: &str,
        md5: &str,
        module: &ModuleId,
        repo: &str,
    ) -> Result<()> {
        let response = self
            .authed(self.client.put(url))
            .header("X-Checksum-Sha1", sha1)
            .header("X-Checksum-Md5", md5)
            .body(body)
            .send()
            .await
            .map_err(|e| MirrorError::PublishFailed {
                module: module.key(),
                repo: repo.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(MirrorError::RegistryAuthFailed { url: url.to_string() }.into());
        }
        if !status.is_success() {
            let reason = match response.json::<serde_json::Value>().await {
                Ok(body) => body
                    .pointer("/errors/0/message")
                    .and_then(serde_json::Value::as_str)
                    .map_or_else(|| format!("status {status}"), ToString::to_string),
                Err(_) => format!("status {status}"),
            };
            return Err(MirrorError::PublishFailed {
                module: module.key(),
                repo: repo.to_string(),
                reason,
            }
            .into());
        }
        Ok(())
    }
}

impl Registry for HttpRegistry {
    async fn exists(&self, repo: &str, id: &ModuleId) -> Result<bool> {
        self.head_mod(repo, id).await
    }

    async fn publish(&self, repo: &str, module: &Module) -> Result<()> {
        // One record for the mod file, one for the archive, in that order.
        let [mod_record, zip_record] = module.build_records.as_slice() else {
            return Err(MirrorError::PublishFailed {
                module: module.id.key(),
                repo: repo.to_string(),
                reason: format!(
                    "expected 2 checksum records, found {}",
                    module.build_records.len()
                ),
            }
            .into());
        };

        let archive_bytes = tokio::fs::read(&module.archive_path).await.with_context(|| {
            format!("failed to read archive {}", module.archive_path.display())
        })?;

        let mod_url = self.artifact_url(repo, &module.id, "mod");
        self.upload(
            &mod_url,
            module.mod_content.clone(),
            &mod_record.sha1,
            &mod_record.md5,
            &module.id,
            repo,
        )
        .await?;

        let zip_url = self.artifact_url(repo, &module.id, "zip");
        self.upload(&zip_url, archive_bytes, &zip_record.sha1, &zip_record.md5, &module.id, repo)
            .await?;

        tracing::debug!("published {} to repository '{}'", module.id, repo);
        Ok(())
    }

    async fn download_mod_file(&self, repo: &str, id: &ModuleId, dest_dir: &Path) -> Result<PathBuf> {
        let url = self.artifact_url(repo, id, "mod");
        let response =
            self.authed(self.client.get(&url)).send().await.with_context(|| {
                format!("failed to download mod file for {id} from '{repo}'")
            })?;
        let response = response
            .error_for_status()
            .with_context(|| format!("registry refused mod file for {id}"))?;
        let bytes = response.bytes().await?;

        let dest = dest_dir.join(format!("{}.mod", id.version));
        tokio::fs::write(&dest, &bytes)
            .await
            .with_context(|| format!("failed to write {}", dest.display()))?;
        Ok(dest)
    }
}

/// Decides, per module, whether it is already retrievable from the target
/// registry.
///
/// Wraps the raw probe with bounded exponential-backoff retries so a single
/// flaky response does not misclassify a module as missing or fail its whole
/// branch.
pub struct AvailabilityChecker<'a, R> {
    registry: &'a R,
    repo: &'a str,
}

impl<'a, R: Registry> AvailabilityChecker<'a, R> {
    /// Create a checker probing `repo` through `registry`.
    pub const fn new(registry: &'a R, repo: &'a str) -> Self {
        Self { registry, repo }
    }

    /// Probe whether `id` is already mirrored.
    ///
    /// `Ok(true)` only on an exact "found" response; a clean "not found" is
    /// `Ok(false)`. Transport/auth failures surface as errors after retries
    /// are exhausted.
    pub async fn exists(&self, id: &ModuleId) -> Result<bool> {
        let strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(3);

        Retry::spawn(strategy, || self.registry.exists(self.repo, id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_urls_use_escaped_names() {
        let registry =
            HttpRegistry::new("https://registry.example/api/go/", RegistryCredentials::default());
        let id = ModuleId::new("github.com/Sirupsen/logrus", "v1.0.6");
        assert_eq!(
            registry.artifact_url("go-local", &id, "zip"),
            "https://registry.example/api/go/go-local/github.com/!sirupsen/logrus/@v/v1.0.6.zip"
        );
    }

    #[tokio::test]
    async fn publish_rejects_malformed_record_set() {
        let registry =
            HttpRegistry::new("https://registry.example/api/go", RegistryCredentials::default());
        let module = Module {
            id: ModuleId::new("example.com/m", "v1.0.0"),
            mod_content: b"module example.com/m\n".to_vec(),
            archive_path: PathBuf::from("/nonexistent.zip"),
            build_records: Vec::new(),
        };

        // Fails on the record set before touching the archive or the network.
        let err = registry.publish("go-local", &module).await.unwrap_err();
        assert!(err.to_string().contains("checksum records"));
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let a = HttpRegistry::new("https://r.example/api/go", RegistryCredentials::default());
        let b = HttpRegistry::new("https://r.example/api/go/", RegistryCredentials::default());
        let id = ModuleId::new("example.com/m", "v1.0.0");
        assert_eq!(a.artifact_url("r", &id, "mod"), b.artifact_url("r", &id, "mod"));
    }
}
