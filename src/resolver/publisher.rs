//! Module publication to the target registry.
//!
//! Thin seam between the orchestrator and the [`Registry`] upload call. The
//! publisher deliberately does not touch the resolution cache; the
//! orchestrator owns all cache mutation so probe state and upload state stay
//! distinguishable.

use anyhow::Result;

use crate::models::Module;
use crate::registry::Registry;

/// Uploads materialized modules.
pub struct Publisher<'a, R> {
    registry: &'a R,
    repo: &'a str,
}

impl<'a, R: Registry> Publisher<'a, R> {
    /// Create a publisher targeting `repo`.
    pub const fn new(registry: &'a R, repo: &'a str) -> Self {
        Self { registry, repo }
    }

    /// Upload `module`'s mod file and archive with their checksum records.
    pub async fn publish(&self, module: &Module) -> Result<()> {
        tracing::info!("publishing {} to '{}'", module.id, self.repo);
        self.registry.publish(self.repo, module).await
    }
}
