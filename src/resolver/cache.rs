//! Process-scoped resolution state: memoization and run counters.
//!
//! One [`ResolutionCache`] is created per resolve-and-publish run and owned
//! by the caller, never a process-wide singleton, so concurrent or repeated
//! runs (and tests) cannot interfere. It is simultaneously the correctness
//! mechanism for at-most-once publication and the metrics store for the
//! run's final counters, so all access goes through a mutex even though the
//! default orchestration is single-threaded per recursion branch.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::models::ResolutionReport;

#[derive(Debug, Default)]
struct CacheState {
    /// Probe results per module key. `true` means confirmed retrievable from
    /// the target registry; `false` means the module must come from its
    /// original source but has been seen.
    published: HashMap<String, bool>,
    /// Modules whose artifacts were actually uploaded this run. Finer-grained
    /// than `published`, which only records that a probe happened.
    uploaded: HashSet<String>,
    succeeded: usize,
    failed: usize,
    total: usize,
}

/// Shared memoization and bookkeeping for one resolution run.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    state: Mutex<CacheState>,
}

impl ResolutionCache {
    /// Create an empty cache for a new run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe result recorded for `key`, if any. A `Some` return means the
    /// module has already been claimed by some branch and must not be
    /// reprocessed.
    pub fn lookup(&self, key: &str) -> Option<bool> {
        self.state.lock().expect("resolution cache poisoned").published.get(key).copied()
    }

    /// Record a probe result for `key` and count the module as processed.
    ///
    /// Called immediately after the availability probe, before any
    /// materialization or publication, so sibling branches discovering the
    /// same module see it as claimed rather than re-probing.
    pub fn record_probe(&self, key: &str, available: bool) {
        let mut state = self.state.lock().expect("resolution cache poisoned");
        state.published.insert(key.to_string(), available);
        state.total += 1;
    }

    /// Whether `key`'s artifacts were uploaded during this run.
    pub fn is_uploaded(&self, key: &str) -> bool {
        self.state.lock().expect("resolution cache poisoned").uploaded.contains(key)
    }

    /// Count `key` as successfully published and mark it uploaded.
    pub fn record_success(&self, key: &str) {
        let mut state = self.state.lock().expect("resolution cache poisoned");
        state.uploaded.insert(key.to_string());
        state.succeeded += 1;
    }

    /// Count `key` as failed.
    pub fn record_failure(&self, _key: &str) {
        let mut state = self.state.lock().expect("resolution cache poisoned");
        state.failed += 1;
    }

    /// Snapshot of the run counters.
    pub fn report(&self) -> ResolutionReport {
        let state = self.state.lock().expect("resolution cache poisoned");
        ResolutionReport {
            succeeded: state.succeeded,
            failed: state.failed,
            total: state.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_reserves_slot_and_counts_total() {
        let cache = ResolutionCache::new();
        assert_eq!(cache.lookup("a@v1"), None);

        cache.record_probe("a@v1", false);
        assert_eq!(cache.lookup("a@v1"), Some(false));
        assert_eq!(cache.report().total, 1);

        cache.record_probe("b@v1", true);
        assert_eq!(cache.lookup("b@v1"), Some(true));
        assert_eq!(cache.report().total, 2);
    }

    #[test]
    fn uploaded_is_distinct_from_probed() {
        let cache = ResolutionCache::new();
        cache.record_probe("a@v1", true);
        assert!(!cache.is_uploaded("a@v1"));

        cache.record_success("a@v1");
        assert!(cache.is_uploaded("a@v1"));
    }

    #[test]
    fn counters_track_outcomes() {
        let cache = ResolutionCache::new();
        cache.record_probe("a@v1", false);
        cache.record_probe("b@v1", false);
        cache.record_probe("c@v1", false);
        cache.record_success("a@v1");
        cache.record_failure("b@v1");

        let report = cache.report();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total, 3);
        assert!(report.succeeded + report.failed <= report.total);
    }
}
