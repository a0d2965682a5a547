//! modmirror - mirror Go module dependency graphs into a private artifact
//! registry.
//!
//! Given a project's go.mod, modmirror discovers the full transitive
//! dependency graph, decides per module whether it is already mirrored in
//! the target registry or must come from its original version-control
//! source, and publishes every missing module (plus, in deep mode, its own
//! transitive dependencies) into the registry exactly once - even when a
//! module is reachable through many paths in the graph.
//!
//! # Architecture Overview
//!
//! The pipeline is a recursive, memoized graph walk:
//!
//! 1. The project's raw graph (`go mod graph`) is merged with its `replace`
//!    directives ([`manifest`]).
//! 2. Each module is probed against the registry ([`registry`]), claimed in
//!    the run's [`resolver::ResolutionCache`], and materialized from the
//!    local module cache ([`store`], [`resolver`]).
//! 3. In deep mode, each module's own graph is resolved depth-first before
//!    the module itself is published, so leaves land in the registry before
//!    anything that depends on them.
//!
//! The cache is caller-owned and passed through the whole walk; it is both
//! the idempotency mechanism (at-most-once publication) and the source of
//! the run's succeeded/failed/total counters.
//!
//! # Core Modules
//!
//! - [`resolver`] - resolution cache, module materializer, publisher, and
//!   the recursive orchestrator
//! - [`manifest`] - `replace`-directive parsing and graph merging
//! - [`models`] - module identity ([`models::ModuleId`]), materialized
//!   modules, run reports
//!
//! # Collaborators
//!
//! - [`toolchain`] - the `go` tool behind a trait (graph computation, tidy)
//! - [`registry`] - HTTP registry client (existence probes, uploads)
//! - [`store`] - local module-cache access (archives, checksums, extraction)
//!
//! # Supporting Modules
//!
//! - [`cli`] - command-line interface
//! - [`config`] - global configuration (`~/.modmirror/config.toml`)
//! - [`core`] - error types and user-friendly error reporting
//! - [`utils`] - file-system helpers
//!
//! # Example
//!
//! ```bash
//! # Configure the target registry once
//! modmirror config set-registry https://registry.example/api/go
//! modmirror config set-repo go-local
//!
//! # Mirror the current project's graph
//! modmirror mirror
//!
//! # Deep mirror: also publish every dependency's own transitive graph
//! modmirror mirror --recursive
//! ```

// Core functionality
pub mod core;
pub mod manifest;
pub mod models;
pub mod resolver;

// Collaborator capabilities
pub mod registry;
pub mod store;
pub mod toolchain;

// Supporting modules
pub mod cli;
pub mod config;
pub mod utils;
