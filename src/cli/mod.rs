//! Command-line interface for modmirror.
//!
//! Two command families:
//! - `mirror` - resolve a project's dependency graph and publish every
//!   missing module into the target registry
//! - `config` - manage the global registry configuration
//!
//! All commands honor the global `--verbose`, `--quiet`, and `--config`
//! flags. Verbosity maps onto the `tracing` env-filter; an explicit
//! `RUST_LOG` always wins.

mod config;
mod mirror;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Top-level CLI definition.
#[derive(Parser)]
#[command(
    name = "modmirror",
    about = "Mirror Go module dependency graphs into a private artifact registry",
    version,
    long_about = "modmirror resolves a project's full transitive module graph, decides per \
                  module whether it is already mirrored in the target registry, and publishes \
                  every missing module exactly once."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose (debug) output.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a custom global configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable progress spinners (automatically off in non-TTY environments).
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and publish a project's module dependency graph.
    Mirror(mirror::MirrorCommand),

    /// Manage global configuration (registry URL, repository, credentials).
    Config(config::ConfigCommand),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        self.init_tracing();

        match self.command {
            Commands::Mirror(cmd) => cmd.execute(self.config, self.no_progress).await,
            Commands::Config(cmd) => cmd.execute(self.config).await,
        }
    }

    fn init_tracing(&self) {
        let default = if self.verbose {
            "modmirror=debug"
        } else if self.quiet {
            "error"
        } else {
            "modmirror=info"
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_mirror_flags() {
        let cli = Cli::parse_from([
            "modmirror",
            "--verbose",
            "mirror",
            "--repo",
            "go-local",
            "--recursive",
        ]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Mirror(_)));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        let result = Cli::try_parse_from(["modmirror", "-v", "-q", "config", "show"]);
        assert!(result.is_err());
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
