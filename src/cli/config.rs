//! The `config` command: manage the global registry configuration.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::config::GlobalConfig;

/// Arguments for `modmirror config`.
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the current configuration (credentials redacted).
    Show,

    /// Set the registry base URL.
    SetRegistry {
        /// Registry base URL, e.g. `https://registry.example/api/go`.
        url: String,
    },

    /// Set the default target repository.
    SetRepo {
        /// Repository name, e.g. `go-local`.
        name: String,
    },

    /// Set registry credentials.
    SetToken {
        /// Access token or password.
        token: String,
        /// Optional basic-auth user name.
        #[arg(long)]
        username: Option<String>,
    },
}

impl ConfigCommand {
    /// Execute the config action.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let path = match config_path {
            Some(path) => path,
            None => GlobalConfig::default_path()?,
        };
        let mut config = GlobalConfig::load_from(&path).await?;

        match self.action {
            ConfigAction::Show => {
                let display = |value: Option<&str>| value.unwrap_or("(unset)").to_string();
                println!("{}: {}", "registry url".bold(), display(config.registry.url.as_deref()));
                println!("{}: {}", "repository".bold(), display(config.registry.repo.as_deref()));
                println!(
                    "{}: {}",
                    "username".bold(),
                    display(config.registry.username.as_deref())
                );
                println!(
                    "{}: {}",
                    "token".bold(),
                    if config.registry.token.is_some() { "********" } else { "(unset)" }
                );
                return Ok(());
            }
            ConfigAction::SetRegistry { url } => {
                config.registry.url = Some(url.trim_end_matches('/').to_string());
            }
            ConfigAction::SetRepo { name } => {
                config.registry.repo = Some(name);
            }
            ConfigAction::SetToken { token, username } => {
                config.registry.token = Some(token);
                if username.is_some() {
                    config.registry.username = username;
                }
            }
        }

        config.save_to(&path).await?;
        println!("{} configuration updated", "✓".green().bold());
        Ok(())
    }
}
