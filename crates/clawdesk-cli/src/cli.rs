//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clawdesk_client::ClientConfig;

use crate::error::CliError;

/// Clawdesk CLI - talk to the assistant gateway.
#[derive(Parser, Debug, Clone)]
#[command(name = "clawdesk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Gateway URL to connect to [default: ws://localhost:18789].
    #[arg(short, long, env = "CLAWDESK_GATEWAY")]
    pub gateway: Option<String>,

    /// TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Per-request timeout in milliseconds.
    #[arg(short, long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Automatic reconnection attempts after the connection drops.
    #[arg(long, value_name = "N")]
    pub max_reconnect_attempts: Option<u32>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Build the client configuration: file first, then flags and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the result is invalid.
    pub fn client_config(&self) -> Result<ClientConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        if let Some(gateway) = &self.gateway {
            config.endpoint.clone_from(gateway);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.request_timeout_ms = timeout_ms;
        }
        if let Some(attempts) = self.max_reconnect_attempts {
            config.reconnect.max_attempts = attempts;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Send one chat message and print the reply.
    Chat {
        /// Message text.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Print a structured snapshot of the current page.
    Snapshot,

    /// Perform an action on the current page.
    Act(ActArgs),

    /// Ask the host to load a URL.
    Navigate {
        /// Target URL.
        url: String,
    },

    /// Print gateway events and connection changes until Ctrl-C.
    Watch,

    /// Interactive chat session.
    Repl,
}

/// Arguments for the act command.
#[derive(Parser, Debug, Clone)]
pub struct ActArgs {
    /// Action name, e.g. `click`.
    pub action: String,

    /// Action parameters (KEY=VALUE). Values that parse as JSON are sent as JSON.
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
}
