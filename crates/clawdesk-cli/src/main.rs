//! Clawdesk CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use clawdesk_cli::cli::{Cli, Commands};
use clawdesk_cli::commands;
use clawdesk_cli::output::OutputFormat;
use clawdesk_client::{AssistantPanel, GatewayClient};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clawdesk=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.client_config().context("invalid configuration")?;
    let format = OutputFormat::new(cli.format);
    let client = GatewayClient::new(config)?;
    let mut stdout = io::stdout().lock();

    let result = match &cli.command {
        Commands::Repl => {
            // The panel dials on its own and reports failures in its transcript.
            let mut panel = AssistantPanel::new(client.clone());
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            commands::repl(&mut panel, stdin, &mut stdout, &format).await
        }
        Commands::Chat { text } => {
            connect(&client).await?;
            commands::chat(&client, &mut stdout, &format, &text.join(" ")).await
        }
        Commands::Snapshot => {
            connect(&client).await?;
            commands::snapshot(&client, &mut stdout, &format).await
        }
        Commands::Act(args) => {
            connect(&client).await?;
            commands::act(&client, &mut stdout, &format, &args.action, &args.params).await
        }
        Commands::Navigate { url } => {
            connect(&client).await?;
            commands::navigate(&client, &mut stdout, &format, url).await
        }
        Commands::Watch => {
            connect(&client).await?;
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            commands::watch(&client, &mut stdout, &format, shutdown).await
        }
    };

    client.disconnect();
    result.map_err(Into::into)
}

async fn connect(client: &GatewayClient) -> anyhow::Result<()> {
    client
        .connect()
        .await
        .with_context(|| format!("failed to connect to {}", client.config().endpoint))
}
