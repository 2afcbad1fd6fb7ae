//! `resumectl`: run the resume operator or work with its manifests offline.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use resume_operator::cli::{Cli, Commands};
use resume_operator::commands::{self, RunOptions};
use resume_operator::{LogFormat, OperatorConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Run {
            manifests,
            config,
            workers,
            no_rollout,
        } => {
            let mut operator = config
                .as_deref()
                .map_or_else(|| Ok(OperatorConfig::default()), OperatorConfig::from_file)
                .context("Failed to load operator config")?
                .from_env()
                .context("Failed to apply environment overrides")?;
            if let Some(workers) = workers {
                operator.workers = workers;
            }
            if let Some(format) = cli.log_format {
                operator.log_format = format;
            }
            let operator = operator.validate().context("Invalid operator config")?;

            init_tracing(operator.log_format);
            info!(workers = operator.workers, "Starting resume operator");

            let options = RunOptions {
                manifests: manifests.as_deref(),
                simulate_rollout: !no_rollout,
            };
            commands::run(&mut stdout, &operator, options, wait_for_shutdown()).await?;
        }
        Commands::Init {
            kind,
            api_version,
            required_only,
        } => {
            init_tracing(cli.log_format.unwrap_or_default());
            commands::init(&mut stdout, kind, api_version.as_deref(), required_only)?;
        }
        Commands::Generate {
            kind,
            workload_manifest,
            collection_manifest,
        } => {
            init_tracing(cli.log_format.unwrap_or_default());
            commands::generate(
                &mut stdout,
                kind,
                &workload_manifest,
                collection_manifest.as_deref(),
            )?;
        }
        Commands::Version { kind } => {
            init_tracing(cli.log_format.unwrap_or_default());
            commands::version(&mut stdout, kind)?;
        }
    }

    stdout.flush()?;
    Ok(())
}

/// Initialize tracing subscriber with environment filter. Logs go to stderr
/// so command output stays parseable.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }
}
