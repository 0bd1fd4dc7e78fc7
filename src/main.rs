//! CLI entry point for the bundle-fetch tool.

use std::process::ExitCode;

use anyhow::{Context, Result};
use bundle_fetch_core::{BundleError, HttpBundleClient, download_bundle, download_bundle_in};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

mod cli;
mod config;
mod exit;

use cli::Args;
use config::ResolvedConfig;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries only the downloaded path.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(bundle_id = %args.bundle_id, url = %args.url, "CLI arguments parsed");

    let config = match config::resolve(&args) {
        Ok(config) => config,
        Err(err) => {
            error!("{err:#}");
            return ExitCode::from(exit::EXIT_CONFIG);
        }
    };

    let result = run(config).await;
    if let Err(err) = &result {
        error!("{err:#}");
    }
    exit::determine_exit_code(&result)
}

async fn run(config: ResolvedConfig) -> Result<()> {
    let client = HttpBundleClient::new(&config.base_url, config.client)?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    info!(
        bundle_id = %config.bundle_id,
        interval = ?config.poll.interval,
        timeout = ?config.poll.timeout,
        "waiting for support bundle"
    );

    let download = async {
        match &config.temp_dir {
            Some(parent) => {
                download_bundle_in(&client, &config.bundle_id, &config.poll, &cancel, parent).await
            }
            None => download_bundle(&client, &config.bundle_id, &config.poll, &cancel).await,
        }
    };

    // The library only watches the token while polling; dropping the download
    // future on interrupt also aborts the copy and removes the partial file.
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(BundleError::cancelled(config.bundle_id.as_str())),
        result = download => result,
    };
    let path =
        result.with_context(|| format!("failed to fetch support bundle {}", config.bundle_id))?;

    println!("{}", path.display());
    Ok(())
}
