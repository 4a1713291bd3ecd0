use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use lodgewatch::config::AppConfig;
use lodgewatch::dispatch::Dispatcher;
use lodgewatch::notify::WebhookNotifier;
use lodgewatch::poller::SourcePoller;
use lodgewatch::sources::{CrousSource, StudefiSource};
use lodgewatch::storage::Store;

#[derive(Parser, Debug)]
#[command(name = "lodgewatch", about = "Housing listing watcher with automated reservation claiming")]
struct Cli {
    /// Directory holding default/{RUN_MODE}/local config files
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Log filter override, e.g. "lodgewatch=trace"
    #[arg(long)]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    let directive = cli.log.as_deref().unwrap_or("lodgewatch=debug");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .init();

    info!("Starting lodgewatch...");

    let config = AppConfig::from_dir(&cli.config_dir).context("loading configuration")?;

    let store = Store::connect(&config.database)
        .await
        .context("opening database")?;

    let notifier = Arc::new(WebhookNotifier::new(config.notifications.webhook.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        notifier,
        config.reservation.clone(),
        config.studefi.clone(),
    ));

    let fetch_timeout = Duration::from_secs(config.poller.request_timeout_secs);
    let interval = Duration::from_secs(config.poller.interval_secs);

    let crous = CrousSource::new(config.crous.clone(), fetch_timeout)?;
    let crous_poller =
        SourcePoller::init(crous, store.clone(), Arc::clone(&dispatcher), interval).await?;

    let studefi = StudefiSource::new(config.studefi.clone(), fetch_timeout)?;
    let studefi_poller =
        SourcePoller::init(studefi, store.clone(), Arc::clone(&dispatcher), interval).await?;

    let crous_task = tokio::spawn(crous_poller.run());
    let studefi_task = tokio::spawn(studefi_poller.run());

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    crous_task.abort();
    studefi_task.abort();

    Ok(())
}
