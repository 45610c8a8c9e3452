//! elasticsearch-backup - periodic Elasticsearch snapshots with retention.
//!
//! Creates a snapshot in the configured repository whenever the newest one is
//! older than the interval, and deletes snapshots past the retention window.

mod client;
mod config;
mod error;
mod lifecycle;
mod logger;
mod metrics;
mod retry;
mod scheduler;
mod server;
mod snapshot;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use tracing::{error, info, info_span};

use client::HttpRepository;
use config::Config;
use lifecycle::Lifecycle;
use metrics::Metrics;
use scheduler::Scheduler;

#[tokio::main]
async fn main() {
    let config = Config::parse();
    let legacy_level = std::env::var(config::env::LOGLEVEL).ok();
    logger::init_logger(
        &config.log_format,
        &config.resolve_log_level(legacy_level.as_deref()),
    );

    if let Err(e) = run(config).await {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    config
        .validate()
        .context("Configuration validation failed")?;

    let _span = info_span!(
        "elasticsearch_backup",
        host = %config.host,
        repository = %config.name
    )
    .entered();

    let policy = config.policy();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        repository = %config.name,
        interval_hours = config.interval,
        retention = ?policy.retention,
        listen = %config.listen,
        "Starting elasticsearch-backup"
    );

    let mut registry = Registry::default();
    let metrics = Arc::new(Metrics::new(&mut registry));
    let registry = Arc::new(registry);

    let listener = server::bind(config.listen_addr()?)
        .await
        .context("Failed to bind HTTP listener")?;
    tokio::spawn(async move {
        if let Err(e) = server::serve(listener, registry).await {
            error!(error = %e, "HTTP server failed");
        }
    });

    let repository = HttpRepository::new(
        config.base_url(),
        config.name.clone(),
        config.request_timeout(),
    )?;
    let scheduler = Scheduler::new(
        Lifecycle::new(repository, policy),
        config.backoff(),
        config.run_interval(),
        metrics,
    );

    scheduler.run().await;
    Ok(())
}
