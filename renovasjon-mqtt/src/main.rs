//! Daemon that publishes the next waste collection dates of one property as
//! Home Assistant sensors over MQTT.

mod bus;
mod config;

use std::{env, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use renovasjon_core::{CredentialManager, SyncScheduler};
use renovasjon_provider_time as time;

use crate::config::Config;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_ENV: &str = "RENOVASJON_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    info!("starting renovasjon-mqtt v{}", env!("CARGO_PKG_VERSION"));

    let path = config_path(env::args().skip(1), env::var(CONFIG_ENV).ok());
    let config = Config::from_file(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    info!(
        property = %config.property_id,
        interval = ?config.poll_interval,
        sensors = config.categories.len(),
        "configuration loaded"
    );

    // HTTP + upstream setup
    let client = Client::builder()
        .user_agent(concat!("renovasjon-mqtt/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let upstream = time::plugin(client, config.upstream.clone());
    info!(upstream = %upstream.name, base_url = %config.upstream.base_url, "upstream configured");

    // Bus setup
    info!(host = %config.broker.host, port = config.broker.port, "connecting to MQTT broker");
    let (publisher, event_loop) = bus::connect(&config.mqtt, &config.broker);
    let (sender, receiver) = mpsc::unbounded_channel();
    let driver = tokio::spawn(bus::drive(event_loop, sender));

    let mut scheduler = SyncScheduler::new(
        config.sync_settings(),
        CredentialManager::new(upstream.login_port),
        upstream.collection_port,
        Arc::new(publisher),
    );

    tokio::select! {
        () = scheduler.run(receiver) => warn!("scheduler stopped"),
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for shutdown signal")?;
            info!("shutdown signal received");
        }
    }

    driver.abort();
    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// `--config <path>` wins over the environment, which wins over the default.
fn config_path<I: Iterator<Item = String>>(mut args: I, from_env: Option<String>) -> PathBuf {
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            if let Some(path) = args.next() {
                return PathBuf::from(path);
            }
        } else if let Some(path) = arg.strip_prefix("--config=") {
            return PathBuf::from(path);
        }
    }

    from_env
        .filter(|path| !path.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}
