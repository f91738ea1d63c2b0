//! Wobble - publishes a triangular brightness wave to every configured LED.

mod cli;
mod driver;
mod logging_setup;
mod topology_watch;

use anyhow::{Context, Result};
use clap::Parser;
use wobble_control::{BrokerClient, LogBroker, MqttClient, MqttOptions, WobbleTask};
use wobble_core::SharedTopology;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // Keep the guard alive until main returns so buffered file logs are flushed
    let _log_guard = logging_setup::init(&config.logging)?;

    tracing::info!("Wobble light publisher {}", env!("CARGO_PKG_VERSION"));

    let topology = SharedTopology::empty();
    topology_watch::load(&topology, &config.topology.path);

    let _watcher = if config.topology.watch {
        match topology_watch::watch(topology.clone(), config.topology.path.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!("Topology hot reload disabled: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let broker: Box<dyn BrokerClient + Send> = if config.broker.dry_run {
        tracing::info!("Dry run: events are logged, not published");
        Box::new(LogBroker::new())
    } else {
        Box::new(
            MqttClient::new(MqttOptions::from(&config.broker))
                .context("Failed to create MQTT client")?,
        )
    };

    let task = WobbleTask::from_config(&config, topology, broker)
        .context("Failed to build wobble task")?;

    driver::run(task, config.scheduler.send_rate(), shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        // Run until killed
        std::future::pending::<()>().await;
    }
}
