//! Command-line arguments

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use wobble_core::WobbleConfig;

/// Config file looked up when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "wobble.toml";

/// Wobble - triangular brightness wave for every LED
#[derive(Debug, Parser)]
#[command(name = "wobble")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "WOBBLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Topology JSON file (overrides `topology.path`)
    #[arg(short, long, env = "WOBBLE_TOPOLOGY")]
    pub topology: Option<PathBuf>,

    /// Broker host (overrides `broker.host`)
    #[arg(long, env = "WOBBLE_BROKER_HOST")]
    pub broker_host: Option<String>,

    /// Broker port (overrides `broker.port`)
    #[arg(long, env = "WOBBLE_BROKER_PORT")]
    pub broker_port: Option<u16>,

    /// Log events instead of publishing them
    #[arg(long)]
    pub dry_run: bool,

    /// Log level (overrides `logging.level`)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Load the config file and apply command-line overrides
    ///
    /// A missing default config file is not an error; an explicitly named one is.
    pub fn load_config(&self) -> Result<WobbleConfig> {
        let mut config = match &self.config {
            Some(path) => WobbleConfig::load(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    WobbleConfig::load(&default)
                        .with_context(|| format!("Failed to load config {:?}", default))?
                } else {
                    WobbleConfig::default()
                }
            }
        };

        self.apply_overrides(&mut config);
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut WobbleConfig) {
        if let Some(path) = &self.topology {
            config.topology.path = path.clone();
        }
        if let Some(host) = &self.broker_host {
            config.broker.host = host.clone();
        }
        if let Some(port) = self.broker_port {
            config.broker.port = port;
        }
        if self.dry_run {
            config.broker.dry_run = true;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}
