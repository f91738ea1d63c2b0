//! Service configuration
//!
//! Loaded from a TOML file; every section and field has a default so an empty
//! file (or no file at all) yields a working setup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::event::{EventAssembler, UndefinedPolicy, DEFAULT_LED_TOPIC_ROOT};
use crate::logging::LogConfig;
use crate::waveform::WaveformConfig;
use crate::{CoreError, Result};

/// Fixed-rate driver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Interval between ticks in milliseconds
    pub send_rate_ms: u64,
    /// Pause after a tick that found nothing to publish, in milliseconds
    pub unsuccessful_task_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            send_rate_ms: 3,
            unsuccessful_task_delay_ms: 1000,
        }
    }
}

impl SchedulerConfig {
    /// Interval between ticks
    pub fn send_rate(&self) -> Duration {
        Duration::from_millis(self.send_rate_ms)
    }

    /// Idle backoff duration
    pub fn unsuccessful_task_delay(&self) -> Duration {
        Duration::from_millis(self.unsuccessful_task_delay_ms)
    }
}

/// Raw waveform parameters as they appear in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformSettings {
    /// Time per value step in milliseconds
    pub period_ms: u64,
    /// Value at the trough
    pub min_value: i64,
    /// Value at the crest
    pub max_value: i64,
}

impl Default for WaveformSettings {
    fn default() -> Self {
        let defaults = WaveformConfig::default();
        Self {
            period_ms: defaults.period().as_millis() as u64,
            min_value: defaults.min_value(),
            max_value: defaults.max_value(),
        }
    }
}

impl TryFrom<&WaveformSettings> for WaveformConfig {
    type Error = CoreError;

    fn try_from(settings: &WaveformSettings) -> Result<Self> {
        WaveformConfig::new(
            Duration::from_millis(settings.period_ms),
            settings.min_value,
            settings.max_value,
        )
    }
}

fn default_client_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("wobble-{}", &id[..8])
}

/// MQTT broker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker host name or IP
    pub host: String,
    /// Broker TCP port
    pub port: u16,
    /// Generated per process when not configured
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// MQTT keep-alive announced on connect
    pub keep_alive_secs: u16,
    /// Pause between reconnect attempts in milliseconds
    pub reconnect_delay_ms: u64,
    /// Topics are `<topic_root>/<LED index>`
    pub topic_root: String,
    /// Log events instead of sending them
    pub dry_run: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            client_id: default_client_id(),
            keep_alive_secs: 30,
            reconnect_delay_ms: 1000,
            topic_root: DEFAULT_LED_TOPIC_ROOT.to_string(),
            dry_run: false,
        }
    }
}

impl BrokerConfig {
    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pause between reconnect attempts
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Where the topology comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologySource {
    /// JSON topology file
    pub path: PathBuf,
    /// Reload the file when it changes
    pub watch: bool,
}

impl Default for TopologySource {
    fn default() -> Self {
        Self {
            path: PathBuf::from("topology.json"),
            watch: true,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WobbleConfig {
    /// Tick rate and idle backoff
    pub scheduler: SchedulerConfig,
    /// Waveform shape
    pub waveform: WaveformSettings,
    /// Broker connection and topics
    pub broker: BrokerConfig,
    /// Topology file
    pub topology: TopologySource,
    /// Handling of undefined intensities
    pub undefined_policy: UndefinedPolicy,
    /// Logging settings
    pub logging: LogConfig,
}

impl WobbleConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.waveform_config()?;

        if self.scheduler.send_rate_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "scheduler.send_rate_ms must be greater than 0".to_string(),
            ));
        }
        if self.broker.host.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "broker.host must not be empty".to_string(),
            ));
        }
        if self.broker.client_id.is_empty() || self.broker.client_id.len() > 23 {
            return Err(CoreError::InvalidConfig(format!(
                "broker.client_id must be 1-23 characters, got '{}'",
                self.broker.client_id
            )));
        }
        if self.broker.topic_root.is_empty()
            || self.broker.topic_root.ends_with('/')
            || self.broker.topic_root.contains(['+', '#'])
        {
            return Err(CoreError::InvalidConfig(format!(
                "broker.topic_root '{}' is not a valid topic prefix",
                self.broker.topic_root
            )));
        }
        Ok(())
    }

    /// Validated waveform parameters
    pub fn waveform_config(&self) -> Result<WaveformConfig> {
        WaveformConfig::try_from(&self.waveform)
    }

    /// Event assembler for the configured topic root and undefined policy
    pub fn assembler(&self) -> EventAssembler {
        EventAssembler::new(self.broker.topic_root.clone(), self.undefined_policy)
    }
}
