//! Wobble Core - Waveform and Addressing Model
//!
//! This crate contains the pure, non-blocking half of the wobble light publisher:
//! - Triangular ("wobble") waveform evaluation from wall-clock time
//! - Device / strip / LED topology and its traversal
//! - Assembly of one outbound broker event per LED
//! - Configuration and logging settings shared with the binary
//!
//! Nothing in here talks to the network or sleeps; delivery lives in
//! `wobble-control`.

#![warn(missing_docs)]

pub mod config;
pub mod event;
pub mod logging;
pub mod topology;
pub mod waveform;

use thiserror::Error;

// --- Re-exports grouped by category ---

// Waveform
pub use waveform::{evaluate, evaluate_at_millis, Intensity, WaveformConfig};

// Topology
pub use topology::{
    walk, Device, Led, LedAddress, SharedTopology, Strip, Topology, TopologyProvider,
};

// Events
pub use event::{led_topic, EventAssembler, LedPayload, OutboundEvent, UndefinedPolicy};

// Configuration
pub use config::{BrokerConfig, SchedulerConfig, TopologySource, WaveformSettings, WobbleConfig};
pub use logging::LogConfig;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Waveform parameters violate `max_value > min_value` or `period > 0`
    #[error("Invalid waveform: {0}")]
    InvalidWaveform(String),

    /// Topology contains duplicate indices or is otherwise malformed
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// Any other invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
