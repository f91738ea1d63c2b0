//! Wobble Control - Broker Delivery
//!
//! This crate takes the events built by `wobble-core` to a message broker:
//! - **Broker**: the [`BrokerClient`] seam plus a dry-run [`LogBroker`]
//! - **MQTT**: a QoS 0 publisher on top of `rumqttc`
//! - **Publisher**: one batch per tick, or an idle backoff when there is nothing to send
//! - **Task**: the full evaluate / walk / assemble / publish tick
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wobble_control::{LogBroker, WobbleTask};
//! use wobble_core::{SharedTopology, WobbleConfig};
//!
//! # fn main() -> wobble_control::Result<()> {
//! let config = WobbleConfig::default();
//! let mut task = WobbleTask::from_config(&config, SharedTopology::empty(), LogBroker::new())?;
//! task.tick()?;
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]

/// Error types
pub mod error;

/// Broker client abstraction
pub mod broker;
/// MQTT output
pub mod mqtt;
/// Batch delivery and idle backoff
pub mod publisher;
/// Tick pipeline
pub mod task;

// Re-exports
pub use broker::{BrokerClient, LogBroker};
pub use error::{ControlError, Result};
pub use mqtt::{MqttClient, MqttOptions};
pub use publisher::{PublishOutcome, Publisher, Sleeper, ThreadSleeper};
pub use task::WobbleTask;
