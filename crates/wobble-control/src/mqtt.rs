//! MQTT output
//!
//! [`MqttClient`] wraps a `rumqttc` client: clean session, QoS 0, no
//! subscriptions. The `rumqttc` event loop runs on its own thread and reports
//! session state back; publishing while the session is down fails fast with
//! [`ControlError::BrokerUnavailable`] instead of queueing.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use wobble_control::mqtt::{MqttClient, MqttOptions};
//! use wobble_control::BrokerClient;
//! use wobble_core::OutboundEvent;
//!
//! # fn main() -> wobble_control::Result<()> {
//! let mut client = MqttClient::new(MqttOptions::new("127.0.0.1", 1883, "wobble-docs"))?;
//!
//! let event = OutboundEvent {
//!     topic: "light/led/0".to_string(),
//!     payload: r#"{"stripId":"0","ledId":"0","red":"30","green":"30","blue":"30"}"#.to_string(),
//!     timestamp: chrono::Utc::now(),
//! };
//! client.publish_batch(&[event])?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rumqttc::{Client, Connection, Event, Packet, QoS};
use wobble_core::{BrokerConfig, OutboundEvent};

use crate::broker::BrokerClient;
use crate::{error::ControlError, Result};

/// Connection settings for [`MqttClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttOptions {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Zero disables keep alive
    pub keep_alive_secs: u16,
    /// Pause between reconnect attempts
    pub reconnect_delay: Duration,
    /// Publishes that may wait for the event loop; must hold a full batch
    pub request_capacity: usize,
}

impl MqttOptions {
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
            keep_alive_secs: 30,
            reconnect_delay: Duration::from_secs(1),
            request_capacity: 1024,
        }
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn to_rumqttc(&self) -> rumqttc::MqttOptions {
        let mut options = rumqttc::MqttOptions::new(&self.client_id, &self.host, self.port);
        options
            .set_keep_alive(Duration::from_secs(u64::from(self.keep_alive_secs)))
            .set_clean_session(true);
        options
    }
}

impl From<&BrokerConfig> for MqttOptions {
    fn from(config: &BrokerConfig) -> Self {
        Self {
            keep_alive_secs: config.keep_alive_secs,
            reconnect_delay: config.reconnect_delay(),
            ..Self::new(config.host.clone(), config.port, config.client_id.clone())
        }
    }
}

/// Session state shared with the event loop thread
#[derive(Default)]
struct Session {
    connected: AtomicBool,
    closing: AtomicBool,
    last_error: Mutex<Option<String>>,
}

/// QoS 0 MQTT client
///
/// Messages are fire-and-forget. The event loop reconnects on its own after
/// `reconnect_delay`; batches published in between are rejected.
pub struct MqttClient {
    options: MqttOptions,
    client: Client,
    session: Arc<Session>,
}

impl MqttClient {
    /// Create a client and start its event loop thread
    pub fn new(options: MqttOptions) -> Result<Self> {
        if options.client_id.trim().is_empty() || options.client_id.starts_with(' ') {
            return Err(ControlError::InvalidParameter(format!(
                "MQTT client id '{}' is not valid",
                options.client_id
            )));
        }
        if options.host.trim().is_empty() {
            return Err(ControlError::InvalidParameter(
                "MQTT broker host must not be empty".to_string(),
            ));
        }
        if options.request_capacity == 0 {
            return Err(ControlError::InvalidParameter(
                "MQTT request capacity must be greater than 0".to_string(),
            ));
        }

        let (client, connection) = Client::new(options.to_rumqttc(), options.request_capacity);
        let session = Arc::new(Session::default());

        let address = options.address();
        let reconnect_delay = options.reconnect_delay;
        let loop_session = Arc::clone(&session);
        thread::Builder::new()
            .name("wobble-mqtt".to_string())
            .spawn(move || run_event_loop(connection, &loop_session, &address, reconnect_delay))
            .map_err(|e| {
                ControlError::BrokerUnavailable(format!("failed to start MQTT event loop: {}", e))
            })?;

        tracing::info!(
            "MQTT client '{}' created for {}",
            options.client_id,
            options.address()
        );

        Ok(Self {
            options,
            client,
            session,
        })
    }

    /// Whether the broker has acknowledged the current session
    pub fn is_connected(&self) -> bool {
        self.session.connected.load(Ordering::Acquire)
    }

    /// Connection settings
    pub fn options(&self) -> &MqttOptions {
        &self.options
    }

    fn unavailable(&self) -> ControlError {
        let reason = self
            .session
            .last_error
            .lock()
            .clone()
            .unwrap_or_else(|| "not connected".to_string());
        ControlError::BrokerUnavailable(format!("{}: {}", self.options.address(), reason))
    }
}

/// Drive `rumqttc` until the owning client is dropped
fn run_event_loop(
    mut connection: Connection,
    session: &Session,
    address: &str,
    reconnect_delay: Duration,
) {
    for notification in connection.iter() {
        if session.closing.load(Ordering::Acquire) {
            break;
        }

        match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                *session.last_error.lock() = None;
                session.connected.store(true, Ordering::Release);
                tracing::info!("Connected to MQTT broker {}", address);
            }
            Ok(_) => {}
            Err(e) => {
                // Only the transition is worth a warning; retries stay at debug
                if session.connected.swap(false, Ordering::AcqRel) {
                    tracing::warn!("Lost MQTT broker {}: {}", address, e);
                } else {
                    tracing::debug!("MQTT broker {} unavailable: {}", address, e);
                }
                *session.last_error.lock() = Some(e.to_string());
                thread::sleep(reconnect_delay);
            }
        }
    }
    session.connected.store(false, Ordering::Release);
    tracing::debug!("MQTT event loop for {} stopped", address);
}

fn validate_topic(topic: &str) -> Result<()> {
    if topic.is_empty() || topic.contains(['+', '#']) {
        return Err(ControlError::Serialization(format!(
            "invalid publish topic '{}'",
            topic
        )));
    }
    Ok(())
}

impl BrokerClient for MqttClient {
    fn publish_batch(&mut self, events: &[OutboundEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        // Check every topic first so a bad event never leaves half a batch queued
        for event in events {
            validate_topic(&event.topic)?;
        }
        if !self.is_connected() {
            return Err(self.unavailable());
        }

        for event in events {
            self.client
                .try_publish(
                    event.topic.as_str(),
                    QoS::AtMostOnce,
                    false,
                    event.payload.as_bytes(),
                )
                .map_err(|e| {
                    ControlError::BrokerUnavailable(format!(
                        "{}: {}",
                        self.options.address(),
                        e
                    ))
                })?;
        }

        tracing::trace!("Queued {} MQTT messages", events.len());
        Ok(())
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        self.session.closing.store(true, Ordering::Release);
        let _ = self.client.try_disconnect();
    }
}
