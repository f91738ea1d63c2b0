//! Outbound broker events
//!
//! One event per LED: topic `<topic root>/<LED index>`, a JSON payload carrying
//! strip, LED and three identical channel values, and the assembly timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::topology::LedAddress;
use crate::waveform::Intensity;
use crate::Result;

/// Default topic root for per-LED messages
pub const DEFAULT_LED_TOPIC_ROOT: &str = "light/led";

/// What to do with an undefined intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndefinedPolicy {
    /// Publish it as `-1` on every channel
    #[default]
    Emit,
    /// Publish nothing for this tick
    Suppress,
}

/// Single-LED payload; the three channels always carry the same value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedPayload {
    /// Strip index within the device
    pub strip_id: String,
    /// LED index within the strip
    pub led_id: String,
    /// Red channel
    pub red: String,
    /// Green channel
    pub green: String,
    /// Blue channel
    pub blue: String,
}

impl LedPayload {
    /// Uniform payload for one LED
    pub fn uniform(address: &LedAddress, value: i64) -> Self {
        let value = value.to_string();
        Self {
            strip_id: address.strip.to_string(),
            led_id: address.led.to_string(),
            red: value.clone(),
            green: value.clone(),
            blue: value,
        }
    }
}

/// A message ready to be handed to the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEvent {
    /// Broker topic
    pub topic: String,
    /// Serialized [`LedPayload`]
    pub payload: String,
    /// When the batch was assembled
    pub timestamp: DateTime<Utc>,
}

/// Topic for the LED with index `led`
pub fn led_topic(topic_root: &str, led: u32) -> String {
    format!("{}/{}", topic_root, led)
}

/// Builds one event per LED address
#[derive(Debug, Clone)]
pub struct EventAssembler {
    topic_root: String,
    policy: UndefinedPolicy,
}

impl EventAssembler {
    /// Create an assembler publishing under `topic_root`
    pub fn new(topic_root: impl Into<String>, policy: UndefinedPolicy) -> Self {
        Self {
            topic_root: topic_root.into(),
            policy,
        }
    }

    /// Topic root events are addressed under
    pub fn topic_root(&self) -> &str {
        &self.topic_root
    }

    /// Handling of undefined intensities
    pub fn policy(&self) -> UndefinedPolicy {
        self.policy
    }

    /// Assemble the batch for one tick
    ///
    /// Every event carries the same `intensity` and `timestamp`. Order follows
    /// `addresses`.
    pub fn assemble<I>(
        &self,
        intensity: Intensity,
        addresses: I,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<OutboundEvent>>
    where
        I: IntoIterator<Item = LedAddress>,
    {
        if !intensity.is_defined() && self.policy == UndefinedPolicy::Suppress {
            tracing::warn!("Suppressing batch with undefined intensity");
            return Ok(Vec::new());
        }

        let value = intensity.wire_value();
        addresses
            .into_iter()
            .map(|address| -> Result<OutboundEvent> {
                let payload = LedPayload::uniform(&address, value);
                Ok(OutboundEvent {
                    topic: led_topic(&self.topic_root, address.led),
                    payload: serde_json::to_string(&payload)?,
                    timestamp,
                })
            })
            .collect()
    }
}

impl Default for EventAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_LED_TOPIC_ROOT, UndefinedPolicy::default())
    }
}
