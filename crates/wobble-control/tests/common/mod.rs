#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use wobble_control::{BrokerClient, ControlError, Result, Sleeper};
use wobble_core::{Device, OutboundEvent, Strip, Topology};

/// Broker that records every batch it receives
#[derive(Default)]
pub struct RecordingBroker {
    pub batches: Vec<Vec<OutboundEvent>>,
    pub fail: bool,
}

impl RecordingBroker {
    pub fn failing() -> Self {
        Self {
            batches: Vec::new(),
            fail: true,
        }
    }
}

impl BrokerClient for RecordingBroker {
    fn publish_batch(&mut self, events: &[OutboundEvent]) -> Result<()> {
        self.batches.push(events.to_vec());
        if self.fail {
            return Err(ControlError::BrokerUnavailable("test broker down".to_string()));
        }
        Ok(())
    }
}

/// Sleeper that records requested pauses instead of sleeping
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    pub sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

/// One device, two strips, two LEDs each
pub fn two_by_two() -> Topology {
    Topology::new(vec![Device {
        id: "actor-1".to_string(),
        strips: vec![Strip::with_leds(0, 2), Strip::with_leds(1, 2)],
    }])
}
