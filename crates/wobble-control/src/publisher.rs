//! Batch delivery with idle backoff
//!
//! Each call is either *Delivering* (events present: one hand-off to the
//! broker) or *Idle* (nothing to send: pause for the configured delay so the
//! scheduler does not spin while no topology is loaded). No state survives
//! between calls.

use std::time::Duration;

use wobble_core::OutboundEvent;

use crate::broker::BrokerClient;
use crate::Result;

/// Blocking pause used by the idle path
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// What one publish call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Batch of this many events handed to the broker
    Delivered(usize),
    /// Nothing to send; backed off
    Idle,
}

/// Hands event batches to a broker
pub struct Publisher<B, S = ThreadSleeper> {
    broker: B,
    idle_delay: Duration,
    sleeper: S,
}

impl<B: BrokerClient> Publisher<B> {
    /// Create a publisher that sleeps the calling thread on the idle path
    pub fn new(broker: B, idle_delay: Duration) -> Self {
        Self::with_sleeper(broker, idle_delay, ThreadSleeper)
    }
}

impl<B: BrokerClient, S: Sleeper> Publisher<B, S> {
    /// Create a publisher with a custom idle sleeper
    pub fn with_sleeper(broker: B, idle_delay: Duration, sleeper: S) -> Self {
        Self {
            broker,
            idle_delay,
            sleeper,
        }
    }

    /// Deliver `events`, or back off if there are none
    ///
    /// Broker errors are returned as-is; nothing is retried here.
    pub fn publish(&mut self, events: Vec<OutboundEvent>) -> Result<PublishOutcome> {
        if events.is_empty() {
            tracing::debug!(".");
            self.sleeper.sleep(self.idle_delay);
            return Ok(PublishOutcome::Idle);
        }

        self.broker.publish_batch(&events)?;
        Ok(PublishOutcome::Delivered(events.len()))
    }

    pub fn idle_delay(&self) -> Duration {
        self.idle_delay
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut B {
        &mut self.broker
    }
}
