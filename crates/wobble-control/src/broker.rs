//! Broker client abstraction

use wobble_core::OutboundEvent;

use crate::Result;

/// Anything that can take a batch of events to a broker
///
/// One call is one unit of work. Messages inside it are independent at the
/// protocol level; there is no all-or-nothing guarantee.
pub trait BrokerClient {
    /// Hand the whole batch to the broker
    fn publish_batch(&mut self, events: &[OutboundEvent]) -> Result<()>;
}

impl<B: BrokerClient + ?Sized> BrokerClient for Box<B> {
    fn publish_batch(&mut self, events: &[OutboundEvent]) -> Result<()> {
        (**self).publish_batch(events)
    }
}

/// Dry-run broker that only logs what would be sent
#[derive(Debug, Default)]
pub struct LogBroker {
    published: u64,
}

impl LogBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events logged so far
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl BrokerClient for LogBroker {
    fn publish_batch(&mut self, events: &[OutboundEvent]) -> Result<()> {
        for event in events {
            tracing::debug!(topic = %event.topic, payload = %event.payload, "dry-run publish");
        }
        self.published += events.len() as u64;
        Ok(())
    }
}
