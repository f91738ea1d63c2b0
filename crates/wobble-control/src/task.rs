//! The wobble tick: evaluate, walk, assemble, publish

use chrono::{DateTime, Utc};
use wobble_core::{
    evaluate, walk, EventAssembler, TopologyProvider, WaveformConfig, WobbleConfig,
};

use crate::broker::BrokerClient;
use crate::publisher::{PublishOutcome, Publisher, Sleeper, ThreadSleeper};
use crate::Result;

/// One full pipeline, invoked once per scheduler tick
///
/// All collaborators are passed in; nothing is looked up globally.
pub struct WobbleTask<P, B, S = ThreadSleeper> {
    waveform: WaveformConfig,
    assembler: EventAssembler,
    topology: P,
    publisher: Publisher<B, S>,
}

impl<P: TopologyProvider, B: BrokerClient> WobbleTask<P, B> {
    /// Build a task from validated configuration
    pub fn from_config(config: &WobbleConfig, topology: P, broker: B) -> Result<Self> {
        let waveform = config.waveform_config()?;
        let publisher = Publisher::new(broker, config.scheduler.unsuccessful_task_delay());
        Ok(Self::new(waveform, config.assembler(), topology, publisher))
    }
}

impl<P: TopologyProvider, B: BrokerClient, S: Sleeper> WobbleTask<P, B, S> {
    pub fn new(
        waveform: WaveformConfig,
        assembler: EventAssembler,
        topology: P,
        publisher: Publisher<B, S>,
    ) -> Self {
        Self {
            waveform,
            assembler,
            topology,
            publisher,
        }
    }

    /// Run one tick against the wall clock
    pub fn tick(&mut self) -> Result<PublishOutcome> {
        self.tick_at(Utc::now())
    }

    /// Run one tick as if it were `now`
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Result<PublishOutcome> {
        let intensity = evaluate(now, &self.waveform);

        let snapshot = self.topology.snapshot();
        let events = self
            .assembler
            .assemble(intensity, walk(snapshot.as_deref()), now)?;

        tracing::trace!(%intensity, events = events.len(), "wobble tick");
        self.publisher.publish(events)
    }

    pub fn waveform(&self) -> &WaveformConfig {
        &self.waveform
    }

    pub fn publisher(&self) -> &Publisher<B, S> {
        &self.publisher
    }
}
