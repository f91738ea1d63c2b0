//! Device / strip / LED addressing hierarchy
//!
//! The topology is owned by whatever supplies configuration; the publisher only
//! ever reads a snapshot of it per tick. Ordering is insertion order throughout.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};

use crate::{CoreError, Result};

/// A single addressable LED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Led {
    /// Index unique within the owning strip
    pub index: u32,
}

/// A strip of LEDs on one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strip {
    /// Index unique within the owning device
    pub index: u32,
    /// LEDs in driving order
    #[serde(default)]
    pub leds: Vec<Led>,
}

impl Strip {
    /// Create a strip with LEDs `0..led_count`
    pub fn with_leds(index: u32, led_count: u32) -> Self {
        Self {
            index,
            leds: (0..led_count).map(|index| Led { index }).collect(),
        }
    }
}

/// An actor device driving one or more strips
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Free-form identifier (e.g. a MAC address)
    pub id: String,
    /// Strips in driving order
    #[serde(default)]
    pub strips: Vec<Strip>,
}

/// Full installation topology
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    /// Devices in configuration order
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl Topology {
    /// Create a topology from a device list
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    /// Parse a topology from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let topology: Self = serde_json::from_str(json)?;
        topology.validate()?;
        Ok(topology)
    }

    /// Load a topology from a JSON file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Total number of LEDs across all devices
    pub fn led_count(&self) -> usize {
        self.devices
            .iter()
            .flat_map(|d| &d.strips)
            .map(|s| s.leds.len())
            .sum()
    }

    /// Whether there is nothing to address
    pub fn is_empty(&self) -> bool {
        self.led_count() == 0
    }

    /// Check index uniqueness (strips per device, LEDs per strip)
    pub fn validate(&self) -> Result<()> {
        for device in &self.devices {
            let mut strip_indices = HashSet::new();
            for strip in &device.strips {
                if !strip_indices.insert(strip.index) {
                    return Err(CoreError::InvalidTopology(format!(
                        "duplicate strip index {} on device '{}'",
                        strip.index, device.id
                    )));
                }

                let mut led_indices = HashSet::new();
                for led in &strip.leds {
                    if !led_indices.insert(led.index) {
                        return Err(CoreError::InvalidTopology(format!(
                            "duplicate LED index {} on strip {} of device '{}'",
                            led.index, strip.index, device.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Position of one LED within the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedAddress {
    /// Position of the device in the topology
    pub device: usize,
    /// Strip index within the device
    pub strip: u32,
    /// LED index within the strip
    pub led: u32,
}

/// Walk every LED in device, strip, LED order
///
/// An absent topology yields nothing, same as an empty one.
pub fn walk(topology: Option<&Topology>) -> impl Iterator<Item = LedAddress> + '_ {
    topology
        .into_iter()
        .flat_map(|t| t.devices.iter().enumerate())
        .flat_map(|(device, d)| {
            d.strips.iter().flat_map(move |strip| {
                strip.leds.iter().map(move |led| LedAddress {
                    device,
                    strip: strip.index,
                    led: led.index,
                })
            })
        })
}

/// Source of topology snapshots
pub trait TopologyProvider {
    /// Current topology, or `None` if nothing has been loaded yet
    fn snapshot(&self) -> Option<Arc<Topology>>;
}

impl<T: TopologyProvider + ?Sized> TopologyProvider for Arc<T> {
    fn snapshot(&self) -> Option<Arc<Topology>> {
        (**self).snapshot()
    }
}

/// Lock-free topology cell shared between the loader and the publisher
#[derive(Debug, Clone, Default)]
pub struct SharedTopology {
    inner: Arc<ArcSwapOption<Topology>>,
}

impl SharedTopology {
    /// A cell with no topology loaded
    pub fn empty() -> Self {
        Self::default()
    }

    /// A cell holding `topology`
    pub fn new(topology: Topology) -> Self {
        let shared = Self::default();
        shared.store(topology);
        shared
    }

    /// Replace the current snapshot
    pub fn store(&self, topology: Topology) {
        self.inner.store(Some(Arc::new(topology)));
    }

    /// Drop the current snapshot
    pub fn clear(&self) {
        self.inner.store(None);
    }

    /// Load and validate `path`, replacing the snapshot on success
    ///
    /// Returns the number of LEDs in the new snapshot. On error the previous
    /// snapshot stays in place.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let topology = Topology::load(path)?;
        let leds = topology.led_count();
        self.store(topology);
        Ok(leds)
    }
}

impl TopologyProvider for SharedTopology {
    fn snapshot(&self) -> Option<Arc<Topology>> {
        self.inner.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, strips: Vec<Strip>) -> Device {
        Device {
            id: id.to_string(),
            strips,
        }
    }

    #[test]
    fn test_walk_absent_topology() {
        assert_eq!(walk(None).count(), 0);
    }

    #[test]
    fn test_walk_preserves_insertion_order() {
        let topology = Topology::new(vec![
            device(
                "b",
                vec![
                    Strip {
                        index: 3,
                        leds: vec![Led { index: 7 }, Led { index: 2 }],
                    },
                    Strip {
                        index: 1,
                        leds: vec![Led { index: 0 }],
                    },
                ],
            ),
            device("a", vec![Strip::with_leds(0, 1)]),
        ]);

        let addresses: Vec<_> = walk(Some(&topology))
            .map(|a| (a.device, a.strip, a.led))
            .collect();
        assert_eq!(
            addresses,
            vec![(0, 3, 7), (0, 3, 2), (0, 1, 0), (1, 0, 0)]
        );
    }

    #[test]
    fn test_walk_skips_empty_branches() {
        let topology = Topology::new(vec![
            device("empty", vec![]),
            device("no-leds", vec![Strip::with_leds(0, 0)]),
            device("one", vec![Strip::with_leds(4, 1)]),
        ]);
        let addresses: Vec<_> = walk(Some(&topology)).collect();
        assert_eq!(
            addresses,
            vec![LedAddress {
                device: 2,
                strip: 4,
                led: 0
            }]
        );
        assert_eq!(topology.led_count(), 1);
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let dup_strip = Topology::new(vec![device(
            "d",
            vec![Strip::with_leds(0, 1), Strip::with_leds(0, 1)],
        )]);
        assert!(matches!(
            dup_strip.validate(),
            Err(CoreError::InvalidTopology(_))
        ));

        let dup_led = Topology::new(vec![device(
            "d",
            vec![Strip {
                index: 0,
                leds: vec![Led { index: 1 }, Led { index: 1 }],
            }],
        )]);
        assert!(dup_led.validate().is_err());

        // Same indices on different devices are fine
        let ok = Topology::new(vec![
            device("a", vec![Strip::with_leds(0, 2)]),
            device("b", vec![Strip::with_leds(0, 2)]),
        ]);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "devices": [
                { "id": "aa:bb", "strips": [ { "index": 1, "leds": [ { "index": 0 }, { "index": 1 } ] } ] },
                { "id": "cc:dd" }
            ]
        }"#;
        let topology = Topology::from_json(json).unwrap();
        assert_eq!(topology.devices.len(), 2);
        assert_eq!(topology.led_count(), 2);
        assert!(topology.devices[1].strips.is_empty());
    }

    #[test]
    fn test_shared_topology_swap() {
        let shared = SharedTopology::empty();
        assert!(shared.snapshot().is_none());

        shared.store(Topology::new(vec![device("a", vec![Strip::with_leds(0, 3)])]));
        let first = shared.snapshot().unwrap();
        assert_eq!(first.led_count(), 3);

        // Held snapshots are unaffected by later swaps
        let clone = shared.clone();
        clone.clear();
        assert!(shared.snapshot().is_none());
        assert_eq!(first.led_count(), 3);
    }
}
