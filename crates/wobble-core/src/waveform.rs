//! Triangular ("wobble") waveform evaluation
//!
//! The wave rises linearly from `min_value` to `max_value` over the first half
//! of its length and falls back over the second half. Its length is
//! `(max_value - min_value) * period`, with the period counted in milliseconds,
//! so a wider value range also slows the wave down.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{CoreError, Result};

/// Wire encoding of an undefined intensity
pub const UNDEFINED_WIRE_VALUE: i64 = -1;

/// Immutable waveform parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformConfig {
    period: Duration,
    min_value: i64,
    max_value: i64,
}

impl WaveformConfig {
    /// Create a validated waveform configuration
    ///
    /// # Arguments
    /// * `period` - Time per value step; only whole milliseconds count
    /// * `min_value` - Value at the start and end of every wave
    /// * `max_value` - Value at the crest, must be greater than `min_value`
    pub fn new(period: Duration, min_value: i64, max_value: i64) -> Result<Self> {
        if max_value <= min_value {
            return Err(CoreError::InvalidWaveform(format!(
                "max_value ({}) must be greater than min_value ({})",
                max_value, min_value
            )));
        }
        if period.as_millis() == 0 {
            return Err(CoreError::InvalidWaveform(format!(
                "period must be at least 1ms, got {:?}",
                period
            )));
        }

        let config = Self {
            period,
            min_value,
            max_value,
        };
        if config.checked_wave_length_ms().is_none() {
            return Err(CoreError::InvalidWaveform(format!(
                "wave length overflows for range {}..={} and period {:?}",
                min_value, max_value, period
            )));
        }

        Ok(config)
    }

    /// Time per value step
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Lower bound of the wave
    pub fn min_value(&self) -> i64 {
        self.min_value
    }

    /// Upper bound of the wave
    pub fn max_value(&self) -> i64 {
        self.max_value
    }

    /// Length of one full rise-and-fall cycle in milliseconds
    pub fn wave_length_ms(&self) -> i64 {
        // Validated in `new`
        self.checked_wave_length_ms().unwrap_or(0)
    }

    fn checked_wave_length_ms(&self) -> Option<i64> {
        let range = self.max_value.checked_sub(self.min_value)?;
        let period_ms = i64::try_from(self.period.as_millis()).ok()?;
        range.checked_mul(period_ms)
    }
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(3),
            min_value: 0,
            max_value: 60,
        }
    }
}

/// Result of evaluating the waveform at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intensity {
    /// A value within `[min_value, max_value]`
    Defined(i64),
    /// The phase fell outside both slopes
    Undefined,
}

impl Intensity {
    /// The value, if defined
    pub fn value(&self) -> Option<i64> {
        match self {
            Self::Defined(v) => Some(*v),
            Self::Undefined => None,
        }
    }

    /// Whether this is a real intensity
    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Defined(_))
    }

    /// Value as it is written into payloads (`-1` when undefined)
    pub fn wire_value(&self) -> i64 {
        self.value().unwrap_or(UNDEFINED_WIRE_VALUE)
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined(v) => write!(f, "{}", v),
            Self::Undefined => write!(f, "undefined"),
        }
    }
}

/// Evaluate the waveform at a wall-clock instant
pub fn evaluate(now: DateTime<Utc>, config: &WaveformConfig) -> Intensity {
    evaluate_at_millis(now.timestamp_millis(), config)
}

/// Evaluate the waveform at `millis` milliseconds since the Unix epoch
pub fn evaluate_at_millis(millis: i64, config: &WaveformConfig) -> Intensity {
    let wave_length = config.wave_length_ms();
    if wave_length <= 0 {
        tracing::warn!("Wobble wave length is {}ms, no value defined", wave_length);
        return Intensity::Undefined;
    }

    let t = millis.rem_euclid(wave_length);
    let half = wave_length / 2;
    if half == 0 {
        tracing::warn!("Wobble wave of {}ms has no slope to evaluate", wave_length);
        return Intensity::Undefined;
    }

    let min = config.min_value as f64;
    let max = config.max_value as f64;
    let half_f = half as f64;

    // Rising slope wins the shared crest at t == half
    if (0..=half).contains(&t) {
        let value = t as f64 * ((max - min) / half_f) + min;
        Intensity::Defined(value.round() as i64)
    } else if (half..=wave_length).contains(&t) {
        let value = t as f64 * ((min - max) / half_f) + (2.0 * max - min);
        Intensity::Defined(value.round() as i64)
    } else {
        tracing::warn!("Wobble phase {} outside wave of {}ms", t, wave_length);
        Intensity::Undefined
    }
}
