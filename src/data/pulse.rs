//! Per-pulse detector record.
//!
//! One [`PulseEvent`] is produced per beam pulse: a beam-current reading from
//! the reference monitor plus one reading per detector channel. Cuts applied by
//! the producer mark individual readings; the ring later marks the event as a
//! whole (stability cut, beam-trip holdoff).

use crate::config::PulseCutsConfig;
use crate::data::event::RingEvent;
use crate::data::fault::{FaultFlags, FaultSource};
use serde::{Deserialize, Serialize};

/// A single reading with its own fault mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Measured value.
    pub value: f64,
    /// Faults raised against this reading.
    #[serde(with = "flag_bits")]
    pub flags: FaultFlags,
}

impl Reading {
    /// A clean reading.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self {
            value,
            flags: FaultFlags::empty(),
        }
    }
}

/// Per-pulse cuts. Built from [`PulseCutsConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseCuts {
    /// Beam current below this raises `BEAM_CURRENT`.
    pub min_beam_current: f64,
    /// Channel readings below this raise `LOW_SIGNAL`.
    pub min_channel_signal: f64,
    /// Readings at or above this raise `SATURATION`.
    pub saturation_level: f64,
}

impl Default for PulseCuts {
    fn default() -> Self {
        PulseCutsConfig::default().into()
    }
}

impl From<PulseCutsConfig> for PulseCuts {
    fn from(config: PulseCutsConfig) -> Self {
        Self {
            min_beam_current: config.min_beam_current,
            min_channel_signal: config.min_channel_signal,
            saturation_level: config.saturation_level,
        }
    }
}

/// Measurement record for one beam pulse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PulseEvent {
    /// Pulse sequence number from the readout.
    pub sequence: u64,
    /// Reference beam-current monitor reading.
    pub beam_current: Reading,
    /// Detector channel readings.
    pub channels: Vec<Reading>,
    /// Event-level fault mask.
    #[serde(with = "flag_bits")]
    pub flags: FaultFlags,
}

impl PulseEvent {
    /// Build a clean record from raw values.
    #[must_use]
    pub fn new(sequence: u64, beam_current: f64, channels: impl IntoIterator<Item = f64>) -> Self {
        Self {
            sequence,
            beam_current: Reading::new(beam_current),
            channels: channels.into_iter().map(Reading::new).collect(),
            flags: FaultFlags::empty(),
        }
    }

    /// Empty record with `channels` zeroed readings, used to pre-size ring slots.
    #[must_use]
    pub fn prototype(channels: usize) -> Self {
        Self::new(0, 0.0, std::iter::repeat(0.0).take(channels))
    }

    /// Apply per-reading cuts and fold the result into the event mask.
    ///
    /// A non-finite value is a readout error and raises `HARDWARE`.
    pub fn apply_cuts(&mut self, cuts: &PulseCuts) {
        if self.beam_current.value < cuts.min_beam_current {
            self.beam_current.flags |= FaultFlags::BEAM_CURRENT;
        }
        if self.beam_current.value >= cuts.saturation_level {
            self.beam_current.flags |= FaultFlags::SATURATION;
        }
        for reading in std::iter::once(&mut self.beam_current).chain(&mut self.channels) {
            if !reading.value.is_finite() {
                reading.flags |= FaultFlags::HARDWARE;
            }
        }
        for reading in &mut self.channels {
            if reading.value < cuts.min_channel_signal {
                reading.flags |= FaultFlags::LOW_SIGNAL;
            }
            if reading.value >= cuts.saturation_level {
                reading.flags |= FaultFlags::SATURATION;
            }
        }
        self.refresh_fault_flags();
    }

    /// Union of every reading-level mask.
    #[must_use]
    pub fn reading_flags(&self) -> FaultFlags {
        self.channels
            .iter()
            .fold(self.beam_current.flags, |acc, r| acc | r.flags)
    }

    /// True when no reading carries a fault.
    ///
    /// Event-level flags are ignored: the ring merges stability and trip
    /// faults there while the event is resident, and the rolling average
    /// must make the same inclusion decision at pop time as at push time.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.reading_flags().is_empty()
    }
}

impl FaultSource for PulseEvent {
    fn fault_flags(&self) -> FaultFlags {
        self.flags | self.reading_flags()
    }
}

impl RingEvent for PulseEvent {
    fn merge_fault_code(&mut self, code: FaultFlags) {
        self.flags |= code;
    }

    fn refresh_fault_flags(&mut self) {
        self.flags |= self.reading_flags();
    }
}

mod flag_bits {
    use crate::data::fault::FaultFlags;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(flags: &FaultFlags, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(flags.bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FaultFlags, D::Error> {
        Ok(FaultFlags::from_bits_retain(u32::deserialize(deserializer)?))
    }
}
