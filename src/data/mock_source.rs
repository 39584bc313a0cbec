//! Simulated pulse source for runs without a readout.
//!
//! Produces a seeded, reproducible stream of [`PulseEvent`]s: a nominal beam
//! current with Gaussian jitter and `channels` detector readings proportional
//! to it. Beam trips can be injected; during a trip the beam current collapses
//! and afterwards ramps back to nominal over `ramp_pulses` pulses. Readout
//! dropouts can be injected too; the dropped channel reads NaN.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use std::str::FromStr;

use crate::data::pulse::{PulseCuts, PulseEvent};

/// An injected beam trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trip {
    /// Sequence number of the first pulse without beam.
    pub start: u64,
    /// Pulses without beam.
    pub length: u64,
}

impl Trip {
    fn covers(&self, sequence: u64) -> bool {
        sequence >= self.start && sequence < self.end()
    }

    fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }
}

impl FromStr for Trip {
    type Err = String;

    /// Parse `START:LENGTH`, e.g. `1200:40`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, length) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid trip '{}'. Expected START:LENGTH", s))?;
        let start = start
            .trim()
            .parse()
            .map_err(|e| format!("Invalid trip start '{}': {}", start, e))?;
        let length = length
            .trim()
            .parse()
            .map_err(|e| format!("Invalid trip length '{}': {}", length, e))?;
        Ok(Self { start, length })
    }
}

/// Seeded generator of synthetic pulses.
#[derive(Debug, Clone)]
pub struct MockPulseSource {
    rng: StdRng,
    next_sequence: u64,
    channels: usize,
    beam_current: f64,
    beam_jitter: f64,
    channel_gain: f64,
    channel_jitter: f64,
    ramp_pulses: u64,
    trips: Vec<Trip>,
    dropouts: Vec<u64>,
    cuts: PulseCuts,
}

impl MockPulseSource {
    /// Source with `channels` detector channels and default beam parameters
    /// (50 uA, 0.5 uA jitter, gain 2, ramp of 20 pulses).
    #[must_use]
    pub fn new(seed: u64, channels: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_sequence: 0,
            channels,
            beam_current: 50.0,
            beam_jitter: 0.5,
            channel_gain: 2.0,
            channel_jitter: 1.0,
            ramp_pulses: 20,
            trips: Vec::new(),
            dropouts: Vec::new(),
            cuts: PulseCuts::default(),
        }
    }

    /// Nominal beam current and its jitter.
    #[must_use]
    pub fn with_beam(mut self, current: f64, jitter: f64) -> Self {
        self.beam_current = current;
        self.beam_jitter = jitter;
        self
    }

    /// Pulses taken to recover nominal current after a trip.
    #[must_use]
    pub fn with_ramp(mut self, pulses: u64) -> Self {
        self.ramp_pulses = pulses;
        self
    }

    /// Inject a beam trip.
    #[must_use]
    pub fn with_trip(mut self, trip: Trip) -> Self {
        self.trips.push(trip);
        self
    }

    /// Drop the first channel's readout on pulse `sequence`.
    #[must_use]
    pub fn with_dropout(mut self, sequence: u64) -> Self {
        self.dropouts.push(sequence);
        self
    }

    /// Cuts applied to every generated pulse.
    #[must_use]
    pub fn with_cuts(mut self, cuts: PulseCuts) -> Self {
        self.cuts = cuts;
        self
    }

    /// Empty pulse shaped like the ones this source emits.
    #[must_use]
    pub fn prototype(&self) -> PulseEvent {
        PulseEvent::prototype(self.channels)
    }

    /// Generate the next pulse.
    pub fn next_pulse(&mut self) -> PulseEvent {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let scale = self.beam_scale(sequence);
        let noise: f64 = StandardNormal.sample(&mut self.rng);
        let beam = (self.beam_current * scale + noise * self.beam_jitter * scale).max(0.0);
        let mut channels: Vec<f64> = (0..self.channels)
            .map(|_| {
                let noise: f64 = StandardNormal.sample(&mut self.rng);
                beam * self.channel_gain + noise * self.channel_jitter
            })
            .collect();
        if self.dropouts.contains(&sequence) {
            if let Some(first) = channels.first_mut() {
                *first = f64::NAN;
            }
        }

        let mut pulse = PulseEvent::new(sequence, beam, channels);
        pulse.apply_cuts(&self.cuts);
        pulse
    }

    /// Fraction of nominal current delivered at `sequence`.
    fn beam_scale(&self, sequence: u64) -> f64 {
        if self.trips.iter().any(|t| t.covers(sequence)) {
            return 0.0;
        }
        let since_trip = self
            .trips
            .iter()
            .filter(|t| sequence >= t.end())
            .map(|t| sequence - t.end())
            .min();
        match since_trip {
            Some(n) if n < self.ramp_pulses => (n + 1) as f64 / (self.ramp_pulses + 1) as f64,
            _ => 1.0,
        }
    }
}

impl Iterator for MockPulseSource {
    type Item = PulseEvent;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_pulse())
    }
}
