//! Rolling mean/RMS over the clean pulses resident in the event ring.
//!
//! Sums and sums of squares are kept for the beam current and for each
//! detector channel. Only pulses without reading-level faults contribute, and
//! the same test is applied on removal so accumulate/deaccumulate stay
//! symmetric.

use crate::config::RollingAverageConfig;
use crate::data::event::RollingAccumulator;
use crate::data::fault::{FaultFlags, FaultSource};
use crate::data::pulse::PulseEvent;
use serde::Serialize;
use std::fmt;

/// Running sums for one quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RunningSum {
    sum: f64,
    sum_sq: f64,
}

impl RunningSum {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.sum_sq += value * value;
    }

    fn remove(&mut self, value: f64) {
        self.sum -= value;
        self.sum_sq -= value * value;
    }

    fn stats(&self, count: usize) -> ChannelStats {
        if count == 0 {
            return ChannelStats::default();
        }
        let n = count as f64;
        let mean = self.sum / n;
        // Cancellation can leave a tiny negative variance.
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        ChannelStats {
            mean,
            rms: variance.sqrt(),
        }
    }
}

/// Mean and RMS of one quantity over the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelStats {
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub rms: f64,
}

/// Snapshot of the rolling statistic, as printed after unwinding a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollingSummary {
    /// Clean pulses in the window.
    pub count: usize,
    /// Beam-current statistics.
    pub beam_current: ChannelStats,
    /// Per-channel statistics.
    pub channels: Vec<ChannelStats>,
}

impl fmt::Display for RollingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rolling average over {} clean pulses", self.count)?;
        writeln!(
            f,
            "  beam_current  mean {:>12.4}  rms {:>10.4}",
            self.beam_current.mean, self.beam_current.rms
        )?;
        for (i, stats) in self.channels.iter().enumerate() {
            writeln!(
                f,
                "  channel {:<4}  mean {:>12.4}  rms {:>10.4}",
                i, stats.mean, stats.rms
            )?;
        }
        Ok(())
    }
}

/// Rolling accumulator for [`PulseEvent`]s with an RMS stability cut.
#[derive(Debug, Clone)]
pub struct RollingAverage {
    config: RollingAverageConfig,
    count: usize,
    beam_current: RunningSum,
    channels: Vec<RunningSum>,
    summary: RollingSummary,
    flags: FaultFlags,
}

impl RollingAverage {
    /// Accumulator for pulses with `channels` detector channels.
    #[must_use]
    pub fn new(channels: usize, config: RollingAverageConfig) -> Self {
        Self {
            config,
            count: 0,
            beam_current: RunningSum::default(),
            channels: vec![RunningSum::default(); channels],
            summary: RollingSummary {
                channels: vec![ChannelStats::default(); channels],
                ..Default::default()
            },
            flags: FaultFlags::empty(),
        }
    }

    /// Accumulator sized from a prototype pulse.
    #[must_use]
    pub fn for_prototype(prototype: &PulseEvent, config: RollingAverageConfig) -> Self {
        Self::new(prototype.channels.len(), config)
    }

    /// Clean pulses currently contributing.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Statistic as of the last [`RollingAccumulator::recompute`].
    #[must_use]
    pub fn summary(&self) -> &RollingSummary {
        &self.summary
    }

    /// Raw beam-current sum, mostly useful to check symmetry.
    #[must_use]
    pub fn beam_current_sum(&self) -> f64 {
        self.beam_current.sum
    }

    fn exceeds_cut(&self) -> bool {
        let limit = self.config.max_rms;
        self.summary.beam_current.rms > limit
            || self.summary.channels.iter().any(|c| c.rms > limit)
    }
}

impl FaultSource for RollingAverage {
    fn fault_flags(&self) -> FaultFlags {
        self.flags
    }
}

impl RollingAccumulator<PulseEvent> for RollingAverage {
    fn accumulate(&mut self, event: &PulseEvent) {
        if !event.is_clean() {
            return;
        }
        self.count += 1;
        self.beam_current.add(event.beam_current.value);
        for (sum, reading) in self.channels.iter_mut().zip(&event.channels) {
            sum.add(reading.value);
        }
    }

    fn deaccumulate(&mut self, event: &PulseEvent) {
        if !event.is_clean() || self.count == 0 {
            return;
        }
        self.count -= 1;
        if self.count == 0 {
            // Drop accumulated rounding error once the window drains.
            self.beam_current = RunningSum::default();
            self.channels.fill(RunningSum::default());
            return;
        }
        self.beam_current.remove(event.beam_current.value);
        for (sum, reading) in self.channels.iter_mut().zip(&event.channels) {
            sum.remove(reading.value);
        }
    }

    fn recompute(&mut self) {
        self.summary.count = self.count;
        self.summary.beam_current = self.beam_current.stats(self.count);
        for (stats, sum) in self.summary.channels.iter_mut().zip(&self.channels) {
            *stats = sum.stats(self.count);
        }
    }

    fn update_fault_flags(&mut self) {
        self.flags = if self.count >= self.config.min_samples && self.exceeds_cut() {
            FaultFlags::STABILITY_CUT
        } else {
            FaultFlags::empty()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::pulse::PulseCuts;

    fn config(max_rms: f64, min_samples: usize) -> RollingAverageConfig {
        RollingAverageConfig {
            max_rms,
            min_samples,
        }
    }

    fn pulse(seq: u64, beam: f64, channel: f64) -> PulseEvent {
        let mut event = PulseEvent::new(seq, beam, [channel]);
        event.apply_cuts(&PulseCuts::default());
        event
    }

    #[test]
    fn test_mean_and_rms() {
        let mut avg = RollingAverage::new(1, config(100.0, 1));
        for (i, v) in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].iter().enumerate() {
            avg.accumulate(&pulse(i as u64, *v, 10.0));
        }
        avg.recompute();
        let summary = avg.summary();
        assert_eq!(summary.count, 8);
        assert!((summary.beam_current.mean - 5.0).abs() < 1e-12);
        assert!((summary.beam_current.rms - 2.0).abs() < 1e-12);
        assert!((summary.channels[0].mean - 10.0).abs() < 1e-12);
        assert!(summary.channels[0].rms.abs() < 1e-6);
    }

    #[test]
    fn test_deaccumulate_restores_sums() {
        let mut avg = RollingAverage::new(1, config(100.0, 1));
        avg.accumulate(&pulse(0, 20.0, 3.0));
        let before = avg.beam_current_sum();
        let extra = pulse(1, 30.0, 4.0);
        avg.accumulate(&extra);
        avg.deaccumulate(&extra);
        assert_eq!(avg.count(), 1);
        assert!((avg.beam_current_sum() - before).abs() < 1e-12);
    }

    #[test]
    fn test_faulted_pulses_are_ignored() {
        let mut avg = RollingAverage::new(1, config(100.0, 1));
        let bad = pulse(0, 0.0, 3.0);
        assert!(!bad.is_clean());
        avg.accumulate(&bad);
        assert_eq!(avg.count(), 0);
        avg.deaccumulate(&bad);
        assert_eq!(avg.count(), 0);
    }

    #[test]
    fn test_stability_cut_requires_min_samples() {
        let mut avg = RollingAverage::new(1, config(1.0, 4));
        avg.accumulate(&pulse(0, 10.0, 1.0));
        avg.accumulate(&pulse(1, 30.0, 1.0));
        avg.recompute();
        avg.update_fault_flags();
        assert!(avg.fault_flags().is_empty());

        avg.accumulate(&pulse(2, 10.0, 1.0));
        avg.accumulate(&pulse(3, 30.0, 1.0));
        avg.recompute();
        avg.update_fault_flags();
        assert_eq!(avg.fault_flags(), FaultFlags::STABILITY_CUT);
    }

    #[test]
    fn test_stability_cut_clears_when_window_settles() {
        let mut avg = RollingAverage::new(1, config(1.0, 1));
        let noisy = pulse(0, 40.0, 1.0);
        avg.accumulate(&pulse(1, 10.0, 1.0));
        avg.accumulate(&noisy);
        avg.recompute();
        avg.update_fault_flags();
        assert!(!avg.fault_flags().is_empty());

        avg.deaccumulate(&noisy);
        avg.recompute();
        avg.update_fault_flags();
        assert!(avg.fault_flags().is_empty());
    }

    #[test]
    fn test_summary_display() {
        let mut avg = RollingAverage::new(2, config(100.0, 1));
        avg.accumulate(&PulseEvent::new(0, 10.0, [1.0, 2.0]));
        avg.recompute();
        let text = avg.summary().to_string();
        assert!(text.contains("over 1 clean pulses"));
        assert!(text.contains("channel 1"));
    }
}
