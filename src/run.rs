//! Producer/consumer driver for a single analysis run.
//!
//! Pushes every event into the ring, pops one event whenever the ring is
//! ready, and unwinds what is left at the end. Popped events are tallied by
//! fault code into a [`RunReport`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

use crate::data::event::{RingEvent, RollingAccumulator};
use crate::data::event_ring::EventRing;
use crate::data::fault::{FaultFlags, FaultSource};

/// Tally of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Events pushed into the ring.
    pub pushed: u64,
    /// Events popped while the ring was ready.
    pub popped: u64,
    /// Events drained by the final unwind.
    pub unwound: u64,
    /// Delivered events without any fault.
    pub clean: u64,
    /// Delivered events carrying each fault code, by name.
    pub faults: BTreeMap<String, u64>,
}

impl RunReport {
    /// Events handed to the consumer (popped or unwound).
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.popped + self.unwound
    }

    /// Delivered events carrying `flag`.
    #[must_use]
    pub fn count(&self, flag: FaultFlags) -> u64 {
        FaultFlags::NAMED
            .iter()
            .find(|(_, f)| *f == flag)
            .and_then(|(name, _)| self.faults.get(*name))
            .copied()
            .unwrap_or(0)
    }

    fn record(&mut self, flags: FaultFlags) {
        if flags.is_empty() {
            self.clean += 1;
            return;
        }
        for (name, flag) in FaultFlags::NAMED {
            if flags.contains(flag) {
                *self.faults.entry(name.to_string()).or_insert(0) += 1;
            }
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pushed:     {}", self.pushed)?;
        writeln!(f, "Popped:     {}", self.popped)?;
        writeln!(f, "Unwound:    {}", self.unwound)?;
        writeln!(f, "Clean:      {}", self.clean)?;
        for (name, _) in FaultFlags::NAMED {
            if let Some(count) = self.faults.get(name) {
                writeln!(f, "  {:<14} {}", name, count)?;
            }
        }
        Ok(())
    }
}

/// Push every event, popping one whenever the ring is ready.
pub fn process<E, A, I>(ring: &mut EventRing<E, A>, events: I, report: &mut RunReport)
where
    E: RingEvent,
    A: RollingAccumulator<E>,
    I: IntoIterator<Item = E>,
{
    for event in events {
        ring.push(event);
        report.pushed += 1;

        if ring.is_ready() {
            // The ready check above makes this infallible.
            if let Ok(event) = ring.pop() {
                report.popped += 1;
                report.record(event.fault_flags());
            }
        }
    }
}

/// Unwind the ring and tally the drained events.
pub fn finish<E, A>(ring: &mut EventRing<E, A>, report: &mut RunReport)
where
    E: RingEvent,
    A: RollingAccumulator<E>,
{
    for event in ring.unwind() {
        report.unwound += 1;
        report.record(event.fault_flags());
    }
    info!(
        pushed = report.pushed,
        delivered = report.delivered(),
        clean = report.clean,
        "Run finished"
    );
}
