//! Capability traits the event ring needs from its collaborators.
//!
//! The ring is generic over the record type and the rolling accumulator so the
//! core can be driven by the real detector records (see
//! [`PulseEvent`](crate::data::pulse::PulseEvent)) or by a trivial stand-in in
//! tests.

use crate::data::fault::{FaultFlags, FaultSource};

/// A measurement record that can be buffered in an
/// [`EventRing`](crate::data::event_ring::EventRing).
///
/// Slots hold independent copies, hence the `Clone` bound.
pub trait RingEvent: FaultSource + Clone {
    /// OR a single fault code into the record.
    fn merge_fault_code(&mut self, code: FaultFlags);

    /// OR every fault carried by `source` into the record.
    fn merge_faults_from<S: FaultSource + ?Sized>(&mut self, source: &S) {
        self.merge_fault_code(source.fault_flags());
    }

    /// Re-evaluate the record's own fault state, folding faults of its
    /// sub-elements into the event-level mask.
    fn refresh_fault_flags(&mut self);
}

/// Running statistic over the events currently resident in a ring.
///
/// The ring calls `accumulate` on every push and `deaccumulate` on every pop,
/// so the two must be exact inverses for the same record.
pub trait RollingAccumulator<E: RingEvent>: FaultSource {
    /// Fold `event` into the running sums.
    fn accumulate(&mut self, event: &E);

    /// Remove the contribution of `event` from the running sums.
    fn deaccumulate(&mut self, event: &E);

    /// Recompute the derived statistic from the running sums.
    fn recompute(&mut self);

    /// Evaluate the stability cut against the last recomputed statistic and
    /// update the mask reported by [`FaultSource::fault_flags`].
    fn update_fault_flags(&mut self);
}
