//! Fixed-capacity event ring with beam-trip holdoff.
//!
//! The ring sits between the per-pulse readout and the analysis stage. It keeps
//! the most recent `N` events so a rolling statistic can be maintained over
//! them, and it taints the whole window when the beam becomes unstable:
//!
//! - **Stability cut**: once the ring is ready, every push recomputes the
//!   rolling statistic. If the accumulator reports a fault, that fault is merged
//!   into every resident event.
//! - **Beam trip**: two consecutive events carrying
//!   [`FaultFlags::BEAM_CURRENT`] start a holdoff. While the holdoff countdown is
//!   positive, every push merges [`FaultFlags::BEAM_TRIP`] into every resident
//!   event and decrements the countdown. The push that detects the trip is the
//!   first of the `holdoff` tainted pushes.
//!
//! # Cursors
//! ```text
//!  read_cursor          write_cursor
//!       v                    v
//! [  e3 | e4 | e5 | e6 | .. | e0 | e1 | e2 ]
//! ```
//! Both cursors advance by one slot per call and wrap at `N`. The `ready` latch
//! is set when the write cursor wraps to 0 and cleared when a pop reads slot
//! `N - 1`, so a reader can never overtake the writer before the next wrap.
//!
//! The ring is single-threaded: `push`, `pop` and `unwind` take `&mut self`.
//!
//! # Example
//! ```
//! use daq_event_ring::config::{RingConfig, RollingAverageConfig};
//! use daq_event_ring::data::event_ring::EventRing;
//! use daq_event_ring::data::pulse::PulseEvent;
//! use daq_event_ring::data::rolling_average::RollingAverage;
//!
//! let config = RingConfig { size: 4, ..Default::default() };
//! let prototype = PulseEvent::prototype(2);
//! let accumulator = RollingAverage::for_prototype(&prototype, RollingAverageConfig::default());
//! let mut ring = EventRing::new(&config, &prototype, accumulator).unwrap();
//!
//! for seq in 0..4 {
//!     ring.push(PulseEvent::new(seq, 50.0, [10.0, 12.0]));
//! }
//! assert!(ring.is_ready());
//! assert_eq!(ring.pop().unwrap().sequence, 0);
//! ```

use tracing::{debug, trace, warn};

use crate::config::RingConfig;
use crate::data::event::{RingEvent, RollingAccumulator};
use crate::data::fault::{FaultFlags, FaultSource};
use crate::data::ring_log::RingLog;
use crate::error::{RingError, RingResult};

/// Fault code that, on two consecutive events, starts a holdoff.
pub const TRIP_FAULT: FaultFlags = FaultFlags::BEAM_CURRENT;

/// Fault code merged into the whole ring during a holdoff.
pub const HOLDOFF_FAULT: FaultFlags = FaultFlags::BEAM_TRIP;

/// Fixed-capacity circular buffer of events.
///
/// Generic over the event type `E` and the rolling accumulator `A`.
#[derive(Debug)]
pub struct EventRing<E, A> {
    slots: Box<[E]>,
    accumulator: A,
    write_cursor: usize,
    read_cursor: usize,
    outstanding: usize,
    ready: bool,
    holdoff_countdown: u32,
    holdoff_length: u32,
    stability_enabled: bool,
    log: Option<RingLog>,
}

impl<E, A> EventRing<E, A>
where
    E: RingEvent,
    A: RollingAccumulator<E>,
{
    /// Create a ring of `config.size` slots, each a copy of `prototype`.
    ///
    /// # Errors
    /// `InvalidConfiguration` if the ring size is zero or the stability
    /// threshold is not finite.
    pub fn new(config: &RingConfig, prototype: &E, accumulator: A) -> RingResult<Self> {
        config.validate()?;

        let slots = vec![prototype.clone(); config.size].into_boxed_slice();
        debug!(
            size = config.size,
            holdoff = config.holdoff,
            stability = config.stability_enabled(),
            "Event ring created"
        );

        Ok(Self {
            slots,
            accumulator,
            write_cursor: 0,
            read_cursor: 0,
            outstanding: 0,
            ready: false,
            holdoff_countdown: 0,
            holdoff_length: config.holdoff,
            stability_enabled: config.stability_enabled(),
            log: None,
        })
    }

    /// Attach a diagnostic slot log.
    #[must_use]
    pub fn with_ring_log(mut self, log: RingLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Copy `event` into the next slot and run the stability/holdoff checks.
    pub fn push(&mut self, event: E) {
        let capacity = self.slots.len();
        let this_slot = self.write_cursor;
        let prev_slot = (this_slot + capacity - 1) % capacity;

        self.slots[this_slot] = event;
        if self.stability_enabled {
            self.accumulator.accumulate(&self.slots[this_slot]);
        }

        trace!(slot = this_slot, "Filled slot");
        if let Some(log) = self.log.as_mut() {
            log.filled(this_slot);
        }

        self.outstanding += 1;
        self.write_cursor = (this_slot + 1) % capacity;

        if self.write_cursor == 0 {
            trace!(slot = this_slot, "Ring filled");
            if let Some(log) = self.log.as_mut() {
                log.ring_filled();
            }
            self.ready = true;
        }

        if self.ready && self.stability_enabled {
            self.apply_stability_cut();
            self.apply_holdoff(this_slot, prev_slot);
        }
    }

    /// Remove and return the oldest unread event.
    ///
    /// # Errors
    /// `NotReady` if [`is_ready`](Self::is_ready) is false. The ring is left
    /// unchanged.
    pub fn pop(&mut self) -> RingResult<E> {
        if !self.ready {
            return Err(RingError::NotReady {
                read_cursor: self.read_cursor,
                outstanding: self.outstanding,
            });
        }

        if self.read_cursor == self.slots.len() - 1 {
            self.ready = false;
        }
        let index = self.advance_read();
        Ok(self.slots[index].clone())
    }

    /// Drain every outstanding event in FIFO order, ignoring the ready latch.
    ///
    /// Used at end of run. Returns at most `capacity` events; older events were
    /// already overwritten if the consumer fell that far behind.
    pub fn unwind(&mut self) -> Vec<E> {
        let count = self.outstanding.min(self.slots.len());
        debug!(count, read_cursor = self.read_cursor, "Unwinding event ring");

        let mut drained = Vec::with_capacity(count);
        for _ in 0..count {
            let index = self.advance_read();
            drained.push(self.slots[index].clone());
        }
        self.outstanding = 0;
        self.ready = false;

        if let Some(log) = self.log.as_mut() {
            log.flush();
        }
        drained
    }

    /// True once the ring has been filled a full cycle and may be popped.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Fixed number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Events pushed and not yet popped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outstanding
    }

    /// True if no event is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outstanding == 0
    }

    /// Pushes left in the current holdoff.
    #[must_use]
    pub fn holdoff_remaining(&self) -> u32 {
        self.holdoff_countdown
    }

    /// Whether the stability cut and trip detection run.
    #[must_use]
    pub fn is_stability_enabled(&self) -> bool {
        self.stability_enabled
    }

    /// Next slot to be filled.
    #[must_use]
    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Next slot to be read.
    #[must_use]
    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    /// Slot contents in index order (not FIFO order).
    #[must_use]
    pub fn slots(&self) -> impl Iterator<Item = &E> {
        self.slots.iter()
    }

    /// The rolling accumulator.
    #[must_use]
    pub fn accumulator(&self) -> &A {
        &self.accumulator
    }

    fn advance_read(&mut self) -> usize {
        let index = self.read_cursor;
        trace!(slot = index, "Read slot");
        if let Some(log) = self.log.as_mut() {
            log.read(index);
        }

        if self.stability_enabled {
            self.accumulator.deaccumulate(&self.slots[index]);
        }

        self.read_cursor = (index + 1) % self.slots.len();
        self.outstanding = self.outstanding.saturating_sub(1);
        index
    }

    fn apply_stability_cut(&mut self) {
        self.accumulator.recompute();
        self.accumulator.update_fault_flags();

        let global = self.accumulator.fault_flags();
        if global.is_empty() {
            return;
        }
        trace!(flags = ?global, "Stability cut failed, tainting window");
        for slot in self.slots.iter_mut() {
            slot.merge_faults_from(&self.accumulator);
            slot.refresh_fault_flags();
        }
    }

    fn apply_holdoff(&mut self, this_slot: usize, prev_slot: usize) {
        let tripped = self.slots[this_slot].fault_flags().contains(TRIP_FAULT)
            && self.slots[prev_slot].fault_flags().contains(TRIP_FAULT);
        if tripped {
            if self.holdoff_countdown == 0 {
                warn!(
                    slot = this_slot,
                    holdoff = self.holdoff_length,
                    "Beam trip detected, holding off"
                );
            }
            self.holdoff_countdown = self.holdoff_length;
        }

        if self.holdoff_countdown > 0 {
            for slot in self.slots.iter_mut() {
                slot.merge_fault_code(HOLDOFF_FAULT);
            }
            self.holdoff_countdown -= 1;
            if self.holdoff_countdown == 0 {
                debug!("Beam trip holdoff expired");
            }
        }
    }
}
