//! Fuzz target for EventRing push/pop/unwind sequences.
//!
//! Tests:
//! - Cursors stay inside the ring
//! - Outstanding count follows pushes, pops and unwinds
//! - A refused pop leaves the ring untouched
//! - Holdoff countdown never exceeds its configured length
//! - Unwind drains to an empty, unlatched ring

#![no_main]

use arbitrary::Arbitrary;
use daq_event_ring::config::{RingConfig, RollingAverageConfig};
use daq_event_ring::data::event_ring::EventRing;
use daq_event_ring::data::pulse::{PulseCuts, PulseEvent};
use daq_event_ring::data::rolling_average::RollingAverage;
use daq_event_ring::RingError;
use libfuzzer_sys::fuzz_target;

/// Fuzz input for ring operation sequences
#[derive(Debug, Arbitrary)]
struct RingInput {
    /// Ring capacity (kept small so wraps are frequent)
    size: u8,
    /// Holdoff length in pushes
    holdoff: u8,
    /// Whether trip detection is enabled
    stability: bool,
    operations: Vec<RingOp>,
}

#[derive(Debug, Clone, Arbitrary)]
enum RingOp {
    /// Push a pulse; `beam_off` makes it fail the beam-current cut
    Push { beam_off: bool, signal: u8 },
    /// Pop if allowed
    Pop,
    /// Drain everything
    Unwind,
}

fuzz_target!(|input: RingInput| {
    let size = (input.size as usize % 32) + 1;
    let holdoff = u32::from(input.holdoff);
    let config = RingConfig {
        size,
        holdoff,
        stability_cut: if input.stability { 1.0 } else { 0.0 },
        ..Default::default()
    };
    let prototype = PulseEvent::prototype(2);
    let accumulator = RollingAverage::for_prototype(&prototype, RollingAverageConfig::default());
    let mut ring = match EventRing::new(&config, &prototype, accumulator) {
        Ok(r) => r,
        Err(_) => return,
    };
    let cuts = PulseCuts::default();

    let mut sequence = 0u64;
    let mut expected_len = 0usize;

    for op in input.operations.iter().take(512) {
        match op {
            RingOp::Push { beam_off, signal } => {
                let beam = if *beam_off { 0.0 } else { 50.0 };
                let signal = f64::from(*signal);
                let mut pulse = PulseEvent::new(sequence, beam, [signal, signal + 1.0]);
                pulse.apply_cuts(&cuts);
                sequence += 1;
                ring.push(pulse);
                expected_len += 1;
            }
            RingOp::Pop => {
                let read_before = ring.read_cursor();
                let len_before = ring.len();
                match ring.pop() {
                    Ok(_) => expected_len = expected_len.saturating_sub(1),
                    Err(RingError::NotReady { .. }) => {
                        assert_eq!(ring.read_cursor(), read_before, "refused pop moved cursor");
                        assert_eq!(ring.len(), len_before, "refused pop changed count");
                    }
                    Err(e) => panic!("unexpected pop error: {e}"),
                }
            }
            RingOp::Unwind => {
                let drained = ring.unwind();
                assert!(drained.len() <= size, "unwind drained {} > {}", drained.len(), size);
                expected_len = 0;
                assert!(ring.is_empty(), "unwind left events behind");
                assert!(!ring.is_ready(), "unwind left ready latch set");
            }
        }

        assert!(ring.write_cursor() < size, "write cursor {} >= {}", ring.write_cursor(), size);
        assert!(ring.read_cursor() < size, "read cursor {} >= {}", ring.read_cursor(), size);
        assert_eq!(ring.len(), expected_len, "outstanding count drifted");
        assert!(ring.holdoff_remaining() <= holdoff);
        if !input.stability {
            assert_eq!(ring.holdoff_remaining(), 0);
        }
    }

    // Final drain always empties the ring
    ring.unwind();
    assert!(ring.is_empty());
});
