//! Criterion benchmarks for event ring hot paths.
//!
//! Every ready push re-evaluates the whole window, so push cost scales with
//! ring capacity. These benchmarks track that cost.
//!
//! Key metrics:
//! - Steady-state push/pop throughput for various ring sizes
//! - Push cost while a beam-trip holdoff is active
//! - Final unwind latency
//!
//! Run with: cargo bench --bench event_ring

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use daq_event_ring::config::{RingConfig, RollingAverageConfig};
use daq_event_ring::data::event_ring::EventRing;
use daq_event_ring::data::mock_source::{MockPulseSource, Trip};
use daq_event_ring::data::pulse::PulseEvent;
use daq_event_ring::data::rolling_average::RollingAverage;

const CHANNELS: usize = 4;

fn filled_ring(size: usize, stability_cut: f64) -> EventRing<PulseEvent, RollingAverage> {
    let config = RingConfig {
        size,
        stability_cut,
        ..Default::default()
    };
    let prototype = PulseEvent::prototype(CHANNELS);
    let accumulator = RollingAverage::for_prototype(&prototype, RollingAverageConfig::default());
    let mut ring = EventRing::new(&config, &prototype, accumulator).unwrap();
    for pulse in MockPulseSource::new(0, CHANNELS).take(size) {
        ring.push(pulse);
    }
    ring
}

/// Steady-state push followed by pop, as the analysis loop drives the ring.
fn event_ring_steady_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_ring_steady_state");

    let sizes = vec![64, 512, 4800];

    for size in sizes {
        let mut ring = filled_ring(size, 1.0);
        let pulses: Vec<_> = MockPulseSource::new(1, CHANNELS).take(1024).collect();
        let mut next = pulses.iter().cycle();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("push_pop", size), &size, |b, _| {
            b.iter(|| {
                if let Some(pulse) = next.next() {
                    ring.push(black_box(pulse.clone()));
                }
                if ring.is_ready() {
                    black_box(ring.pop().unwrap());
                }
            });
        });
    }

    group.finish();
}

/// Same loop with trip detection switched off, for comparison.
fn event_ring_stability_disabled(c: &mut Criterion) {
    let mut ring = filled_ring(4800, 0.0);
    let pulses: Vec<_> = MockPulseSource::new(2, CHANNELS).take(1024).collect();
    let mut next = pulses.iter().cycle();

    c.bench_function("event_ring_push_pop_no_stability", |b| {
        b.iter(|| {
            if let Some(pulse) = next.next() {
                ring.push(black_box(pulse.clone()));
            }
            if ring.is_ready() {
                black_box(ring.pop().unwrap());
            }
        });
    });
}

/// Push cost while the beam is off and the holdoff keeps re-arming.
fn event_ring_during_trip(c: &mut Criterion) {
    let mut ring = filled_ring(4800, 1.0);
    let pulses: Vec<_> = MockPulseSource::new(3, CHANNELS)
        .with_trip(Trip {
            start: 0,
            length: 1024,
        })
        .take(1024)
        .collect();
    let mut next = pulses.iter().cycle();

    c.bench_function("event_ring_push_pop_tripped", |b| {
        b.iter(|| {
            if let Some(pulse) = next.next() {
                ring.push(black_box(pulse.clone()));
            }
            if ring.is_ready() {
                black_box(ring.pop().unwrap());
            }
        });
    });
}

/// Unwind latency for a full ring.
fn event_ring_unwind(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_ring_unwind");

    for size in [64, 4800] {
        group.bench_with_input(BenchmarkId::new("unwind", size), &size, |b, &size| {
            b.iter_batched(
                || filled_ring(size, 1.0),
                |mut ring| black_box(ring.unwind()),
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    event_ring_steady_state,
    event_ring_stability_disabled,
    event_ring_during_trip,
    event_ring_unwind
);
criterion_main!(benches);
