//! Data-quality fault codes carried by buffered events.
//!
//! Faults are data, not control flow: they are OR'd into records and travel
//! with them to the analysis stage, which decides what to exclude.

use bitflags::bitflags;

bitflags! {
    /// Bitmask of fault codes. An empty mask means the record is clean.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FaultFlags: u32 {
        /// Readout hardware reported an error for a reading.
        const HARDWARE = 1 << 0;
        /// A reading hit the ADC rail.
        const SATURATION = 1 << 1;
        /// A channel reading fell below its signal threshold.
        const LOW_SIGNAL = 1 << 2;
        /// Reference beam-current signal lost. Two in a row trip the holdoff.
        const BEAM_CURRENT = 1 << 8;
        /// The rolling statistic over the window failed its stability cut.
        const STABILITY_CUT = 1 << 16;
        /// Record was resident in the window during a beam-trip holdoff.
        const BEAM_TRIP = 1 << 17;
    }
}

impl FaultFlags {
    /// Flag names paired with their bit, in reporting order.
    pub const NAMED: [(&'static str, FaultFlags); 6] = [
        ("hardware", FaultFlags::HARDWARE),
        ("saturation", FaultFlags::SATURATION),
        ("low_signal", FaultFlags::LOW_SIGNAL),
        ("beam_current", FaultFlags::BEAM_CURRENT),
        ("stability_cut", FaultFlags::STABILITY_CUT),
        ("beam_trip", FaultFlags::BEAM_TRIP),
    ];
}

/// Anything that can report a fault mask.
///
/// Events implement this, and so does the rolling accumulator, whose mask is
/// merged into every resident event when the window fails its stability cut.
pub trait FaultSource {
    /// Current fault mask.
    fn fault_flags(&self) -> FaultFlags;
}

impl FaultSource for FaultFlags {
    fn fault_flags(&self) -> FaultFlags {
        *self
    }
}
