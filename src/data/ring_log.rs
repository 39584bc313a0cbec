//! Best-effort plain-text log of ring slot activity.
//!
//! Mirrors the slot indices touched by every push and pop. Write failures are
//! reported once and then the sink goes quiet; they never reach the ring.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::warn;

use crate::error::RingResult;

/// Diagnostic slot log attached to an [`EventRing`](crate::data::event_ring::EventRing).
pub struct RingLog {
    sink: Option<Box<dyn Write + Send>>,
}

impl RingLog {
    /// Log into an arbitrary writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { sink: Some(writer) }
    }

    /// Create (truncate) a log file at `path`.
    pub fn create(path: &Path) -> RingResult<Self> {
        let file = File::create(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    /// False once a write has failed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.sink.is_some()
    }

    pub(crate) fn filled(&mut self, slot: usize) {
        self.write(format_args!(" Filled at {} ", slot));
    }

    pub(crate) fn ring_filled(&mut self) {
        self.write(format_args!(" RING FILLED "));
    }

    pub(crate) fn read(&mut self, slot: usize) {
        self.write(format_args!(" Read at {} \n", slot));
    }

    /// Flush buffered output.
    pub fn flush(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.flush() {
                warn!(error = %e, "Ring log flush failed, disabling ring log");
                self.sink = None;
            }
        }
    }

    fn write(&mut self, args: std::fmt::Arguments<'_>) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.write_fmt(args) {
                warn!(error = %e, "Ring log write failed, disabling ring log");
                self.sink = None;
            }
        }
    }
}

impl Drop for RingLog {
    fn drop(&mut self) {
        self.flush();
    }
}

impl std::fmt::Debug for RingLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingLog")
            .field("active", &self.is_active())
            .finish()
    }
}
