//! Error types for the event ring.
//!
//! Data-quality problems (beam trips, stability-cut failures) are never errors
//! here: they travel with the records as [`FaultFlags`](crate::data::fault::FaultFlags).
//! `RingError` covers the remaining failure modes:
//!
//! - **`NotReady`**: `pop()` was called while the ready latch was clear. This is
//!   a caller contract violation; the ring state is left untouched.
//! - **`InvalidConfiguration`**: semantic errors that pass parsing but are
//!   logically wrong (zero ring size, non-finite thresholds, ...).
//! - **`Config`**: wraps errors from `figment` while loading TOML or
//!   environment sources.
//! - **`Io`**: wraps `std::io::Error`, e.g. when opening the ring log file.

use thiserror::Error;

/// Convenience alias for results using the ring error type.
pub type RingResult<T> = std::result::Result<T, RingError>;

/// Errors reported by the event ring and its configuration layer.
#[derive(Error, Debug)]
pub enum RingError {
    /// `pop()` called before the ring was ready.
    #[error("Event ring is not ready to pop (read cursor {read_cursor}, {outstanding} outstanding)")]
    NotReady {
        /// Slot the pop would have read.
        read_cursor: usize,
        /// Records pushed but not yet popped.
        outstanding: usize,
    },

    /// Semantically invalid configuration.
    #[error("Configuration validation error: {0}")]
    InvalidConfiguration(String),

    /// Configuration source could not be parsed or extracted.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for RingError {
    fn from(value: figment::Error) -> Self {
        RingError::Config(Box::new(value))
    }
}
