//! # DAQ Event Ring
//!
//! A fixed-capacity sliding window between the per-pulse detector readout and
//! the analysis stage. The ring keeps the most recent `N` records, maintains a
//! rolling statistic over them, and retroactively marks the whole window as
//! unusable when the beam trips or the rolling statistic fails its stability
//! cut.
//!
//! ## Crate Structure
//!
//! - **`data`**: the [`EventRing`](data::event_ring::EventRing) itself, the
//!   collaborator traits it is generic over, the fault codes, and the concrete
//!   pulse record, rolling average and mock pulse source.
//! - **`config`**: strongly-typed settings loaded from TOML and environment
//!   variables with `figment`.
//! - **`error`**: the `RingError` enum.
//! - **`run`**: the push/pop driver used by the binary, with its run report.
//! - **`tracing_setup`**: `tracing-subscriber` initialisation for binaries.

pub mod config;
pub mod data;
pub mod error;
pub mod run;
pub mod tracing_setup;

pub use data::event::{RingEvent, RollingAccumulator};
pub use data::event_ring::EventRing;
pub use data::fault::{FaultFlags, FaultSource};
pub use error::{RingError, RingResult};
