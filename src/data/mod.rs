//! Event buffering and the collaborators it runs against.
pub mod event;
pub mod event_ring;
pub mod fault;
pub mod mock_source;
pub mod pulse;
pub mod ring_log;
pub mod rolling_average;
