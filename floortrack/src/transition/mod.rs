//! Fence transition detection and the event log.
//!
//! [`TransitionTracker`] diffs containment sets per entity and
//! [`EventLog`] retains the resulting entry/exit events in a capped,
//! newest-first ring buffer.

mod event_log;
mod tracker;

pub use event_log::{EventLog, FenceEvent, FenceEventKind, DEFAULT_EVENT_LOG_CAPACITY};
pub use tracker::{FenceTransition, TransitionTracker};
