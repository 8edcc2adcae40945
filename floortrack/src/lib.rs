//! FloorTrack - real-time indoor positioning and geofencing
//!
//! This library ingests location updates for tracked entities, maps them
//! onto a local floor-plan coordinate frame, and raises events when
//! entities cross geofence boundaries.
//!
//! # Architecture
//!
//! ```text
//! update ──► engine ──► location (normalize) ──► registry (upsert + propagation)
//!                │                                        │
//!                ├──► fence (containment) ──► transition (diff + event log)
//!                └──► hub (fan-out to subscribers)
//! ```
//!
//! The [`engine`] module wires the pipeline together; everything below it
//! is usable on its own. Transport (REST routing, WebSocket endpoints)
//! and rendering are collaborator concerns outside this crate:
//! subscribers attach through [`hub::LocationHub`] channels and ingestion
//! callers feed [`engine::LocationUpdate`] values into the engine queue.

pub mod config;
pub mod coord;
pub mod engine;
pub mod fence;
pub mod hub;
pub mod location;
pub mod log;
pub mod registry;
pub mod telemetry;
pub mod transition;

/// Crate version, for banners and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
