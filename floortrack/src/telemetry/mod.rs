//! Pipeline telemetry for observability and user feedback.
//!
//! Atomic counters record what the ingestion pipeline does; display
//! layers take a [`TelemetrySnapshot`] instead of reading live counters.
//!
//! ```text
//! Engine / Hub ─────► PipelineMetrics ─────► TelemetrySnapshot ─────► Views
//!                     (atomic counters)     (point-in-time copy)      (CLI)
//! ```

mod metrics;
mod snapshot;

pub use metrics::PipelineMetrics;
pub use snapshot::TelemetrySnapshot;
