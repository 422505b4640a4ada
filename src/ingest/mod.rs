//! Telemetry ingestion pipeline
//!
//! Consumes a stream of raw sensor readings, maps each to a graph edge,
//! and folds it into the live weight store. The upstream transport is
//! abstracted behind [`TelemetrySource`]; the pipeline owns validation,
//! the bounded newest-wins buffer, drop accounting, and reconnect with
//! exponential backoff.

mod buffer;
mod pipeline;
mod reading;
mod source;
mod stats;

pub use buffer::ReadingBuffer;
pub use pipeline::{IngestHandles, IngestPipeline, PipelineHealth};
pub use reading::{DropReason, RawReading};
pub use source::{LineSource, StaticSource, TelemetrySource};
pub use stats::{IngestStats, IngestStatsSnapshot};
