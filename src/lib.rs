//! viaflow is a live-traffic routing core: it maintains a static road
//! network graph, folds streamed congestion telemetry into a per-edge
//! live weight store, and answers shortest-route queries against a
//! consistent point-in-time snapshot of those weights.
//!
//! The crate is transport-agnostic. Telemetry arrives through the
//! [`ingest::TelemetrySource`] seam and route queries go through
//! [`query::RoutePlanner`]; HTTP/WebSocket framing, persistence and map
//! rendering live outside this crate.

pub mod config;
pub mod error;
pub mod ingest;
pub mod live;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod query;
pub mod routing;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::Error;

/// Dense index of an edge's entry in the [`live::LiveWeightStore`].
/// Assigned sequentially at network load time.
pub type EdgeSlot = usize;

/// Edge traversal cost in milliseconds.
pub type CostMs = u32;

/// Upper bound on nearest-node candidates examined when snapping a
/// coordinate to the network.
pub const MAX_SNAP_CANDIDATES: usize = 5;
