//! Convenience re-exports of the types most embedders need.
//!
//! ```no_run
//! use viaflow::prelude::*;
//! ```

pub use crate::config::{EngineConfig, IngestConfig};
pub use crate::error::Error;
pub use crate::ingest::{
    IngestPipeline, IngestStatsSnapshot, LineSource, PipelineHealth, TelemetrySource,
};
pub use crate::live::{LiveWeightStore, WeightSnapshot};
pub use crate::loading::{build_network, load_network};
pub use crate::model::{RoadNetwork, RoadNode, RoadSegment};
pub use crate::query::{
    CongestionLevel, QueryFailure, RoutePlan, RoutePlanner, RouteSummary, SegmentCondition,
};
pub use crate::routing::{OptimizeFor, RouteOptions};
