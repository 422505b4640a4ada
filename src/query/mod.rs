//! Query coordination
//!
//! Translates external route requests (raw coordinates plus preferences)
//! into graph-level operations: nearest-node resolution, snapshot
//! acquisition, search, and response assembly. Also exposes the live
//! state export consumed by dashboards.

mod planner;
mod response;

pub use planner::{RoutePlanner, SegmentCondition};
pub use response::{
    CongestionLevel, QueryFailure, RouteLeg, RoutePlan, RouteSummary, TrafficConditions,
};
