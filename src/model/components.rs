//! Road network components - nodes and directed segments

use geo::{LineString, Point};

use crate::{CostMs, EdgeSlot};

/// Road graph node (intersection or segment endpoint)
#[derive(Debug, Clone)]
pub struct RoadNode {
    /// Stable external identifier from the network source
    pub id: String,
    /// Node coordinates
    pub geometry: Point<f64>,
}

/// Road graph edge (directed road segment)
#[derive(Debug, Clone)]
pub struct RoadSegment {
    /// Stable external identifier; telemetry readings reference it
    pub id: String,
    /// Segment length in meters
    pub length_m: f64,
    /// Legal/free-flow speed in km/h
    pub speed_limit_kmh: f64,
    /// Traversal time at free-flow speed, in seconds
    pub free_flow_secs: f64,
    /// Polyline for rendering; opaque to routing
    pub geometry: LineString<f64>,
    /// Slot of this segment's entry in the live weight store
    pub slot: EdgeSlot,
}

impl RoadSegment {
    /// Free-flow traversal cost in integer milliseconds, the unit the
    /// search engine works in.
    pub fn free_flow_ms(&self) -> CostMs {
        (self.free_flow_secs * 1_000.0).round() as CostMs
    }
}
