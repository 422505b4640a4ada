use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::live::WeightSnapshot;
use crate::model::RoadNetwork;
use crate::CostMs;

/// One computed route: a contiguous edge sequence plus the totals and
/// the per-edge congestion weights at snapshot time, so the caller can
/// explain "why this route" without re-querying the store.
#[derive(Debug, Clone)]
pub struct RoutePath {
    /// Edges in traversal order.
    pub edges: Vec<EdgeIndex>,
    /// Visited nodes, one more than `edges`; a trivial route holds just
    /// the origin.
    pub nodes: Vec<NodeIndex>,
    /// Total cost under the query's cost function.
    pub total_cost: CostMs,
    /// Live traversal time in milliseconds (weight-scaled), regardless
    /// of the optimization target.
    pub travel_time_ms: CostMs,
    /// Traversal time with every edge at free-flow, for delay reporting.
    pub free_flow_ms: CostMs,
    pub total_distance_m: f64,
    /// Snapshot weight of each edge, parallel to `edges`.
    pub edge_weights: Vec<f32>,
}

impl RoutePath {
    /// Fills in totals and the congestion breakdown for an edge sequence
    /// produced by the search.
    pub(crate) fn assemble(
        network: &RoadNetwork,
        snapshot: &WeightSnapshot,
        nodes: Vec<NodeIndex>,
        edges: Vec<EdgeIndex>,
        total_cost: CostMs,
    ) -> Self {
        let mut travel_time = 0.0f64;
        let mut free_flow = 0.0f64;
        let mut distance = 0.0f64;
        let mut edge_weights = Vec::with_capacity(edges.len());

        for &edge in &edges {
            let segment = network.segment(edge);
            let weight = snapshot.weight(segment.slot);
            travel_time += segment.free_flow_secs * 1_000.0 * f64::from(weight);
            free_flow += segment.free_flow_secs * 1_000.0;
            distance += segment.length_m;
            edge_weights.push(weight);
        }

        Self {
            edges,
            nodes,
            total_cost,
            travel_time_ms: travel_time.round() as CostMs,
            free_flow_ms: free_flow.round() as CostMs,
            total_distance_m: distance,
            edge_weights,
        }
    }

    /// Origin and destination coincide.
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }

    /// Cost-weighted mean congestion multiplier across the path; 1.0 for
    /// a trivial route.
    pub fn mean_weight(&self) -> f32 {
        if self.free_flow_ms == 0 {
            return 1.0;
        }
        self.travel_time_ms as f32 / self.free_flow_ms as f32
    }

    /// Extra travel time attributable to congestion, in seconds.
    pub fn delay_s(&self) -> f64 {
        f64::from(self.travel_time_ms.saturating_sub(self.free_flow_ms)) / 1_000.0
    }
}
