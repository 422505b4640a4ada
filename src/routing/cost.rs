//! Edge cost function fed to the search.

use fixedbitset::FixedBitSet;
use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::live::WeightSnapshot;
use crate::model::RoadNetwork;
use crate::CostMs;

/// Speed limit from which a segment counts as a major road for the
/// `avoid_major_roads` option.
const MAJOR_ROAD_KMH: f64 = 90.0;
/// Cost multiplier applied to major roads when avoiding them.
const MAJOR_ROAD_PENALTY: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeFor {
    /// Live traversal time: free-flow cost scaled by the snapshot weight.
    Time,
    /// Congestion-free physical length.
    Distance,
}

/// Maps a graph edge to its search cost under one snapshot and one set
/// of query options. Costs are integer and non-negative by construction,
/// so Dijkstra's correctness invariant holds.
///
/// Time costs are milliseconds; distance costs are decimeters. Both fit
/// the same [`CostMs`] lattice, and the heuristic stays admissible in
/// either unit because penalties only ever increase costs.
pub struct CostModel<'a> {
    network: &'a RoadNetwork,
    snapshot: &'a WeightSnapshot,
    optimize_for: OptimizeFor,
    avoid_major_roads: bool,
    penalty_factor: f64,
    penalized: Option<&'a FixedBitSet>,
    /// Heuristic scale: cost units per meter of straight-line distance.
    heuristic_per_m: f64,
}

impl<'a> CostModel<'a> {
    pub fn new(
        network: &'a RoadNetwork,
        snapshot: &'a WeightSnapshot,
        optimize_for: OptimizeFor,
        avoid_major_roads: bool,
        penalty_factor: f32,
    ) -> Self {
        let heuristic_per_m = match optimize_for {
            // ms per meter at the fastest speed limit in the network.
            OptimizeFor::Time => 3_600.0 / network.max_speed_kmh().max(1.0),
            // decimeters per meter.
            OptimizeFor::Distance => 10.0,
        };
        Self {
            network,
            snapshot,
            optimize_for,
            avoid_major_roads,
            penalty_factor: f64::from(penalty_factor),
            penalized: None,
            heuristic_per_m,
        }
    }

    /// Overlay of already-used edges whose cost gets multiplied by the
    /// penalty factor; drives the alternatives search.
    pub fn with_penalties(mut self, penalized: &'a FixedBitSet) -> Self {
        self.penalized = Some(penalized);
        self
    }

    pub fn edge_cost(&self, edge: EdgeIndex) -> CostMs {
        let segment = self.network.segment(edge);
        let mut cost = match self.optimize_for {
            OptimizeFor::Time => {
                segment.free_flow_secs * 1_000.0 * f64::from(self.snapshot.weight(segment.slot))
            }
            OptimizeFor::Distance => segment.length_m * 10.0,
        };
        if self.avoid_major_roads && segment.speed_limit_kmh >= MAJOR_ROAD_KMH {
            cost *= MAJOR_ROAD_PENALTY;
        }
        if let Some(penalized) = self.penalized
            && penalized.contains(edge.index())
        {
            cost *= self.penalty_factor;
        }
        cost.round().clamp(0.0, f64::from(CostMs::MAX)) as CostMs
    }

    /// Admissible lower bound on the remaining cost from `node` to
    /// `goal`: straight-line distance at the best speed the network
    /// allows anywhere. Zero-heuristic callers get plain Dijkstra.
    pub fn heuristic(&self, node: NodeIndex, goal: NodeIndex) -> CostMs {
        let meters = self.network.node_distance_m(node, goal);
        (meters * self.heuristic_per_m)
            .floor()
            .clamp(0.0, f64::from(CostMs::MAX)) as CostMs
    }

    pub fn network(&self) -> &'a RoadNetwork {
        self.network
    }

    pub fn snapshot(&self) -> &'a WeightSnapshot {
        self.snapshot
    }
}
