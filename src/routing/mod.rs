//! Congestion-aware route search
//!
//! Priority-queue shortest-path search over edge costs drawn from a
//! [`crate::live::WeightSnapshot`], with deterministic tie-breaking, a
//! bounded search budget, and edge-penalization alternatives.

mod alternatives;
mod cost;
mod dijkstra;
mod path;

pub use alternatives::plan_alternatives;
pub use cost::{CostModel, OptimizeFor};
pub use dijkstra::{SearchBudget, shortest_path};
pub use path::RoutePath;

use serde::{Deserialize, Serialize};

/// Caller preferences for one route query. Each option changes only the
/// cost function or the result count, never the search algorithm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    pub optimize_for: OptimizeFor,
    pub avoid_major_roads: bool,
    pub alternatives: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            optimize_for: OptimizeFor::Time,
            avoid_major_roads: false,
            alternatives: false,
        }
    }
}
