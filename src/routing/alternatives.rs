//! k-shortest-paths-lite via edge penalization.

use fixedbitset::FixedBitSet;
use log::debug;
use petgraph::graph::NodeIndex;

use crate::config::EngineConfig;
use crate::live::WeightSnapshot;
use crate::model::RoadNetwork;
use crate::routing::{CostModel, RouteOptions, RoutePath, SearchBudget, shortest_path};
use crate::Error;

/// Computes the best path and up to `max_alternatives - 1` meaningfully
/// different ones: each round multiplies the cost of every edge already
/// used by the penalty factor and re-runs the search, stopping early
/// when the search starts returning repeats or runs out of budget;
/// alternatives are best-effort once a primary route exists.
///
/// # Errors
///
/// Propagates the primary search's error; alternative rounds never fail
/// the call.
pub fn plan_alternatives(
    network: &RoadNetwork,
    snapshot: &WeightSnapshot,
    options: &RouteOptions,
    config: &EngineConfig,
    start: NodeIndex,
    goal: NodeIndex,
    budget: &SearchBudget,
) -> Result<Vec<RoutePath>, Error> {
    let base = CostModel::new(
        network,
        snapshot,
        options.optimize_for,
        options.avoid_major_roads,
        config.penalty_factor,
    );
    let primary = shortest_path(&base, start, goal, budget)?;

    let target = if options.alternatives {
        config.max_alternatives
    } else {
        1
    };
    let mut routes = vec![primary];
    let mut penalized = FixedBitSet::with_capacity(network.segment_count());

    while routes.len() < target {
        for edge in &routes[routes.len() - 1].edges {
            penalized.insert(edge.index());
        }
        let model = CostModel::new(
            network,
            snapshot,
            options.optimize_for,
            options.avoid_major_roads,
            config.penalty_factor,
        )
        .with_penalties(&penalized);

        match shortest_path(&model, start, goal, budget) {
            Ok(candidate) => {
                if routes.iter().any(|route| route.edges == candidate.edges) {
                    break; // penalization stopped producing new paths
                }
                routes.push(candidate);
            }
            Err(Error::NoRouteFound) | Err(Error::SearchTimeout) => {
                debug!("alternative search ended after {} route(s)", routes.len());
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(routes)
}
