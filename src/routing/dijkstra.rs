use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use hashbrown::HashMap;
use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::config::EngineConfig;
use crate::routing::{CostModel, RoutePath};
use crate::{CostMs, Error};

/// Abort bounds for one search invocation. Adversarial queries (e.g.
/// across disconnected regions) would otherwise expand the whole graph.
#[derive(Debug, Clone, Copy)]
pub struct SearchBudget {
    pub deadline: Instant,
    pub max_settled: usize,
}

impl SearchBudget {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            deadline: Instant::now() + config.search_deadline,
            max_settled: config.max_settled_nodes,
        }
    }
}

/// Best-known rank of a node: (cost, hops, distance in dm). Lexicographic
/// comparison encodes the tie-break policy: equal-cost paths prefer fewer
/// edges, then lower distance.
type Rank = (CostMs, u32, u64);

#[derive(Copy, Clone, Eq, PartialEq)]
struct State {
    /// Cost so far plus the admissible remaining-cost bound.
    estimate: CostMs,
    cost: CostMs,
    hops: u32,
    dist_dm: u64,
    node: NodeIndex,
}

// Min-heap ordering (reversed from standard Rust BinaryHeap). The node
// index as the last key makes the expansion order fully deterministic.
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.estimate, other.hops, other.dist_dm, other.node.index()).cmp(&(
            self.estimate,
            self.hops,
            self.dist_dm,
            self.node.index(),
        ))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// How many heap pops between wall-clock deadline checks.
const DEADLINE_CHECK_INTERVAL: usize = 64;

/// A* search over snapshot costs (plain Dijkstra when the heuristic is
/// zero, as on a one-node network). All costs are non-negative by
/// clamping, so the shortest-path invariant holds.
///
/// # Errors
///
/// [`Error::NoRouteFound`] when the goal is unreachable, which is a
/// normal reportable outcome. [`Error::SearchTimeout`] when the budget
/// runs out.
pub fn shortest_path(
    cost_model: &CostModel,
    start: NodeIndex,
    goal: NodeIndex,
    budget: &SearchBudget,
) -> Result<RoutePath, Error> {
    let network = cost_model.network();
    let snapshot = cost_model.snapshot();

    if start == goal {
        return Ok(RoutePath::assemble(
            network,
            snapshot,
            vec![start],
            Vec::new(),
            0,
        ));
    }

    let estimated = (network.node_count() / 2).clamp(16, 4_096);
    let mut best: HashMap<NodeIndex, Rank> = HashMap::with_capacity(estimated);
    let mut predecessors: HashMap<NodeIndex, (NodeIndex, EdgeIndex)> =
        HashMap::with_capacity(estimated);
    let mut heap = BinaryHeap::with_capacity(estimated / 4);
    let mut settled = 0usize;

    best.insert(start, (0, 0, 0));
    heap.push(State {
        estimate: cost_model.heuristic(start, goal),
        cost: 0,
        hops: 0,
        dist_dm: 0,
        node: start,
    });

    while let Some(State {
        cost,
        hops,
        dist_dm,
        node,
        ..
    }) = heap.pop()
    {
        // Skip entries obsoleted by a later, better relaxation.
        if let Some(&rank) = best.get(&node)
            && (cost, hops, dist_dm) > rank
        {
            continue;
        }

        if node == goal {
            let (nodes, edges) = reconstruct(&predecessors, start, goal);
            return Ok(RoutePath::assemble(network, snapshot, nodes, edges, cost));
        }

        settled += 1;
        if settled > budget.max_settled
            || (settled % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() > budget.deadline)
        {
            return Err(Error::SearchTimeout);
        }

        for (edge, next) in network.neighbors(node) {
            let segment = network.segment(edge);
            let next_cost = cost.saturating_add(cost_model.edge_cost(edge));
            let next_rank: Rank = (
                next_cost,
                hops + 1,
                dist_dm + (segment.length_m * 10.0).round() as u64,
            );

            let improved = match best.get(&next) {
                None => true,
                Some(&rank) => next_rank < rank,
            };
            if improved {
                best.insert(next, next_rank);
                predecessors.insert(next, (node, edge));
                heap.push(State {
                    estimate: next_cost.saturating_add(cost_model.heuristic(next, goal)),
                    cost: next_cost,
                    hops: next_rank.1,
                    dist_dm: next_rank.2,
                    node: next,
                });
            }
        }
    }

    Err(Error::NoRouteFound)
}

fn reconstruct(
    predecessors: &HashMap<NodeIndex, (NodeIndex, EdgeIndex)>,
    start: NodeIndex,
    goal: NodeIndex,
) -> (Vec<NodeIndex>, Vec<EdgeIndex>) {
    let mut nodes = vec![goal];
    let mut edges = Vec::new();
    let mut current = goal;
    while current != start {
        let (prev, edge) = predecessors[&current];
        edges.push(edge);
        nodes.push(prev);
        current = prev;
    }
    nodes.reverse();
    edges.reverse();
    (nodes, edges)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use chrono::Utc;
    use geo::Point;

    use super::*;
    use crate::config::EngineConfig;
    use crate::live::LiveWeightStore;
    use crate::routing::OptimizeFor;
    use crate::testutil::{disconnected_network, triangle_network};

    fn generous_budget() -> SearchBudget {
        SearchBudget {
            deadline: Instant::now() + Duration::from_secs(10),
            max_settled: 1_000_000,
        }
    }

    fn node(network: &crate::model::RoadNetwork, lon: f64, lat: f64) -> NodeIndex {
        network.nearest_node(Point::new(lon, lat)).unwrap().0
    }

    #[test]
    fn free_flow_prefers_the_faster_detour() {
        let network = triangle_network();
        let store = LiveWeightStore::for_network(&network, &EngineConfig::default()).unwrap();
        let snapshot = store.snapshot(Utc::now());
        let model = CostModel::new(&network, &snapshot, OptimizeFor::Time, false, 1.5);

        let a = node(&network, 0.0, 0.0);
        let b = node(&network, 0.0015, 0.0);
        let path = shortest_path(&model, a, b, &generous_budget()).unwrap();

        // Via C: 4 s + 4 s beats the direct 10 s.
        assert_eq!(path.total_cost, 8_000);
        assert_eq!(path.edges.len(), 2);
        assert_eq!(path.nodes.len(), 3);
        assert_eq!(network.segment(path.edges[0]).id, "seg-ac");
        assert_eq!(network.segment(path.edges[1]).id, "seg-cb");
    }

    #[test]
    fn congestion_flips_the_choice_back() {
        let network = triangle_network();
        let store = LiveWeightStore::for_network(&network, &EngineConfig::default()).unwrap();
        let now = Utc::now();
        // Congest the via-C branch heavily; the direct edge stays clean.
        for segment_id in ["seg-ac", "seg-cb"] {
            let edge = network.resolve_segment(segment_id).unwrap();
            store.apply_sample(network.segment(edge).slot, 4.0, now);
        }
        let snapshot = store.snapshot(now);
        let model = CostModel::new(&network, &snapshot, OptimizeFor::Time, false, 1.5);

        let a = node(&network, 0.0, 0.0);
        let b = node(&network, 0.0015, 0.0);
        let path = shortest_path(&model, a, b, &generous_budget()).unwrap();

        // Via C now costs 2 * 4 s * 4.0 = 32 s; direct wins at 10 s.
        assert_eq!(path.edges.len(), 1);
        assert_eq!(network.segment(path.edges[0]).id, "seg-ab");
        assert_eq!(path.total_cost, 10_000);
        assert_eq!(path.edge_weights, vec![1.0]);
    }

    #[test]
    fn distance_mode_prefers_the_shorter_path() {
        let network = triangle_network();
        let store = LiveWeightStore::for_network(&network, &EngineConfig::default()).unwrap();
        let snapshot = store.snapshot(Utc::now());
        let model = CostModel::new(&network, &snapshot, OptimizeFor::Distance, false, 1.5);

        let a = node(&network, 0.0, 0.0);
        let b = node(&network, 0.0015, 0.0);
        let path = shortest_path(&model, a, b, &generous_budget()).unwrap();

        // 166.7 m direct vs 222.2 m via C.
        assert_eq!(path.edges.len(), 1);
        assert_eq!(network.segment(path.edges[0]).id, "seg-ab");
    }

    #[test]
    fn unreachable_goal_reports_no_route() {
        let network = disconnected_network();
        let store = LiveWeightStore::for_network(&network, &EngineConfig::default()).unwrap();
        let snapshot = store.snapshot(Utc::now());
        let model = CostModel::new(&network, &snapshot, OptimizeFor::Time, false, 1.5);

        let a = node(&network, 0.0, 0.0);
        let y = node(&network, 1.0015, 1.0);
        let err = shortest_path(&model, a, y, &generous_budget()).unwrap_err();
        assert!(matches!(err, Error::NoRouteFound));
    }

    #[test]
    fn exhausted_node_budget_times_out() {
        let network = triangle_network();
        let store = LiveWeightStore::for_network(&network, &EngineConfig::default()).unwrap();
        let snapshot = store.snapshot(Utc::now());
        let model = CostModel::new(&network, &snapshot, OptimizeFor::Time, false, 1.5);

        let a = node(&network, 0.0, 0.0);
        let b = node(&network, 0.0015, 0.0);
        let budget = SearchBudget {
            deadline: Instant::now() + Duration::from_secs(10),
            max_settled: 0,
        };
        let err = shortest_path(&model, a, b, &budget).unwrap_err();
        assert!(matches!(err, Error::SearchTimeout));
    }

    #[test]
    fn trivial_route_for_identical_endpoints() {
        let network = triangle_network();
        let store = LiveWeightStore::for_network(&network, &EngineConfig::default()).unwrap();
        let snapshot = store.snapshot(Utc::now());
        let model = CostModel::new(&network, &snapshot, OptimizeFor::Time, false, 1.5);

        let a = node(&network, 0.0, 0.0);
        let path = shortest_path(&model, a, a, &generous_budget()).unwrap();
        assert!(path.is_trivial());
        assert_eq!(path.total_cost, 0);
        assert_eq!(path.nodes, vec![a]);
    }

    #[test]
    fn equal_cost_tie_breaks_on_fewer_edges() {
        // Direct A->B and A->C->B both cost exactly 10 s at free flow.
        let nodes = "node_id,lat,lon\n\
            A,0.0,0.0\n\
            B,0.0,0.0015\n\
            C,0.0,0.00075\n";
        let segments = "segment_id,from_node,to_node,length_m,speed_limit_kmh\n\
            direct,A,B,166.6667,60\n\
            hop1,A,C,83.33335,60\n\
            hop2,C,B,83.33335,60\n";
        let network =
            crate::loading::build_network(nodes.as_bytes(), segments.as_bytes()).unwrap();
        let store = LiveWeightStore::for_network(&network, &EngineConfig::default()).unwrap();
        let snapshot = store.snapshot(Utc::now());
        let model = CostModel::new(&network, &snapshot, OptimizeFor::Time, false, 1.5);

        let a = node(&network, 0.0, 0.0);
        let b = node(&network, 0.0015, 0.0);
        let path = shortest_path(&model, a, b, &generous_budget()).unwrap();
        assert_eq!(path.total_cost, 10_000);
        assert_eq!(path.edges.len(), 1, "fewer edges must win the tie");
        assert_eq!(network.segment(path.edges[0]).id, "direct");
    }

    #[test]
    fn repeated_searches_are_identical() {
        let network = triangle_network();
        let store = LiveWeightStore::for_network(&network, &EngineConfig::default()).unwrap();
        let snapshot = store.snapshot(Utc::now());
        let model = CostModel::new(&network, &snapshot, OptimizeFor::Time, false, 1.5);

        let a = node(&network, 0.0, 0.0);
        let b = node(&network, 0.0015, 0.0);
        let first = shortest_path(&model, a, b, &generous_budget()).unwrap();
        let second = shortest_path(&model, a, b, &generous_budget()).unwrap();
        assert_eq!(first.edges, second.edges);
        assert_eq!(first.total_cost, second.total_cost);
    }
}
