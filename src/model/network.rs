//! Road network graph with spatial index for coordinate snapping.

use geo::{Distance, Haversine, Point};
use hashbrown::HashMap;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::MAX_SNAP_CANDIDATES;
use crate::model::{RoadNode, RoadSegment};

/// Entry stored in the R-tree spatial index: a node position in
/// `[lon, lat]` order with the associated graph index.
#[derive(Debug, Clone)]
pub struct IndexedPoint {
    pub point: [f64; 2],
    pub node: NodeIndex,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for IndexedPoint {
    // Squared Euclidean distance in degree space. Good enough to order
    // candidates; the caller re-ranks the few nearest by haversine.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Static road topology: a directed graph of [`RoadNode`]s and
/// [`RoadSegment`]s, an R-tree over node positions, and a lookup table
/// from external segment identifiers to graph edges.
///
/// Immutable after [`crate::loading::load_network`] returns; shared
/// across threads without locking.
#[derive(Debug)]
pub struct RoadNetwork {
    pub graph: DiGraph<RoadNode, RoadSegment>,
    rtree: RTree<IndexedPoint>,
    segment_lookup: HashMap<String, EdgeIndex>,
    max_speed_kmh: f64,
}

impl RoadNetwork {
    pub(crate) fn new(
        graph: DiGraph<RoadNode, RoadSegment>,
        rtree: RTree<IndexedPoint>,
        segment_lookup: HashMap<String, EdgeIndex>,
    ) -> Self {
        let max_speed_kmh = graph
            .edge_weights()
            .map(|segment| segment.speed_limit_kmh)
            .fold(0.0, f64::max);
        Self {
            graph,
            rtree,
            segment_lookup,
            max_speed_kmh,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn segment_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of live-weight slots; equals the segment count, since
    /// slots are assigned densely at load time.
    pub fn slot_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Fastest speed limit in the network, used as the admissible
    /// divisor for the straight-line search heuristic.
    pub fn max_speed_kmh(&self) -> f64 {
        self.max_speed_kmh
    }

    pub fn node(&self, index: NodeIndex) -> &RoadNode {
        &self.graph[index]
    }

    pub fn segment(&self, index: EdgeIndex) -> &RoadSegment {
        &self.graph[index]
    }

    /// Graph node nearest to `point`, with the haversine distance to it
    /// in meters. `None` only for an empty network.
    ///
    /// The R-tree orders candidates in degree space, which skews with
    /// latitude; the nearest few are re-ranked by true distance.
    pub fn nearest_node(&self, point: Point<f64>) -> Option<(NodeIndex, f64)> {
        self.rtree
            .nearest_neighbor_iter(&[point.x(), point.y()])
            .take(MAX_SNAP_CANDIDATES)
            .map(|entry| {
                let candidate = Point::new(entry.point[0], entry.point[1]);
                (entry.node, Haversine.distance(point, candidate))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Outgoing segments of `node` as `(edge, destination)` pairs, in a
    /// deterministic order fixed at load time.
    pub fn neighbors(
        &self,
        node: NodeIndex,
    ) -> impl Iterator<Item = (EdgeIndex, NodeIndex)> + '_ {
        self.graph.edges(node).map(|edge| (edge.id(), edge.target()))
    }

    /// Map an external segment identifier to its graph edge. Unknown
    /// identifiers are an expected outcome during ingestion.
    pub fn resolve_segment(&self, segment_id: &str) -> Option<EdgeIndex> {
        self.segment_lookup.get(segment_id).copied()
    }

    /// Straight-line distance between two graph nodes in meters.
    pub fn node_distance_m(&self, a: NodeIndex, b: NodeIndex) -> f64 {
        Haversine.distance(self.graph[a].geometry, self.graph[b].geometry)
    }
}

#[cfg(test)]
mod tests {
    use geo::Point;

    use crate::testutil::triangle_network;

    #[test]
    fn nearest_node_snaps_to_closest() {
        let network = triangle_network();
        // Just north-east of node A at the origin.
        let (node, distance_m) = network
            .nearest_node(Point::new(0.0001, 0.0001))
            .expect("non-empty network");
        assert_eq!(network.node(node).id, "A");
        assert!(distance_m < 50.0, "snapped {distance_m} m away");
    }

    #[test]
    fn neighbors_are_deterministic() {
        let network = triangle_network();
        let origin = network.nearest_node(Point::new(0.0, 0.0)).unwrap().0;
        let first: Vec<_> = network.neighbors(origin).collect();
        let second: Vec<_> = network.neighbors(origin).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2); // A->B direct and A->C
    }

    #[test]
    fn resolve_segment_finds_known_ids() {
        let network = triangle_network();
        assert!(network.resolve_segment("seg-ab").is_some());
        assert!(network.resolve_segment("seg-zz").is_none());
    }
}
