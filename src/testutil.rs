//! Hand-built miniature networks shared by unit tests.

use crate::loading::build_network;
use crate::model::RoadNetwork;

/// Three nodes, two competing paths from A to B:
///
/// - `seg-ab`: direct, 60 km/h, free-flow 10 s
/// - `seg-ac` + `seg-cb`: via C, 100 km/h, free-flow 4 s + 4 s
///
/// At free-flow the via-C path (8 s) beats the direct one (10 s).
/// Coordinates are consistent with the stated lengths, keeping the
/// straight-line heuristic admissible.
pub(crate) fn triangle_network() -> RoadNetwork {
    let nodes = "node_id,lat,lon\n\
        A,0.0,0.0\n\
        B,0.0,0.0015\n\
        C,0.00066,0.00075\n";
    let segments = "segment_id,from_node,to_node,length_m,speed_limit_kmh\n\
        seg-ab,A,B,166.6667,60\n\
        seg-ac,A,C,111.1111,100\n\
        seg-cb,C,B,111.1111,100\n";
    build_network(nodes.as_bytes(), segments.as_bytes()).unwrap()
}

/// Two island pairs with no connection between them: A->B and X->Y.
pub(crate) fn disconnected_network() -> RoadNetwork {
    let nodes = "node_id,lat,lon\n\
        A,0.0,0.0\n\
        B,0.0,0.0015\n\
        X,1.0,1.0\n\
        Y,1.0,1.0015\n";
    let segments = "segment_id,from_node,to_node,length_m,speed_limit_kmh\n\
        seg-ab,A,B,166.6667,60\n\
        seg-xy,X,Y,166.6667,60\n";
    build_network(nodes.as_bytes(), segments.as_bytes()).unwrap()
}
