use std::fs::File;
use std::io::Read;
use std::path::Path;

use geo::{Coord, LineString, Point};
use hashbrown::HashMap;
use log::{info, warn};
use petgraph::graph::{DiGraph, NodeIndex};
use rstar::RTree;

use super::parser::{deserialize_csv, parse_f64};
use super::raw_types::{RawNode, RawSegment};
use crate::model::{IndexedPoint, RoadNetwork, RoadNode, RoadSegment};
use crate::{CostMs, Error};

const KMH_TO_MS: f64 = 1.0 / 3.6;

/// Loads the road network from a directory containing `nodes.csv`
/// (`node_id,lat,lon`) and `segments.csv`
/// (`segment_id,from_node,to_node,length_m,speed_limit_kmh[,geometry]`).
///
/// # Errors
///
/// Returns an error on missing files or malformed topology (dangling
/// endpoints, duplicate identifiers, conflicting duplicate segments,
/// out-of-range values). Load errors are fatal: the process must not
/// start routing on a partial network.
pub fn load_network(dir: &Path) -> Result<RoadNetwork, Error> {
    let nodes_path = dir.join("nodes.csv");
    let segments_path = dir.join("segments.csv");
    for path in [&nodes_path, &segments_path] {
        if !path.exists() {
            return Err(Error::InvalidData(format!(
                "network source file not found: {}",
                path.display()
            )));
        }
    }

    info!("Loading road network from {}", dir.display());
    build_network(File::open(nodes_path)?, File::open(segments_path)?)
}

/// Builds the network model from already-open CSV sources. Split out of
/// [`load_network`] so tests and embedders can feed in-memory tables.
pub fn build_network<N: Read, S: Read>(nodes: N, segments: S) -> Result<RoadNetwork, Error> {
    let raw_nodes: Vec<RawNode> = deserialize_csv(nodes, "nodes.csv")?;
    let raw_segments: Vec<RawSegment> = deserialize_csv(segments, "segments.csv")?;

    let mut graph = DiGraph::with_capacity(raw_nodes.len(), raw_segments.len());
    let mut node_index: HashMap<String, NodeIndex> = HashMap::with_capacity(raw_nodes.len());

    for raw in &raw_nodes {
        if raw.node_id.is_empty() {
            return Err(Error::InvalidData("node with empty node_id".into()));
        }
        let lat = parse_f64(&raw.lat, "lat", &raw.node_id)?;
        let lon = parse_f64(&raw.lon, "lon", &raw.node_id)?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::InvalidData(format!(
                "node {}: coordinate ({lat}, {lon}) out of range",
                raw.node_id
            )));
        }
        let index = graph.add_node(RoadNode {
            id: raw.node_id.clone(),
            geometry: Point::new(lon, lat),
        });
        if node_index.insert(raw.node_id.clone(), index).is_some() {
            return Err(Error::InvalidData(format!(
                "duplicate node id: {}",
                raw.node_id
            )));
        }
    }

    let mut segment_lookup: HashMap<String, petgraph::graph::EdgeIndex> =
        HashMap::with_capacity(raw_segments.len());
    // (from, to) -> free-flow cost, to reject conflicting duplicates.
    let mut seen_pairs: HashMap<(NodeIndex, NodeIndex), CostMs> = HashMap::new();
    let mut skipped_duplicates = 0usize;

    for raw in &raw_segments {
        let segment = parse_segment(raw, &graph, &node_index)?;
        let from = node_index[&raw.from_node];
        let to = node_index[&raw.to_node];

        if let Some(&existing_ms) = seen_pairs.get(&(from, to)) {
            if existing_ms != segment.free_flow_ms() {
                return Err(Error::InvalidData(format!(
                    "segments {} -> {} duplicated with conflicting free-flow cost",
                    raw.from_node, raw.to_node
                )));
            }
            warn!(
                "segment {}: duplicate of an identical {} -> {} segment, skipping",
                raw.segment_id, raw.from_node, raw.to_node
            );
            skipped_duplicates += 1;
            continue;
        }
        seen_pairs.insert((from, to), segment.free_flow_ms());

        let mut segment = segment;
        segment.slot = graph.edge_count();
        let segment_id = segment.id.clone();
        let edge = graph.add_edge(from, to, segment);
        if segment_lookup.insert(segment_id, edge).is_some() {
            return Err(Error::InvalidData(format!(
                "duplicate segment id: {}",
                raw.segment_id
            )));
        }
    }

    let entries: Vec<IndexedPoint> = graph
        .node_indices()
        .map(|index| IndexedPoint {
            point: [graph[index].geometry.x(), graph[index].geometry.y()],
            node: index,
        })
        .collect();
    let rtree = RTree::bulk_load(entries);

    info!(
        "Road network loaded: {} nodes, {} segments ({} duplicates skipped)",
        graph.node_count(),
        graph.edge_count(),
        skipped_duplicates
    );

    Ok(RoadNetwork::new(graph, rtree, segment_lookup))
}

fn parse_segment(
    raw: &RawSegment,
    graph: &DiGraph<RoadNode, RoadSegment>,
    node_index: &HashMap<String, NodeIndex>,
) -> Result<RoadSegment, Error> {
    if raw.segment_id.is_empty() {
        return Err(Error::InvalidData("segment with empty segment_id".into()));
    }
    for endpoint in [&raw.from_node, &raw.to_node] {
        if !node_index.contains_key(endpoint) {
            return Err(Error::InvalidData(format!(
                "segment {}: dangling endpoint {endpoint}",
                raw.segment_id
            )));
        }
    }

    let length_m = parse_f64(&raw.length_m, "length_m", &raw.segment_id)?;
    let speed_limit_kmh = parse_f64(&raw.speed_limit_kmh, "speed_limit_kmh", &raw.segment_id)?;
    if length_m <= 0.0 || speed_limit_kmh <= 0.0 {
        return Err(Error::InvalidData(format!(
            "segment {}: length and speed limit must be positive",
            raw.segment_id
        )));
    }

    let geometry = match parse_geometry(&raw.geometry, &raw.segment_id)? {
        Some(line) => line,
        None => LineString::from(vec![
            graph[node_index[&raw.from_node]].geometry,
            graph[node_index[&raw.to_node]].geometry,
        ]),
    };

    Ok(RoadSegment {
        id: raw.segment_id.clone(),
        length_m,
        speed_limit_kmh,
        free_flow_secs: length_m / (speed_limit_kmh * KMH_TO_MS),
        geometry,
        slot: 0, // assigned by the caller once the edge order is known
    })
}

/// Parse a `lon lat;lon lat;...` polyline. Empty input means the source
/// carries no geometry for this segment.
fn parse_geometry(value: &str, segment_id: &str) -> Result<Option<LineString<f64>>, Error> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    let coords: Vec<Coord<f64>> = value
        .split(';')
        .map(|pair| {
            let mut parts = pair.split_whitespace();
            let lon = parts.next().map(str::parse::<f64>);
            let lat = parts.next().map(str::parse::<f64>);
            match (lon, lat) {
                (Some(Ok(x)), Some(Ok(y))) => Ok(Coord { x, y }),
                _ => Err(Error::InvalidData(format!(
                    "segment {segment_id}: malformed geometry point '{pair}'"
                ))),
            }
        })
        .collect::<Result<_, _>>()?;
    if coords.len() < 2 {
        return Err(Error::InvalidData(format!(
            "segment {segment_id}: geometry needs at least two points"
        )));
    }
    Ok(Some(LineString::new(coords)))
}
