use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use geo::Point;
use log::debug;
use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::live::LiveWeightStore;
use crate::model::RoadNetwork;
use crate::query::{CongestionLevel, RouteLeg, RoutePlan, RouteSummary, TrafficConditions};
use crate::routing::{RouteOptions, RoutePath, SearchBudget, plan_alternatives};
use crate::Error;

/// Live-state export entry: one segment's current weight, keyed by the
/// external segment identifier.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentCondition {
    pub segment_id: String,
    pub weight: f32,
    pub last_update: Option<DateTime<Utc>>,
    pub samples: u32,
}

/// Entry point for route queries: owns the injected network and weight
/// store handles and turns raw coordinates into ranked, explainable
/// routes. Cheap to share across query worker threads.
pub struct RoutePlanner {
    network: Arc<RoadNetwork>,
    store: Arc<LiveWeightStore>,
    config: EngineConfig,
}

impl RoutePlanner {
    pub fn new(
        network: Arc<RoadNetwork>,
        store: Arc<LiveWeightStore>,
        config: EngineConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        if store.slot_count() != network.slot_count() {
            return Err(Error::InvalidData(format!(
                "weight store has {} slots for a network with {} segments",
                store.slot_count(),
                network.slot_count()
            )));
        }
        Ok(Self {
            network,
            store,
            config,
        })
    }

    /// Plans a route between two raw coordinates.
    ///
    /// Resolves both endpoints to their nearest graph nodes, takes one
    /// weight snapshot, and searches against it; the snapshot guarantees
    /// the result is consistent even while ingestion keeps writing.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvableLocation`] when an endpoint is outside
    /// network coverage, plus the search engine's
    /// [`Error::NoRouteFound`] / [`Error::SearchTimeout`]. All three are
    /// expected outcomes, reportable via [`crate::query::QueryFailure`].
    pub fn plan_route(
        &self,
        origin: Point<f64>,
        destination: Point<f64>,
        options: &RouteOptions,
    ) -> Result<RoutePlan, Error> {
        let origin_node = self.snap(origin)?;
        let destination_node = self.snap(destination)?;
        debug!(
            "planning route {} -> {}",
            self.network.node(origin_node).id,
            self.network.node(destination_node).id
        );

        let snapshot = self.store.snapshot(Utc::now());
        let budget = SearchBudget::from_config(&self.config);
        let routes = plan_alternatives(
            &self.network,
            &snapshot,
            options,
            &self.config,
            origin_node,
            destination_node,
            &budget,
        )?;

        let mut summaries = routes.iter().map(|path| self.summarize(path));
        let route = summaries.next().ok_or(Error::NoRouteFound)?;
        Ok(RoutePlan {
            route_id: route_id(origin, destination),
            route,
            alternatives: summaries.collect(),
        })
    }

    /// Read-only snapshot export for dashboards, optionally filtered to
    /// specific segment identifiers.
    pub fn current_edge_weights(&self, filter: Option<&[&str]>) -> Vec<SegmentCondition> {
        let reports = self.store.current_weights(Utc::now());
        self.network
            .graph
            .edge_references()
            .filter(|edge| {
                filter.is_none_or(|wanted| wanted.contains(&edge.weight().id.as_str()))
            })
            .map(|edge| {
                let report = &reports[edge.weight().slot];
                SegmentCondition {
                    segment_id: edge.weight().id.clone(),
                    weight: report.weight,
                    last_update: report.last_update,
                    samples: report.samples,
                }
            })
            .collect()
    }

    fn snap(&self, point: Point<f64>) -> Result<NodeIndex, Error> {
        let (node, distance_m) = self
            .network
            .nearest_node(point)
            .ok_or(Error::UnresolvableLocation {
                nearest_m: f64::INFINITY,
            })?;
        if distance_m > self.config.max_snap_distance_m {
            return Err(Error::UnresolvableLocation {
                nearest_m: distance_m,
            });
        }
        Ok(node)
    }

    fn summarize(&self, path: &RoutePath) -> RouteSummary {
        let legs: Vec<RouteLeg> = path
            .edges
            .iter()
            .zip(&path.edge_weights)
            .map(|(&edge, &weight)| {
                let segment = self.network.segment(edge);
                RouteLeg {
                    segment_id: segment.id.clone(),
                    weight,
                    travel_time_s: segment.free_flow_secs * f64::from(weight),
                    distance_m: segment.length_m,
                }
            })
            .collect();

        RouteSummary {
            total_distance_m: path.total_distance_m,
            estimated_time_s: f64::from(path.travel_time_ms) / 1_000.0,
            geometry: self.assemble_geometry(path),
            traffic_conditions: TrafficConditions {
                status: CongestionLevel::from_mean_weight(path.mean_weight(), &self.config),
                delay_s: path.delay_s(),
            },
            legs,
        }
    }

    /// Concatenates segment polylines into one lng/lat line, dropping
    /// the duplicated joint point between consecutive segments.
    fn assemble_geometry(&self, path: &RoutePath) -> Vec<[f64; 2]> {
        if path.is_trivial() {
            let point = self.network.node(path.nodes[0]).geometry;
            return vec![[point.x(), point.y()]];
        }
        let mut geometry = Vec::new();
        for (index, &edge) in path.edges.iter().enumerate() {
            let coords = &self.network.segment(edge).geometry.0;
            let skip = usize::from(index > 0);
            geometry.extend(coords.iter().skip(skip).map(|c| [c.x, c.y]));
        }
        geometry
    }
}

/// Opaque per-response identifier; unique enough for log correlation.
fn route_id(origin: Point<f64>, destination: Point<f64>) -> String {
    let mut hasher = DefaultHasher::new();
    origin.x().to_bits().hash(&mut hasher);
    origin.y().to_bits().hash(&mut hasher);
    destination.x().to_bits().hash(&mut hasher);
    destination.y().to_bits().hash(&mut hasher);
    format!(
        "route-{}-{:08x}",
        Utc::now().timestamp_millis(),
        hasher.finish() as u32
    )
}
