//! Externally consumable route payloads.
//!
//! Shapes mirror what the presentation layer renders: totals, a lng/lat
//! polyline, a typed congestion label, and a per-segment breakdown for
//! "why this route" explanations. Errors cross the boundary as a
//! structured [`QueryFailure`], never as a panic or opaque string.

use geojson::{Feature, FeatureCollection, Geometry, GeometryValue as GeoJsonValue};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::EngineConfig;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Light,
    Moderate,
    Heavy,
}

impl CongestionLevel {
    /// Classify a cost-weighted mean path weight against the configured
    /// thresholds.
    pub(crate) fn from_mean_weight(weight: f32, config: &EngineConfig) -> Self {
        if weight < config.light_threshold {
            CongestionLevel::Light
        } else if weight < config.heavy_threshold {
            CongestionLevel::Moderate
        } else {
            CongestionLevel::Heavy
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrafficConditions {
    pub status: CongestionLevel,
    /// Extra seconds over free-flow attributable to congestion.
    pub delay_s: f64,
}

/// Per-segment congestion breakdown entry.
#[derive(Debug, Clone, Serialize)]
pub struct RouteLeg {
    pub segment_id: String,
    /// Snapshot weight of this segment at computation time.
    pub weight: f32,
    pub travel_time_s: f64,
    pub distance_m: f64,
}

/// One drivable route, fully resolved for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub total_distance_m: f64,
    pub estimated_time_s: f64,
    /// `[lng, lat]` polyline from origin node to destination node.
    pub geometry: Vec<[f64; 2]>,
    pub traffic_conditions: TrafficConditions,
    pub legs: Vec<RouteLeg>,
}

/// Response of one `plan_route` call: the best route plus any requested
/// alternatives, each computed against the same weight snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct RoutePlan {
    pub route_id: String,
    #[serde(flatten)]
    pub route: RouteSummary,
    pub alternatives: Vec<RouteSummary>,
}

/// Structured error payload: failed queries return a typed reason string
/// suitable for direct display instead of throwing across the boundary.
#[derive(Debug, Clone, Serialize)]
pub struct QueryFailure {
    pub status: &'static str,
    pub reason: String,
}

impl From<&Error> for QueryFailure {
    fn from(error: &Error) -> Self {
        Self {
            status: "error",
            reason: error.to_string(),
        }
    }
}

impl RoutePlan {
    /// Converts the plan to a `GeoJSON` `FeatureCollection`: one
    /// LineString feature for the primary route and one per alternative.
    pub fn to_geojson(&self) -> FeatureCollection {
        let mut features = vec![route_feature(&self.route, &self.route_id, "primary")];
        for (idx, alternative) in self.alternatives.iter().enumerate() {
            features.push(route_feature(
                alternative,
                &self.route_id,
                &format!("alternative_{}", idx + 1),
            ));
        }
        FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        }
    }

    pub fn to_geojson_string(&self) -> Result<String, Error> {
        serde_json::to_string(&self.to_geojson()).map_err(|e| Error::GeoJsonError(e.to_string()))
    }
}

fn route_feature(route: &RouteSummary, route_id: &str, role: &str) -> Feature {
    let coords: Vec<Vec<f64>> = route
        .geometry
        .iter()
        .map(|position| position.to_vec())
        .collect();
    let properties = json!({
        "route_id": route_id,
        "role": role,
        "total_distance_m": route.total_distance_m,
        "estimated_time_s": route.estimated_time_s,
        "status": route.traffic_conditions.status,
        "delay_s": route.traffic_conditions.delay_s,
    });
    Feature {
        geometry: Some(Geometry::new(GeoJsonValue::new_line_string(coords))),
        properties: properties.as_object().cloned(),
        bbox: None,
        id: None,
        foreign_members: None,
    }
}
