use chrono::{DateTime, Utc};
use petgraph::graph::EdgeIndex;
use serde::Deserialize;

use crate::config::IngestConfig;
use crate::model::RoadNetwork;

/// One raw telemetry record as it arrives on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReading {
    pub segment_id: String,
    pub speed_kmh: f64,
    /// ISO 8601 observation time, not arrival time.
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub occupancy: Option<f64>,
}

/// Why a reading was discarded. Every variant is counted, none is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Not parseable as a reading at all.
    Malformed,
    /// `segment_id` does not exist in the loaded network.
    UnknownSegment,
    /// Older than the staleness window; late data does not help live routing.
    Stale,
    /// Timestamped in the future beyond the allowed clock skew.
    FutureSkew,
    /// Physically impossible speed or occupancy.
    Implausible,
}

impl RawReading {
    pub fn parse(line: &str) -> Result<Self, DropReason> {
        serde_json::from_str(line).map_err(|_| DropReason::Malformed)
    }

    /// Validates the reading against the network and converts it to a
    /// foldable `(edge, observed weight)` pair. The observed weight is the
    /// free-flow-to-observed speed ratio; values below 1.0 survive here
    /// and are clamped at read time, free-flow being the floor.
    pub fn resolve(
        &self,
        network: &RoadNetwork,
        config: &IngestConfig,
        now: DateTime<Utc>,
    ) -> Result<(EdgeIndex, f32), DropReason> {
        let edge = network
            .resolve_segment(&self.segment_id)
            .ok_or(DropReason::UnknownSegment)?;

        let age = now.signed_duration_since(self.timestamp);
        if age.num_milliseconds() > config.max_reading_age.as_millis() as i64 {
            return Err(DropReason::Stale);
        }
        if (-age).num_milliseconds() > config.max_future_skew.as_millis() as i64 {
            return Err(DropReason::FutureSkew);
        }

        let segment = network.segment(edge);
        if self.speed_kmh <= 0.0
            || self.speed_kmh > segment.speed_limit_kmh * config.max_speed_factor
        {
            return Err(DropReason::Implausible);
        }
        if let Some(occupancy) = self.occupancy
            && !(0.0..=1.0).contains(&occupancy)
        {
            return Err(DropReason::Implausible);
        }

        Ok((edge, (segment.speed_limit_kmh / self.speed_kmh) as f32))
    }
}
