//! Engine and ingestion tuning knobs.
//!
//! Defaults follow common live-routing practice: a five minute half-life
//! ages out congestion on the same time scale drivers experience it, and
//! the light/moderate/heavy thresholds mirror the multipliers used for
//! traffic colouring on the consuming dashboard.

use std::time::Duration;

use crate::Error;

/// Configuration for the live weight store and the route search engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Half-life of the exponential moving average applied to samples
    /// and to staleness decay between samples.
    pub half_life: Duration,
    /// Upper clamp on the per-edge congestion multiplier.
    pub max_congestion_multiplier: f32,
    /// Maximum distance between a query coordinate and its snapped node.
    pub max_snap_distance_m: f64,
    /// Path weight below this is labelled light traffic.
    pub light_threshold: f32,
    /// Path weight below this is labelled moderate, above it heavy.
    pub heavy_threshold: f32,
    /// Cost multiplier applied to already-used edges when computing
    /// alternative routes.
    pub penalty_factor: f32,
    /// Total number of routes returned in alternatives mode, primary
    /// route included.
    pub max_alternatives: usize,
    /// Wall-clock budget for one search invocation.
    pub search_deadline: Duration,
    /// Settled-node budget for one search invocation.
    pub max_settled_nodes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            half_life: Duration::from_secs(300),
            max_congestion_multiplier: 8.0,
            max_snap_distance_m: 2_000.0,
            light_threshold: 1.3,
            heavy_threshold: 1.8,
            penalty_factor: 1.5,
            max_alternatives: 3,
            search_deadline: Duration::from_secs(2),
            max_settled_nodes: 4_000_000,
        }
    }
}

impl EngineConfig {
    /// Entries older than this are considered stale; by then the lazy
    /// read-time decay has pulled them most of the way back to free-flow.
    pub fn staleness_window(&self) -> Duration {
        self.half_life * 2
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.half_life.is_zero() {
            return Err(Error::InvalidData("half_life must be positive".into()));
        }
        if self.max_congestion_multiplier < 1.0 {
            return Err(Error::InvalidData(
                "max_congestion_multiplier must be at least 1.0".into(),
            ));
        }
        if self.light_threshold >= self.heavy_threshold {
            return Err(Error::InvalidData(
                "light_threshold must be below heavy_threshold".into(),
            ));
        }
        if self.penalty_factor <= 1.0 {
            return Err(Error::InvalidData(
                "penalty_factor must exceed 1.0".into(),
            ));
        }
        if self.max_alternatives == 0 {
            return Err(Error::InvalidData(
                "max_alternatives must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the telemetry ingestion pipeline.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Capacity of the bounded receive buffer. When full the oldest
    /// reading is evicted (newest-wins).
    pub buffer_capacity: usize,
    /// Readings older than this are dropped; late data is not useful
    /// for live routing.
    pub max_reading_age: Duration,
    /// Readings stamped further than this into the future are dropped
    /// as clock-skew artifacts.
    pub max_future_skew: Duration,
    /// Readings faster than this multiple of the segment's free-flow
    /// speed are dropped as physically implausible.
    pub max_speed_factor: f64,
    /// Initial reconnect backoff after an upstream disconnect.
    pub backoff_base: Duration,
    /// Backoff ceiling; doubling stops here.
    pub backoff_cap: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 4_096,
            max_reading_age: Duration::from_secs(600),
            max_future_skew: Duration::from_secs(60),
            max_speed_factor: 3.0,
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(30),
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.buffer_capacity == 0 {
            return Err(Error::InvalidData(
                "buffer_capacity must be at least 1".into(),
            ));
        }
        if self.max_speed_factor <= 1.0 {
            return Err(Error::InvalidData(
                "max_speed_factor must exceed 1.0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configs_validate() {
        EngineConfig::default().validate().unwrap();
        IngestConfig::default().validate().unwrap();
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let config = EngineConfig {
            light_threshold: 2.0,
            heavy_threshold: 1.5,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn staleness_window_is_twice_half_life() {
        let config = EngineConfig::default();
        assert_eq!(config.staleness_window(), config.half_life * 2);
    }
}
