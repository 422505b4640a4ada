use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed static network data. Fatal at load time.
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// The queried coordinate is farther from every network node than
    /// the configured snap radius.
    #[error("location outside coverage area")]
    UnresolvableLocation { nearest_m: f64 },
    /// Origin and destination lie in disconnected parts of the network.
    /// A normal, reportable outcome rather than a system fault.
    #[error("no drivable path found")]
    NoRouteFound,
    /// The search exhausted its deadline or settled-node budget.
    #[error("search timed out")]
    SearchTimeout,
    /// The telemetry stream dropped; the pipeline reconnects with backoff.
    #[error("upstream disconnected: {0}")]
    UpstreamDisconnected(String),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
}

impl Error {
    /// True for errors that are reported to the caller as a structured
    /// result instead of crossing the boundary as a failure of the engine.
    pub fn is_query_outcome(&self) -> bool {
        matches!(
            self,
            Error::UnresolvableLocation { .. } | Error::NoRouteFound | Error::SearchTimeout
        )
    }
}
