//! Road network model
//!
//! Static topology (intersections and directed road segments) plus the
//! spatial index used to snap query coordinates to graph nodes. The whole
//! model is immutable after loading; only the live weight store changes
//! at runtime.

pub mod components;
pub mod network;

pub use components::{RoadNode, RoadSegment};
pub use network::{IndexedPoint, RoadNetwork};
