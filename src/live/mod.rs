//! Live per-edge congestion state
//!
//! The only data in the crate that mutates after startup. Ingestion
//! workers fold samples in while search threads take snapshots; neither
//! side ever blocks the other, since every entry is a single atomic word
//! replaced as a whole.

mod snapshot;
mod store;

pub use snapshot::WeightSnapshot;
pub use store::{EdgeWeightReport, LiveWeightStore};
