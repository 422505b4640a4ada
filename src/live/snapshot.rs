use chrono::{DateTime, Utc};

use crate::EdgeSlot;

/// Point-in-time copy of every live weight, indexed by [`EdgeSlot`].
///
/// One snapshot backs exactly one search invocation, so a query never
/// observes a half-updated weight mid-search and re-reads within the
/// same query are identical.
#[derive(Debug, Clone)]
pub struct WeightSnapshot {
    weights: Vec<f32>,
    taken_at: DateTime<Utc>,
}

impl WeightSnapshot {
    pub(crate) fn new(weights: Vec<f32>, taken_at: DateTime<Utc>) -> Self {
        Self { weights, taken_at }
    }

    /// Effective congestion multiplier for a slot, already clamped to
    /// `[1.0, max_congestion_multiplier]`.
    #[inline]
    pub fn weight(&self, slot: EdgeSlot) -> f32 {
        self.weights[slot]
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
