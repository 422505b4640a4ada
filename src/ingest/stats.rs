use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::ingest::DropReason;

/// Lock-free ingestion counters shared between workers and health probes.
#[derive(Debug, Default)]
pub struct IngestStats {
    received: AtomicU64,
    applied: AtomicU64,
    dropped_malformed: AtomicU64,
    dropped_unknown: AtomicU64,
    dropped_stale: AtomicU64,
    dropped_invalid: AtomicU64,
    dropped_overflow: AtomicU64,
    reconnects: AtomicU64,
}

/// Plain-data copy of the counters, ready for serialization.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IngestStatsSnapshot {
    pub received: u64,
    pub applied: u64,
    pub dropped_malformed: u64,
    pub dropped_unknown: u64,
    pub dropped_stale: u64,
    pub dropped_invalid: u64,
    pub dropped_overflow: u64,
    pub reconnects: u64,
}

impl IngestStats {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overflow(&self) {
        self.dropped_overflow.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drop(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::Malformed => &self.dropped_malformed,
            DropReason::UnknownSegment => &self.dropped_unknown,
            DropReason::Stale | DropReason::FutureSkew => &self.dropped_stale,
            DropReason::Implausible => &self.dropped_invalid,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
            dropped_unknown: self.dropped_unknown.load(Ordering::Relaxed),
            dropped_stale: self.dropped_stale.load(Ordering::Relaxed),
            dropped_invalid: self.dropped_invalid.load(Ordering::Relaxed),
            dropped_overflow: self.dropped_overflow.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}
