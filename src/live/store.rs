//! Concurrently-updatable per-edge weight store.
//!
//! # Entry layout
//!
//! Each edge owns one `AtomicU64`: the upper 32 bits are the f32 bit
//! pattern of the running EMA weight, the lower 32 bits the unix second
//! of the last fold. Weight and timestamp always travel together, so a
//! reader can never observe a torn entry. A second `AtomicU32` per edge
//! counts samples in the current decay window; it is diagnostic only and
//! carries no consistency guarantee.
//!
//! # Decay
//!
//! Folding uses `new = decay * old + (1 - decay) * observed` with
//! `decay = exp(-dt / half_life)`, which handles irregular sampling
//! intervals and bursts. Reads apply the same decay from the last update
//! to "now", so an edge that stops receiving samples converges back to
//! free-flow instead of freezing at its last congested value.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use log::debug;

use crate::config::EngineConfig;
use crate::live::WeightSnapshot;
use crate::model::RoadNetwork;
use crate::{EdgeSlot, Error};

/// Dashboard-facing view of one entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EdgeWeightReport {
    pub slot: EdgeSlot,
    /// Effective (decayed, clamped) weight at report time.
    pub weight: f32,
    /// `None` for entries that never received a sample.
    pub last_update: Option<DateTime<Utc>>,
    pub samples: u32,
}

pub struct LiveWeightStore {
    entries: Vec<AtomicU64>,
    samples: Vec<AtomicU32>,
    half_life_secs: f64,
    staleness_secs: f64,
    max_multiplier: f32,
}

impl LiveWeightStore {
    /// Creates a store with one free-flow entry per network segment.
    pub fn for_network(network: &RoadNetwork, config: &EngineConfig) -> Result<Self, Error> {
        Self::with_slots(network.slot_count(), config)
    }

    pub fn with_slots(slots: usize, config: &EngineConfig) -> Result<Self, Error> {
        config.validate()?;
        // last_update = 0 marks "never sampled": the first fold then sees a
        // huge dt and takes the observation at full strength.
        let initial = pack(1.0, 0);
        Ok(Self {
            entries: (0..slots).map(|_| AtomicU64::new(initial)).collect(),
            samples: (0..slots).map(|_| AtomicU32::new(0)).collect(),
            half_life_secs: config.half_life.as_secs_f64(),
            staleness_secs: config.staleness_window().as_secs_f64(),
            max_multiplier: config.max_congestion_multiplier,
        })
    }

    pub fn slot_count(&self) -> usize {
        self.entries.len()
    }

    /// Folds one observed weight into an entry.
    ///
    /// The fold distance is the gap between the entry's last update and
    /// the sample's own timestamp. Out-of-order samples (timestamp behind
    /// the entry) are folded by the magnitude of that gap but never move
    /// the entry's clock backwards; the pipeline has already bounded how
    /// old such samples can be.
    pub fn apply_sample(&self, slot: EdgeSlot, observed: f32, timestamp: DateTime<Utc>) {
        let sample_secs = unix_secs(timestamp);
        let entry = &self.entries[slot];

        let mut current = entry.load(Ordering::Acquire);
        let window_reset;
        loop {
            let (old_weight, last_update) = unpack(current);
            let dt = f64::from(sample_secs.abs_diff(last_update));
            let decay = (-dt / self.half_life_secs).exp();
            let folded =
                (decay * f64::from(old_weight) + (1.0 - decay) * f64::from(observed)) as f32;
            let packed = pack(folded, last_update.max(sample_secs));
            match entry.compare_exchange_weak(current, packed, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    window_reset = dt > self.staleness_secs;
                    break;
                }
                Err(actual) => current = actual,
            }
        }

        if window_reset {
            self.samples[slot].store(1, Ordering::Relaxed);
        } else {
            self.samples[slot].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Effective weight of one entry at `now`: the stored EMA decayed by
    /// the entry's age and clamped to `[1.0, max_congestion_multiplier]`.
    pub fn effective_weight(&self, slot: EdgeSlot, now: DateTime<Utc>) -> f32 {
        let (weight, last_update) = unpack(self.entries[slot].load(Ordering::Acquire));
        self.decayed(weight, last_update, unix_secs(now))
    }

    /// Consistent point-in-time copy of every entry. One atomic load per
    /// entry; writers are never blocked.
    pub fn snapshot(&self, now: DateTime<Utc>) -> WeightSnapshot {
        let now_secs = unix_secs(now);
        let weights = self
            .entries
            .iter()
            .map(|entry| {
                let (weight, last_update) = unpack(entry.load(Ordering::Acquire));
                self.decayed(weight, last_update, now_secs)
            })
            .collect();
        debug!("weight snapshot of {} entries taken", self.entries.len());
        WeightSnapshot::new(weights, now)
    }

    /// Read-only export of all entries for dashboards.
    pub fn current_weights(&self, now: DateTime<Utc>) -> Vec<EdgeWeightReport> {
        let now_secs = unix_secs(now);
        self.entries
            .iter()
            .zip(&self.samples)
            .enumerate()
            .map(|(slot, (entry, samples))| {
                let (weight, last_update) = unpack(entry.load(Ordering::Acquire));
                EdgeWeightReport {
                    slot,
                    weight: self.decayed(weight, last_update, now_secs),
                    last_update: (last_update > 0)
                        .then(|| Utc.timestamp_opt(i64::from(last_update), 0).single())
                        .flatten(),
                    samples: samples.load(Ordering::Relaxed),
                }
            })
            .collect()
    }

    fn decayed(&self, weight: f32, last_update: u32, now_secs: u32) -> f32 {
        let age = f64::from(now_secs.saturating_sub(last_update));
        let decay = (-age / self.half_life_secs).exp();
        let toward_baseline = 1.0 + (f64::from(weight) - 1.0) * decay;
        (toward_baseline as f32).clamp(1.0, self.max_multiplier)
    }
}

#[inline]
fn pack(weight: f32, unix_secs: u32) -> u64 {
    (u64::from(weight.to_bits()) << 32) | u64::from(unix_secs)
}

#[inline]
fn unpack(packed: u64) -> (f32, u32) {
    (f32::from_bits((packed >> 32) as u32), packed as u32)
}

/// Unix seconds clamped to u32 range (valid until 2106; pre-1970 inputs
/// clamp to the epoch).
#[inline]
fn unix_secs(timestamp: DateTime<Utc>) -> u32 {
    timestamp.timestamp().clamp(0, i64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeDelta, Utc};

    use super::*;
    use crate::config::EngineConfig;

    fn store_with(half_life_secs: u64, slots: usize) -> LiveWeightStore {
        let config = EngineConfig {
            half_life: Duration::from_secs(half_life_secs),
            ..EngineConfig::default()
        };
        LiveWeightStore::with_slots(slots, &config).unwrap()
    }

    #[test]
    fn starts_at_free_flow() {
        let store = store_with(300, 4);
        let now = Utc::now();
        for slot in 0..4 {
            assert_eq!(store.effective_weight(slot, now), 1.0);
        }
    }

    #[test]
    fn fold_moves_weight_toward_observation() {
        let store = store_with(300, 1);
        let now = Utc::now();
        store.apply_sample(0, 3.0, now);
        let weight = store.effective_weight(0, now);
        assert!(weight > 1.0 && weight <= 3.0, "weight was {weight}");

        // A burst of identical observations converges on the observation.
        for i in 1..=20 {
            store.apply_sample(0, 3.0, now + TimeDelta::seconds(i * 60));
        }
        let converged = store.effective_weight(0, now + TimeDelta::seconds(20 * 60));
        assert!((converged - 3.0).abs() < 0.1, "weight was {converged}");
    }

    #[test]
    fn weight_is_clamped_at_free_flow_floor() {
        let store = store_with(300, 1);
        let now = Utc::now();
        // Faster than free-flow: observed ratio below 1.0.
        for i in 0..10 {
            store.apply_sample(0, 0.5, now + TimeDelta::seconds(i * 60));
        }
        assert_eq!(store.effective_weight(0, now + TimeDelta::seconds(600)), 1.0);
    }

    #[test]
    fn weight_is_clamped_at_max_multiplier() {
        let config = EngineConfig {
            max_congestion_multiplier: 4.0,
            ..EngineConfig::default()
        };
        let store = LiveWeightStore::with_slots(1, &config).unwrap();
        let now = Utc::now();
        for i in 0..50 {
            store.apply_sample(0, 100.0, now + TimeDelta::seconds(i * 60));
        }
        assert_eq!(store.effective_weight(0, now + TimeDelta::seconds(50 * 60)), 4.0);
    }

    #[test]
    fn unsampled_entry_decays_toward_free_flow() {
        let store = store_with(300, 1);
        let start = Utc::now();
        for i in 0..20 {
            store.apply_sample(0, 3.0, start + TimeDelta::seconds(i * 30));
        }
        let congested = store.effective_weight(0, start + TimeDelta::seconds(600));
        assert!(congested > 2.5);

        // Past the staleness window the weight has mostly drained...
        let after_window = start + TimeDelta::seconds(600 + 2 * 300);
        let drained = store.effective_weight(0, after_window);
        assert!(drained < 1.0 + (congested - 1.0) * 0.2, "weight was {drained}");

        // ...and ten half-lives out it is free-flow within epsilon.
        let long_after = start + TimeDelta::seconds(600 + 10 * 300);
        assert!((store.effective_weight(0, long_after) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn out_of_order_sample_folds_without_rewinding_clock() {
        let store = store_with(300, 1);
        let now = Utc::now();
        store.apply_sample(0, 2.0, now);
        let before = store.effective_weight(0, now);
        // A sample 60 s behind the entry still contributes.
        store.apply_sample(0, 4.0, now - TimeDelta::seconds(60));
        assert!(store.effective_weight(0, now) > before);

        // The clock stayed at `now`: no staleness decay got charged.
        let report = &store.current_weights(now)[0];
        assert_eq!(report.last_update.unwrap().timestamp(), now.timestamp());
        assert_eq!(report.samples, 2);
    }

    #[test]
    fn snapshot_is_frozen_against_later_writes() {
        let store = store_with(300, 2);
        let now = Utc::now();
        store.apply_sample(0, 3.0, now);
        let snapshot = store.snapshot(now);
        let before = snapshot.weight(0);

        for i in 0..10 {
            store.apply_sample(0, 8.0, now + TimeDelta::seconds(i));
        }
        assert_eq!(snapshot.weight(0), before);
        assert_eq!(snapshot.weight(1), 1.0);
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn concurrent_writers_and_readers_do_not_tear() {
        let store = Arc::new(store_with(300, 8));
        let now = Utc::now();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..1_000 {
                        store.apply_sample(
                            (w * 2) % 8,
                            2.5,
                            now + TimeDelta::milliseconds(i),
                        );
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = store.snapshot(Utc::now());
                        for slot in 0..8 {
                            let weight = snapshot.weight(slot);
                            // A torn read would produce garbage bits.
                            assert!((1.0..=8.0).contains(&weight));
                        }
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }
    }
}
