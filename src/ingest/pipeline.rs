use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::config::IngestConfig;
use crate::ingest::{IngestStats, IngestStatsSnapshot, RawReading, ReadingBuffer, TelemetrySource};
use crate::live::LiveWeightStore;
use crate::model::RoadNetwork;
use crate::Error;

/// Degraded-health signal derived from worker state; the ingestion
/// pipeline itself never fails fatally after startup.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineHealth {
    pub healthy: bool,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub buffered: usize,
}

/// Join handles of the worker pair spawned by [`IngestPipeline::spawn`].
pub struct IngestHandles {
    receiver: JoinHandle<()>,
    folder: JoinHandle<()>,
}

impl IngestHandles {
    pub fn join(self) {
        let _ = self.receiver.join();
        let _ = self.folder.join();
    }
}

/// Continuously consumes raw telemetry and updates the live weight store.
///
/// The receiver worker pumps lines from a [`TelemetrySource`] into the
/// bounded buffer, reconnecting with exponential backoff on upstream
/// loss; the fold worker drains the buffer into the store. Each message
/// is processed independently, so a reconnect never requires the store
/// to be rebuilt and duplicate delivery only re-folds harmlessly.
pub struct IngestPipeline {
    network: Arc<RoadNetwork>,
    store: Arc<LiveWeightStore>,
    config: IngestConfig,
    stats: IngestStats,
    buffer: ReadingBuffer,
    shutdown: AtomicBool,
    consecutive_failures: AtomicU32,
    last_error: Mutex<Option<String>>,
}

impl IngestPipeline {
    pub fn new(
        network: Arc<RoadNetwork>,
        store: Arc<LiveWeightStore>,
        config: IngestConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        let buffer = ReadingBuffer::new(config.buffer_capacity);
        Ok(Self {
            network,
            store,
            config,
            stats: IngestStats::default(),
            buffer,
            shutdown: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
            last_error: Mutex::new(None),
        })
    }

    pub fn stats(&self) -> IngestStatsSnapshot {
        self.stats.summary()
    }

    pub fn health(&self) -> PipelineHealth {
        let consecutive_failures = self.consecutive_failures.load(Ordering::Relaxed);
        PipelineHealth {
            healthy: consecutive_failures == 0,
            consecutive_failures,
            last_error: self.last_error.lock().unwrap().clone(),
            buffered: self.buffer.len(),
        }
    }

    /// Stops both workers: the receiver exits its reconnect loop and the
    /// fold worker drains whatever is already buffered, then returns.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.buffer.close();
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Spawns the receiver/fold worker pair. `connect` is invoked for the
    /// initial connection and after every upstream loss.
    pub fn spawn<F, S>(self: &Arc<Self>, connect: F) -> std::io::Result<IngestHandles>
    where
        F: FnMut() -> Result<S, Error> + Send + 'static,
        S: TelemetrySource,
    {
        let receiver = {
            let pipeline = Arc::clone(self);
            std::thread::Builder::new()
                .name("viaflow-ingest-recv".into())
                .spawn(move || pipeline.run_receiver(connect))?
        };
        let folder = {
            let pipeline = Arc::clone(self);
            std::thread::Builder::new()
                .name("viaflow-ingest-fold".into())
                .spawn(move || pipeline.run_folder())?
        };
        Ok(IngestHandles { receiver, folder })
    }

    /// Receiver loop: source -> buffer, with reconnect-and-backoff.
    /// Runs until shutdown or a clean end of stream, then closes the
    /// buffer so the fold worker drains and exits.
    pub fn run_receiver<F, S>(&self, mut connect: F)
    where
        F: FnMut() -> Result<S, Error>,
        S: TelemetrySource,
    {
        let mut backoff = self.config.backoff_base;
        'reconnect: while !self.is_shutdown() {
            match connect() {
                Ok(mut source) => loop {
                    if self.is_shutdown() {
                        break 'reconnect;
                    }
                    match source.recv() {
                        Ok(Some(line)) => {
                            self.stats.record_received();
                            if self.buffer.push(line) {
                                self.stats.record_overflow();
                            }
                            self.record_success();
                            backoff = self.config.backoff_base;
                        }
                        Ok(None) => {
                            info!("telemetry stream ended cleanly");
                            break 'reconnect;
                        }
                        Err(e) => {
                            self.record_failure(&e);
                            break;
                        }
                    }
                },
                Err(e) => self.record_failure(&e),
            }

            self.sleep_interruptibly(backoff);
            backoff = (backoff * 2).min(self.config.backoff_cap);
        }
        self.buffer.close();
    }

    /// Fold loop: buffer -> store. Exits when the buffer is closed and
    /// drained. Multiple fold workers may share one pipeline; edge
    /// updates are independent, so no coordination is needed.
    pub fn run_folder(&self) {
        while let Some(line) = self.buffer.pop() {
            self.ingest_line(&line, Utc::now());
        }
        debug!("fold worker drained, exiting");
    }

    /// Processes a single raw line: parse, validate, fold. A malformed
    /// or droppable message is counted and skipped, never fatal.
    pub fn ingest_line(&self, line: &str, now: DateTime<Utc>) {
        let outcome = RawReading::parse(line).and_then(|reading| {
            reading
                .resolve(&self.network, &self.config, now)
                .map(|(edge, observed)| (edge, observed, reading.timestamp))
        });
        match outcome {
            Ok((edge, observed, timestamp)) => {
                let segment = self.network.segment(edge);
                // Folded at the observation time, not arrival time, so
                // reordering within the staleness window is tolerated.
                self.store.apply_sample(segment.slot, observed, timestamp);
                self.stats.record_applied();
            }
            Err(reason) => {
                debug!("dropping reading ({reason:?}): {line}");
                self.stats.record_drop(reason);
            }
        }
    }

    fn record_failure(&self, error: &Error) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_error.lock().unwrap() = Some(error.to_string());
        self.stats.record_reconnect();
        warn!("telemetry upstream lost (attempt {failures}): {error}");
    }

    fn record_success(&self) {
        if self.consecutive_failures.swap(0, Ordering::Relaxed) > 0 {
            *self.last_error.lock().unwrap() = None;
            info!("telemetry upstream recovered");
        }
    }

    /// Backoff sleep that wakes early on shutdown.
    fn sleep_interruptibly(&self, total: Duration) {
        let step = Duration::from_millis(20);
        let mut slept = Duration::ZERO;
        while slept < total && !self.is_shutdown() {
            let chunk = step.min(total - slept);
            std::thread::sleep(chunk);
            slept += chunk;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, Utc};

    use super::*;
    use crate::config::{EngineConfig, IngestConfig};
    use crate::ingest::StaticSource;
    use crate::testutil::triangle_network;

    fn pipeline_with(config: IngestConfig) -> Arc<IngestPipeline> {
        let network = Arc::new(triangle_network());
        let store = Arc::new(
            LiveWeightStore::for_network(&network, &EngineConfig::default()).unwrap(),
        );
        Arc::new(IngestPipeline::new(network, store, config).unwrap())
    }

    fn reading_line(segment_id: &str, speed_kmh: f64) -> String {
        format!(
            r#"{{"segment_id":"{segment_id}","speed_kmh":{speed_kmh},"timestamp":"{}"}}"#,
            Utc::now().to_rfc3339()
        )
    }

    #[test]
    fn applies_valid_reading_to_store() {
        let pipeline = pipeline_with(IngestConfig::default());
        pipeline.ingest_line(&reading_line("seg-ab", 20.0), Utc::now());

        let stats = pipeline.stats();
        assert_eq!(stats.applied, 1);

        let edge = pipeline.network.resolve_segment("seg-ab").unwrap();
        let slot = pipeline.network.segment(edge).slot;
        let weight = pipeline.store.effective_weight(slot, Utc::now());
        assert!(weight > 2.0, "weight was {weight}");
    }

    #[test]
    fn counts_each_drop_reason() {
        let pipeline = pipeline_with(IngestConfig::default());
        let now = Utc::now();

        pipeline.ingest_line("garbage", now);
        pipeline.ingest_line(&reading_line("seg-zz", 30.0), now);
        pipeline.ingest_line(&reading_line("seg-ab", -3.0), now);
        let stale = format!(
            r#"{{"segment_id":"seg-ab","speed_kmh":30.0,"timestamp":"{}"}}"#,
            (now - TimeDelta::seconds(7_200)).to_rfc3339()
        );
        pipeline.ingest_line(&stale, now);

        let stats = pipeline.stats();
        assert_eq!(stats.dropped_malformed, 1);
        assert_eq!(stats.dropped_unknown, 1);
        assert_eq!(stats.dropped_invalid, 1);
        assert_eq!(stats.dropped_stale, 1);
        assert_eq!(stats.applied, 0);
    }

    #[test]
    fn receiver_reconnects_with_backoff_then_recovers() {
        let config = IngestConfig {
            backoff_base: Duration::from_millis(1),
            backoff_cap: Duration::from_millis(4),
            ..IngestConfig::default()
        };
        let pipeline = pipeline_with(config);

        let mut attempts = 0;
        let line = reading_line("seg-ab", 25.0);
        pipeline.run_receiver(move || {
            attempts += 1;
            if attempts <= 2 {
                Err(Error::UpstreamDisconnected("connection refused".into()))
            } else {
                Ok(StaticSource::from_lines([line.clone()]))
            }
        });

        let stats = pipeline.stats();
        assert_eq!(stats.reconnects, 2);
        assert_eq!(stats.received, 1);
        assert!(pipeline.health().healthy);
    }

    #[test]
    fn spawned_workers_fold_and_shut_down() {
        let pipeline = pipeline_with(IngestConfig::default());
        let lines: Vec<String> = (0..10).map(|_| reading_line("seg-ac", 10.0)).collect();

        let handles = pipeline
            .spawn(move || Ok(StaticSource::from_lines(lines.clone())))
            .unwrap();
        handles.join();

        let stats = pipeline.stats();
        assert_eq!(stats.received, 10);
        assert_eq!(stats.applied, 10);
        assert!(pipeline.buffer.is_empty());
    }

    #[test]
    fn shutdown_stops_receiver_promptly() {
        let pipeline = pipeline_with(IngestConfig::default());
        let handles = pipeline
            .spawn(|| -> Result<StaticSource, Error> {
                Err(Error::UpstreamDisconnected("down".into()))
            })
            .unwrap();

        std::thread::sleep(Duration::from_millis(30));
        assert!(!pipeline.health().healthy);
        pipeline.shutdown();
        handles.join();
    }
}
