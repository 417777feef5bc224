use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{info, warn};

use pixline_core::settings::DecodePolicy;
use pixline_core::types::{DecodedSample, ManifestRecord};
use pixline_observe::metrics::{Counter, DurationAgg, Gauge, ScopedTimer};

use crate::decode::SampleDecoder;

/// Worker-pool and buffer limits for the prefetch pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ReaderCaps {
    /// Concurrent decode workers.
    pub num_workers: usize,
    /// Bounded buffer capacity between workers and the consumer. Producers
    /// block when it is full; that is the backpressure mechanism.
    pub queue_capacity: usize,
}

impl Default for ReaderCaps {
    fn default() -> Self {
        Self {
            num_workers: 8,
            queue_capacity: 100_000,
        }
    }
}

#[derive(Debug, Default)]
pub struct ReaderMetrics {
    pub decoded_samples_total: Counter,
    pub decode_failures_total: Counter,
    pub skipped_samples_total: Counter,
    /// Samples currently buffered or being handed to the consumer.
    pub queue_depth: Gauge,
    pub queue_depth_high_water: Gauge,
    pub decode_time: DurationAgg,
}

impl ReaderMetrics {
    fn on_enqueue(&self) {
        let now = self.queue_depth.add(1);
        self.queue_depth_high_water.max(now);
    }

    pub(crate) fn on_dequeue(&self) {
        self.queue_depth.sub(1);
    }
}

/// Cancels an in-flight pipeline; workers observe the flag between samples
/// and while blocked on a full buffer, and wind down promptly.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// A single-pass stream of decoded samples produced by background workers.
///
/// Arrival order is whatever the workers produce; consumers must not assume
/// manifest order. The channel closing (`recv()` returning `None`) is the
/// normal end-of-pass signal; `join()` then surfaces any pipeline error.
#[derive(Debug)]
pub struct SampleStream {
    pub(crate) rx: mpsc::Receiver<DecodedSample>,
    pub(crate) driver: tokio::task::JoinHandle<Result<()>>,
    pub(crate) cancel: CancelHandle,
    pub(crate) metrics: Arc<ReaderMetrics>,
}

impl SampleStream {
    pub async fn recv(&mut self) -> Option<DecodedSample> {
        let item = self.rx.recv().await;
        if item.is_some() {
            self.metrics.on_dequeue();
        }
        item
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn metrics(&self) -> Arc<ReaderMetrics> {
        self.metrics.clone()
    }

    /// Stop accepting items and wait for the pipeline to finish. Surfaces
    /// the first decode error under [`DecodePolicy::Fail`].
    pub async fn join(self) -> Result<()> {
        let SampleStream { rx, driver, .. } = self;
        drop(rx);
        driver.await.context("pipeline driver panicked")?
    }
}

/// Fan-out decode pipeline: a fixed worker pool pulls records from a shared
/// cursor, decodes each off the async threads, and pushes results into the
/// bounded buffer.
pub struct PrefetchPipeline {
    caps: ReaderCaps,
    policy: DecodePolicy,
    metrics: Arc<ReaderMetrics>,
}

impl PrefetchPipeline {
    pub fn new(caps: ReaderCaps, policy: DecodePolicy) -> Self {
        Self {
            caps,
            policy,
            metrics: Arc::new(ReaderMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<ReaderMetrics> {
        self.metrics.clone()
    }

    /// Spawn the worker pool over `records`. Must be called within a tokio
    /// runtime.
    pub fn spawn(&self, records: Vec<ManifestRecord>, decoder: SampleDecoder) -> SampleStream {
        let (tx, rx) = mpsc::channel::<DecodedSample>(self.caps.queue_capacity.max(1));
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let records: Arc<[ManifestRecord]> = records.into();
        let cursor = Arc::new(AtomicUsize::new(0));
        let decoder = Arc::new(decoder);
        let workers = self.caps.num_workers.max(1);
        let total = records.len();

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            pool.spawn(worker_loop(
                records.clone(),
                cursor.clone(),
                decoder.clone(),
                tx.clone(),
                cancel_rx.clone(),
                self.policy,
                self.metrics.clone(),
            ));
        }
        drop(tx);

        let metrics = self.metrics.clone();
        let driver = tokio::spawn(async move {
            let mut first_err: Option<anyhow::Error> = None;
            while let Some(res) = pool.join_next().await {
                match res {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        if first_err.is_none() {
                            // First failure wins; stop the rest. The consumer
                            // sees a closed channel and learns the cause from
                            // join().
                            pool.abort_all();
                            first_err = Some(err);
                        }
                    }
                    Err(join_err) => {
                        if join_err.is_cancelled() {
                            continue;
                        }
                        if first_err.is_none() {
                            first_err = Some(join_err.into());
                        }
                    }
                }
            }
            match first_err {
                Some(err) => Err(err),
                None => {
                    info!(
                        event = "pipeline_drained",
                        total_records = total,
                        decoded = metrics.decoded_samples_total.get(),
                        skipped = metrics.skipped_samples_total.get(),
                        "prefetch pipeline drained"
                    );
                    Ok(())
                }
            }
        });

        SampleStream {
            rx,
            driver,
            cancel: CancelHandle { tx: cancel_tx },
            metrics: self.metrics.clone(),
        }
    }
}

async fn worker_loop(
    records: Arc<[ManifestRecord]>,
    cursor: Arc<AtomicUsize>,
    decoder: Arc<SampleDecoder>,
    tx: mpsc::Sender<DecodedSample>,
    mut cancel: watch::Receiver<bool>,
    policy: DecodePolicy,
    metrics: Arc<ReaderMetrics>,
) -> Result<()> {
    loop {
        if *cancel.borrow() {
            break;
        }
        let idx = cursor.fetch_add(1, Ordering::Relaxed);
        let Some(record) = records.get(idx) else {
            break;
        };

        let decoded = {
            let decoder = decoder.clone();
            let record = record.clone();
            let metrics = metrics.clone();
            tokio::task::spawn_blocking(move || {
                let _timer = ScopedTimer::new(&metrics.decode_time);
                decoder.decode(idx as u64, &record)
            })
            .await
            .context("decode worker panicked")?
        };

        match decoded {
            Ok(sample) => {
                // Count the slot before sending so the depth gauge never
                // underflows when the consumer races ahead.
                metrics.on_enqueue();
                tokio::select! {
                    _ = cancel.changed() => {
                        // Either cancelled or the handle is gone; stop.
                        metrics.on_dequeue();
                        break;
                    }
                    res = tx.send(sample) => {
                        if res.is_err() {
                            // Consumer dropped the stream.
                            metrics.on_dequeue();
                            break;
                        }
                        metrics.decoded_samples_total.inc();
                    }
                }
            }
            Err(err) => {
                metrics.decode_failures_total.inc();
                match policy {
                    DecodePolicy::Fail => {
                        return Err(err.context(format!("record {idx} failed to decode")));
                    }
                    DecodePolicy::Skip => {
                        metrics.skipped_samples_total.inc();
                        warn!(
                            event = "sample_skipped",
                            index = idx,
                            path = %record.path,
                            error = %err,
                            "skipping undecodable sample"
                        );
                    }
                }
            }
        }
    }
    Ok(())
}
