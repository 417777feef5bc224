use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution};
use tokio::sync::mpsc;
use tracing::info;

use pixline_core::types::MixedSample;

use crate::pipeline::{CancelHandle, SampleStream};

/// Mixup resampling stage layered over a [`SampleStream`].
///
/// Buffers upstream samples into batches, draws one mixing coefficient per
/// batch, and blends each sample with a partner drawn from a random
/// permutation of the same batch. A trailing partial batch is dropped.
pub struct MixupStream {
    rx: mpsc::Receiver<MixedSample>,
    driver: tokio::task::JoinHandle<Result<()>>,
    cancel: CancelHandle,
}

impl MixupStream {
    /// Spawn the batching task over `upstream`. With `alpha <= 0` the
    /// coefficient is pinned to 1.0 and every item passes through blended
    /// with itself unchanged. Must be called within a tokio runtime.
    pub fn spawn(upstream: SampleStream, batch_size: usize, alpha: f64, seed: u64) -> Self {
        let SampleStream {
            rx: mut up_rx,
            driver: up_driver,
            cancel,
            metrics,
        } = upstream;

        let batch_size = batch_size.max(1);
        let (tx, rx) = mpsc::channel::<MixedSample>(batch_size);

        let driver = tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut batch = Vec::with_capacity(batch_size);
            let mut emitted: u64 = 0;
            'bridge: while let Some(sample) = up_rx.recv().await {
                metrics.on_dequeue();
                batch.push(sample);
                if batch.len() < batch_size {
                    continue;
                }

                let lam = draw_lam(&mut rng, alpha)?;
                let mut partners: Vec<usize> = (0..batch.len()).collect();
                partners.shuffle(&mut rng);

                for (i, partner) in partners.into_iter().enumerate() {
                    let a = &batch[i];
                    let b = &batch[partner];
                    let label_a = a.label.context("mixup requires labeled samples")?;
                    let label_b = b.label.context("mixup requires labeled samples")?;
                    let image = a
                        .image
                        .mixed_with(&b.image, lam)
                        .context("mixup batch has mismatched image shapes")?;
                    let mixed = MixedSample {
                        image,
                        label_a,
                        label_b,
                        lam,
                    };
                    if tx.send(mixed).await.is_err() {
                        break 'bridge;
                    }
                    emitted += 1;
                }
                batch.clear();
            }

            if !batch.is_empty() {
                info!(
                    event = "mixup_tail_dropped",
                    dropped = batch.len(),
                    batch_size,
                    "dropping partial trailing batch"
                );
            }
            drop(up_rx);
            info!(event = "mixup_drained", emitted, "mixup stage drained");
            up_driver.await.context("pipeline driver panicked")?
        });

        Self { rx, driver, cancel }
    }

    pub async fn recv(&mut self) -> Option<MixedSample> {
        self.rx.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop accepting items and wait for both stages to finish.
    pub async fn join(self) -> Result<()> {
        let MixupStream { rx, driver, cancel } = self;
        // Unblock upstream workers that are parked on a full buffer.
        cancel.cancel();
        drop(rx);
        driver.await.context("mixup driver panicked")?
    }
}

// Draw helper kept here so tests can pin down the coefficient's range
// without standing up a pipeline.
pub(crate) fn draw_lam(rng: &mut impl Rng, alpha: f64) -> Result<f32> {
    if alpha <= 0.0 {
        return Ok(1.0);
    }
    let beta = Beta::new(alpha, alpha).context("invalid mixup alpha")?;
    Ok(beta.sample(rng) as f32)
}
