#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

//! Drains one full pass of a split and reports throughput.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use pixline_core::settings::Settings;
use pixline_core::types::Mode;
use pixline_reader::{ReaderCaps, TrainStream};

#[derive(Debug, Parser)]
#[command(name = "pixline-bench", about = "drain a dataset split and report throughput")]
struct Args {
    /// Data root containing images and the split manifests.
    #[arg(long, env = "PIXLINE_DATA_DIR")]
    data_dir: PathBuf,

    /// Split to read: train, val or test.
    #[arg(long, default_value = "train")]
    mode: Mode,

    #[arg(long, default_value_t = ReaderCaps::default().num_workers)]
    workers: usize,

    #[arg(long, default_value_t = ReaderCaps::default().queue_capacity)]
    queue_capacity: usize,

    /// Seed for this pass (train shuffle, augmentation, mixup).
    #[arg(long, default_value_t = 0)]
    pass_seed: u64,

    /// Enable mixup resampling (train only).
    #[arg(long)]
    mixup: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    pixline_observe::logging::init_tracing();
    let args = Args::parse();

    let settings = Settings {
        use_mixup: args.mixup,
        ..Settings::default()
    };
    let caps = ReaderCaps {
        num_workers: args.workers,
        queue_capacity: args.queue_capacity,
    };

    let start = Instant::now();
    let mut samples: u64 = 0;
    match args.mode {
        Mode::Train => match pixline_reader::train(settings, caps, &args.data_dir, args.pass_seed)?
        {
            TrainStream::Plain(mut stream) => {
                while stream.recv().await.is_some() {
                    samples += 1;
                }
                stream.join().await?;
            }
            TrainStream::Mixed(mut stream) => {
                while stream.recv().await.is_some() {
                    samples += 1;
                }
                stream.join().await?;
            }
        },
        Mode::Val => {
            let mut stream = pixline_reader::val(settings, caps, &args.data_dir)?;
            while stream.recv().await.is_some() {
                samples += 1;
            }
            stream.join().await?;
        }
        Mode::Test => {
            let mut stream = pixline_reader::test(settings, caps, &args.data_dir)?;
            while stream.recv().await.is_some() {
                samples += 1;
            }
            stream.join().await?;
        }
    }

    let elapsed = start.elapsed();
    let rate = samples as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    info!(
        event = "bench_done",
        mode = ?args.mode,
        samples,
        elapsed_ms = elapsed.as_millis() as u64,
        samples_per_sec = format!("{rate:.1}"),
        "pass drained"
    );
    Ok(())
}
