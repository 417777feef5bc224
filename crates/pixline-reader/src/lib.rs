#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

//! Manifest-driven image-classification reader.
//!
//! A data root holds images plus `train_list.txt` / `val_list.txt`
//! manifests. The reader enumerates the requested split (seeded shuffle and
//! distributed sharding for train), decodes and transforms samples on a
//! worker pool, and hands them over through a bounded buffer. The train
//! split can additionally run mixup resampling over batches.
//!
//! All constructors must be called within a tokio runtime.

pub mod decode;
pub mod manifest;
pub mod mixup;
pub mod pipeline;

use std::path::Path;

use anyhow::{Context, Result};

use pixline_core::settings::Settings;
use pixline_core::types::Mode;

pub use decode::SampleDecoder;
pub use manifest::{load_split, parse_manifest};
pub use mixup::MixupStream;
pub use pipeline::{PrefetchPipeline, ReaderCaps, ReaderMetrics, SampleStream};

/// Stream produced by [`train`]: plain decoded samples, or mixup-resampled
/// batches when the settings enable mixup.
pub enum TrainStream {
    Plain(SampleStream),
    Mixed(MixupStream),
}

/// Open the train split: seeded shuffle, shard selection from the
/// distributed-training environment, augmenting decode, prefetch, and
/// optionally mixup. `pass_seed` should change every epoch; it drives the
/// shuffle, the per-sample augmentation draws, and the mixup coefficients.
pub fn train(
    settings: Settings,
    caps: ReaderCaps,
    data_dir: &Path,
    pass_seed: u64,
) -> Result<TrainStream> {
    settings.validate().context("invalid reader settings")?;
    let records = load_split(data_dir, Mode::Train, Some(pass_seed))?;
    let decoder = SampleDecoder::new(
        settings.clone(),
        Mode::Train,
        data_dir.to_path_buf(),
        pass_seed,
    );
    let stream = PrefetchPipeline::new(caps, settings.decode_policy).spawn(records, decoder);
    if settings.use_mixup {
        Ok(TrainStream::Mixed(MixupStream::spawn(
            stream,
            settings.batch_size,
            settings.mixup_alpha,
            pass_seed,
        )))
    } else {
        Ok(TrainStream::Plain(stream))
    }
}

/// Open the validation split: deterministic evaluation transforms, no
/// shuffle, no sharding.
pub fn val(settings: Settings, caps: ReaderCaps, data_dir: &Path) -> Result<SampleStream> {
    eval_split(settings, caps, data_dir, Mode::Val)
}

/// Open the test split. Same transforms as validation; items carry no label.
pub fn test(settings: Settings, caps: ReaderCaps, data_dir: &Path) -> Result<SampleStream> {
    eval_split(settings, caps, data_dir, Mode::Test)
}

fn eval_split(
    settings: Settings,
    caps: ReaderCaps,
    data_dir: &Path,
    mode: Mode,
) -> Result<SampleStream> {
    settings.validate().context("invalid reader settings")?;
    let records = load_split(data_dir, mode, None)?;
    let decoder = SampleDecoder::new(settings.clone(), mode, data_dir.to_path_buf(), 0);
    Ok(PrefetchPipeline::new(caps, settings.decode_policy).spawn(records, decoder))
}
