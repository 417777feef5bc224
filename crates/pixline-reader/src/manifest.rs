use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use pixline_core::shard::ShardSpec;
use pixline_core::types::{ManifestRecord, Mode};

/// Parse manifest text: one record per line, whitespace-separated
/// `<relative_path> <integer_label>`, blank lines skipped.
///
/// Every split requires the label field on disk; the test split discards the
/// value after parsing the line shape. That asymmetry is inherited behavior.
pub fn parse_manifest(text: &str, mode: Mode) -> Result<Vec<ManifestRecord>> {
    let mut records = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        records.push(parse_line(line, i + 1, mode)?);
    }
    Ok(records)
}

fn parse_line(line: &str, line_no: usize, mode: Mode) -> Result<ManifestRecord> {
    let mut fields = line.split_whitespace();
    let path = fields
        .next()
        .with_context(|| format!("manifest line {line_no}: empty record"))?;
    let label_field = fields
        .next()
        .with_context(|| format!("manifest line {line_no}: missing label field"))?;
    let label = if mode.has_label() {
        Some(label_field.parse::<i64>().with_context(|| {
            format!("manifest line {line_no}: bad label {label_field:?}")
        })?)
    } else {
        None
    };
    Ok(ManifestRecord {
        path: path.to_string(),
        label,
    })
}

/// Load the manifest for a split: read, parse, optionally shuffle with the
/// given seed, and select this worker's shard when the distributed-training
/// environment signals are present (train split only).
///
/// The returned list is this pipeline's full single pass; a new load is
/// required per epoch.
pub fn load_split(data_dir: &Path, mode: Mode, shuffle_seed: Option<u64>) -> Result<Vec<ManifestRecord>> {
    let path = data_dir.join(mode.manifest_name());
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("read manifest failed: {}", path.display()))?;
    let mut records = parse_manifest(&text, mode)?;

    if let Some(seed) = shuffle_seed {
        let mut rng = StdRng::seed_from_u64(seed);
        records.shuffle(&mut rng);
    }

    if mode == Mode::Train {
        if let Some(shard) = ShardSpec::from_env()? {
            let total = records.len();
            let range = shard.slice(total);
            info!(
                event = "shard_selected",
                rank = shard.rank,
                world_size = shard.world_size,
                start = range.start,
                len = range.len(),
                total,
                "selected manifest shard"
            );
            records = records[range].to_vec();
        }
    }

    Ok(records)
}
