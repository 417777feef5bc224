use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pixline_core::settings::Settings;
use pixline_core::types::{DecodedSample, ManifestRecord, Mode};
use pixline_vision as vision;

const ROTATE_MAX_DEGREES: u32 = 10;

/// Decodes one manifest record into a normalized sample, applying the
/// mode-appropriate transform chain.
///
/// Train: optional rotate, random resized crop (when `crop_size > 0`),
/// optional color jitter, a fair-coin horizontal flip, normalize.
/// Val/test: short-side resize + center crop (when `crop_size > 0`),
/// normalize. Test items carry no label.
#[derive(Debug, Clone)]
pub struct SampleDecoder {
    settings: Settings,
    mode: Mode,
    data_dir: PathBuf,
    base_seed: u64,
}

impl SampleDecoder {
    pub fn new(settings: Settings, mode: Mode, data_dir: PathBuf, base_seed: u64) -> Self {
        Self {
            settings,
            mode,
            data_dir,
            base_seed,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// RNG for one sample, derived from (base seed, sample index).
    ///
    /// Decouples the augmentation draw sequence from worker interleaving:
    /// a given (seed, index) pair always yields the same transforms.
    fn sample_rng(&self, index: u64) -> StdRng {
        let mixed = splitmix64(self.base_seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        StdRng::seed_from_u64(mixed)
    }

    /// Decode and transform the record at `index`. Blocking: call from a
    /// blocking-capable context.
    pub fn decode(&self, index: u64, record: &ManifestRecord) -> Result<DecodedSample> {
        let path = self.data_dir.join(&record.path);
        let img = image::open(&path)
            .with_context(|| format!("decode image failed: {}", path.display()))?
            .to_rgb8();
        let mut rng = self.sample_rng(index);

        let img = match self.mode {
            Mode::Train => {
                let mut img = img;
                if self.settings.rotate {
                    img = vision::rotate(&img, &mut rng, ROTATE_MAX_DEGREES)?;
                }
                if self.settings.crop_size > 0 {
                    img = vision::random_resized_crop(
                        &img,
                        &mut rng,
                        self.settings.crop_size,
                        (self.settings.lower_scale, self.settings.upper_scale),
                        (self.settings.lower_ratio, self.settings.upper_ratio),
                    )?;
                }
                if self.settings.color_jitter {
                    img = vision::color_jitter(img);
                }
                if rng.gen_range(0..2) == 1 {
                    img = vision::horizontal_flip(&img);
                }
                img
            }
            Mode::Val | Mode::Test => {
                if self.settings.crop_size > 0 {
                    let resized =
                        vision::resize_short_side(&img, self.settings.resize_short_size)?;
                    vision::crop(&resized, self.settings.crop_size, true, &mut rng)?
                } else {
                    img
                }
            }
        };

        let image = vision::normalize(&img, vision::IMAGENET_MEAN, vision::IMAGENET_STD)?;
        let label = if self.mode.has_label() {
            record.label
        } else {
            None
        };
        Ok(DecodedSample { image, label })
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}
