use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default square crop edge, in pixels.
pub const DEFAULT_CROP_SIZE: u32 = 224;
/// Default short-side resize target for the eval chain.
pub const DEFAULT_RESIZE_SHORT: u32 = 256;

/// What to do when a sample fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodePolicy {
    /// Abort the whole pipeline on the first failure.
    Fail,
    /// Drop the sample, log a warning and count it.
    Skip,
}

/// Reader configuration. Validated once at pipeline construction; invalid
/// bounds never reach per-sample code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Square crop edge. 0 disables cropping entirely.
    pub crop_size: u32,
    /// Short-side target for the eval resize step.
    pub resize_short_size: u32,
    /// Crop area fraction bounds for the train random crop.
    pub lower_scale: f64,
    pub upper_scale: f64,
    /// Crop aspect-ratio bounds for the train random crop.
    pub lower_ratio: f64,
    pub upper_ratio: f64,
    /// Apply a small random rotation before cropping (train only).
    pub rotate: bool,
    /// Apply the photometric distortion slot (train only, currently identity).
    pub color_jitter: bool,
    /// Wrap the train stream in the mixup resampler.
    pub use_mixup: bool,
    /// Beta(alpha, alpha) parameter for mixup. `alpha <= 0` degenerates to
    /// `lam = 1` (no mixing).
    pub mixup_alpha: f64,
    /// Mixup batch size; a trailing partial batch is dropped.
    pub batch_size: usize,
    pub decode_policy: DecodePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            crop_size: DEFAULT_CROP_SIZE,
            resize_short_size: DEFAULT_RESIZE_SHORT,
            lower_scale: 0.08,
            upper_scale: 1.0,
            lower_ratio: 3.0 / 4.0,
            upper_ratio: 4.0 / 3.0,
            rotate: false,
            color_jitter: false,
            use_mixup: false,
            mixup_alpha: 0.2,
            batch_size: 32,
            decode_policy: DecodePolicy::Fail,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettingsError {
    #[error("batch_size must be > 0")]
    ZeroBatchSize,
    #[error("scale bounds must satisfy 0 < lower <= upper <= 1 (got {lower}..{upper})")]
    InvalidScaleBounds { lower: f64, upper: f64 },
    #[error("ratio bounds must satisfy 0 < lower <= upper (got {lower}..{upper})")]
    InvalidRatioBounds { lower: f64, upper: f64 },
    #[error("crop_size {crop_size} exceeds resize_short_size {resize_short_size}")]
    CropExceedsResize {
        crop_size: u32,
        resize_short_size: u32,
    },
    #[error("resize_short_size must be > 0 when cropping is enabled")]
    ZeroResizeShort,
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.batch_size == 0 {
            return Err(SettingsError::ZeroBatchSize);
        }
        if !(self.lower_scale > 0.0
            && self.lower_scale <= self.upper_scale
            && self.upper_scale <= 1.0)
        {
            return Err(SettingsError::InvalidScaleBounds {
                lower: self.lower_scale,
                upper: self.upper_scale,
            });
        }
        if !(self.lower_ratio > 0.0 && self.lower_ratio <= self.upper_ratio) {
            return Err(SettingsError::InvalidRatioBounds {
                lower: self.lower_ratio,
                upper: self.upper_ratio,
            });
        }
        if self.crop_size > 0 {
            if self.resize_short_size == 0 {
                return Err(SettingsError::ZeroResizeShort);
            }
            // The eval chain center-crops after the short-side resize; the
            // crop must fit the resized image.
            if self.crop_size > self.resize_short_size {
                return Err(SettingsError::CropExceedsResize {
                    crop_size: self.crop_size,
                    resize_short_size: self.resize_short_size,
                });
            }
        }
        Ok(())
    }
}
