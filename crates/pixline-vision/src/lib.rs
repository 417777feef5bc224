#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

//! Geometric and photometric transforms for image-classification reading.
//!
//! All functions are pure over [`image::RgbImage`] inputs; every sampled
//! parameter comes from an explicit caller-supplied RNG, so the same seed
//! reproduces the same augmentation regardless of where the call runs.

pub mod color;
pub mod geometry;

pub use color::{color_jitter, normalize, IMAGENET_MEAN, IMAGENET_STD};
pub use geometry::{crop, horizontal_flip, random_resized_crop, resize_short_side, rotate};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("image has zero width or height")]
    EmptyImage,
    #[error("crop size {size} exceeds image bounds {height}x{width}")]
    CropTooLarge {
        size: u32,
        height: u32,
        width: u32,
    },
    #[error("target size must be > 0")]
    ZeroTarget,
}
