use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dataset split. Selects the transform chain and the produced item shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Train,
    Val,
    Test,
}

impl Mode {
    /// Manifest file name under the data root for this split.
    ///
    /// The test split reads the validation manifest, matching the dataset
    /// layout this reader was built for.
    pub fn manifest_name(&self) -> &'static str {
        match self {
            Mode::Train => "train_list.txt",
            Mode::Val | Mode::Test => "val_list.txt",
        }
    }

    /// Whether produced items carry a label.
    pub fn has_label(&self) -> bool {
        !matches!(self, Mode::Test)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown mode {0:?} (expected train, val or test)")]
pub struct ModeParseError(pub String);

impl FromStr for Mode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(Mode::Train),
            "val" => Ok(Mode::Val),
            "test" => Ok(Mode::Test),
            other => Err(ModeParseError(other.to_string())),
        }
    }
}

/// One dataset record as enumerated from the manifest.
///
/// `path` is relative to the configured data root. `label` is `None` only for
/// the test split, which discards the on-disk label field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub path: String,
    pub label: Option<i64>,
}

pub const CHANNELS: usize = 3;

/// A normalized sample image in channel-first layout.
///
/// Invariants:
/// - `data.len() == 3 * height * width`
/// - layout is `[C, H, W]`, row-major within each channel
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    height: usize,
    width: usize,
    data: Vec<f32>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TensorShapeError {
    #[error("data length {len} does not match 3x{height}x{width}")]
    LengthMismatch {
        len: usize,
        height: usize,
        width: usize,
    },
    #[error("tensor shapes differ: {a_height}x{a_width} vs {b_height}x{b_width}")]
    ShapeMismatch {
        a_height: usize,
        a_width: usize,
        b_height: usize,
        b_width: usize,
    },
}

impl ImageTensor {
    pub fn new(height: usize, width: usize, data: Vec<f32>) -> Result<Self, TensorShapeError> {
        if data.len() != CHANNELS * height * width {
            return Err(TensorShapeError::LengthMismatch {
                len: data.len(),
                height,
                width,
            });
        }
        Ok(Self {
            height,
            width,
            data,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Value at (channel, row, column).
    pub fn get(&self, c: usize, y: usize, x: usize) -> f32 {
        self.data[c * self.height * self.width + y * self.width + x]
    }

    /// Elementwise `lam * self + (1 - lam) * other`.
    pub fn mixed_with(&self, other: &Self, lam: f32) -> Result<Self, TensorShapeError> {
        if self.height != other.height || self.width != other.width {
            return Err(TensorShapeError::ShapeMismatch {
                a_height: self.height,
                a_width: self.width,
                b_height: other.height,
                b_width: other.width,
            });
        }
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| lam * a + (1.0 - lam) * b)
            .collect();
        Ok(Self {
            height: self.height,
            width: self.width,
            data,
        })
    }
}

/// A decoded, normalized sample ready for batching.
#[derive(Debug, Clone)]
pub struct DecodedSample {
    pub image: ImageTensor,
    pub label: Option<i64>,
}

/// A mixup-augmented sample.
///
/// Consumers compute the loss against both labels, weighted by `lam` and
/// `1 - lam`. One coefficient is shared by every sample of a batch.
#[derive(Debug, Clone)]
pub struct MixedSample {
    pub image: ImageTensor,
    pub label_a: i64,
    pub label_b: i64,
    pub lam: f32,
}
