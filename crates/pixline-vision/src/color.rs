use image::RgbImage;

use pixline_core::types::{ImageTensor, TensorShapeError};

/// Per-channel ImageNet RGB statistics.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Photometric distortion slot in the train chain.
///
/// Deliberately the identity: the upstream pipeline ships this hook disabled,
/// and it is kept as an explicit no-op so the chain has a stable place for a
/// real jitter later.
pub fn color_jitter(img: RgbImage) -> RgbImage {
    img
}

/// Convert an 8-bit RGB image to a normalized float tensor.
///
/// Output is `[3, H, W]` channel-first: pixels scaled to `[0, 1]`, then
/// per-channel mean subtracted and std divided.
pub fn normalize(
    img: &RgbImage,
    mean: [f32; 3],
    std: [f32; 3],
) -> Result<ImageTensor, TensorShapeError> {
    let (w, h) = img.dimensions();
    let npix = (w as usize) * (h as usize);
    let raw = img.as_raw();
    let mut data = vec![0.0f32; 3 * npix];
    for (c, plane) in data.chunks_exact_mut(npix).enumerate() {
        let (m, s) = (mean[c], std[c]);
        for (i, out) in plane.iter_mut().enumerate() {
            *out = (raw[i * 3 + c] as f32 / 255.0 - m) / s;
        }
    }
    ImageTensor::new(h as usize, w as usize, data)
}
