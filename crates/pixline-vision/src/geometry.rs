use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use rand::Rng;

use crate::TransformError;

/// Rotate about the image center by an integer angle drawn uniformly from
/// `[-max_abs_degrees, +max_abs_degrees]`, inclusive on both ends.
///
/// The output keeps the input dimensions; corners uncovered by the rotation
/// are filled black.
pub fn rotate<R: Rng + ?Sized>(
    img: &RgbImage,
    rng: &mut R,
    max_abs_degrees: u32,
) -> Result<RgbImage, TransformError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(TransformError::EmptyImage);
    }
    let max = max_abs_degrees as i32;
    let degrees = rng.gen_range(-max..=max);
    let theta = (degrees as f32).to_radians();
    Ok(rotate_about_center(
        img,
        theta,
        Interpolation::Bilinear,
        Rgb([0, 0, 0]),
    ))
}

/// Crop a random region with jittered area and aspect ratio, then resize it
/// to `target_size x target_size`.
///
/// The aspect ratio is drawn as `sqrt(uniform(ratio))`; the sampled area
/// fraction is capped by a bound derived from the image's own aspect ratio so
/// the crop always fits inside the image. Crop dimensions truncate to
/// integers and the origin is sampled uniformly over the valid range, so
/// `0 <= origin <= dim - crop_dim` always holds.
pub fn random_resized_crop<R: Rng + ?Sized>(
    img: &RgbImage,
    rng: &mut R,
    target_size: u32,
    scale: (f64, f64),
    ratio: (f64, f64),
) -> Result<RgbImage, TransformError> {
    if target_size == 0 {
        return Err(TransformError::ZeroTarget);
    }
    let (img_w, img_h) = img.dimensions();
    if img_w == 0 || img_h == 0 {
        return Err(TransformError::EmptyImage);
    }
    let (w, h) = (img_w as f64, img_h as f64);

    let aspect = rng.gen_range(ratio.0..=ratio.1).sqrt();
    let w_unit = aspect;
    let h_unit = 1.0 / aspect;

    // Largest area fraction whose crop still fits the image at this aspect.
    let bound = ((h / w) / (h_unit * h_unit)).min((w / h) / (w_unit * w_unit));
    let scale_max = scale.1.min(bound);
    let scale_min = scale.0.min(bound);

    let target_area = h * w * rng.gen_range(scale_min..=scale_max);
    let side = target_area.sqrt();
    let crop_w = ((side * w_unit) as u32).clamp(1, img_w);
    let crop_h = ((side * h_unit) as u32).clamp(1, img_h);

    let y = rng.gen_range(0..=img_h - crop_h);
    let x = rng.gen_range(0..=img_w - crop_w);

    let cropped = imageops::crop_imm(img, x, y, crop_w, crop_h).to_image();
    Ok(imageops::resize(
        &cropped,
        target_size,
        target_size,
        FilterType::Triangle,
    ))
}

/// Scale so the shorter side equals `target`; the longer side is scaled by
/// the same ratio, rounded to nearest.
pub fn resize_short_side(img: &RgbImage, target: u32) -> Result<RgbImage, TransformError> {
    if target == 0 {
        return Err(TransformError::ZeroTarget);
    }
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(TransformError::EmptyImage);
    }
    let percent = target as f64 / w.min(h) as f64;
    let new_w = ((w as f64 * percent).round() as u32).max(1);
    let new_h = ((h as f64 * percent).round() as u32).max(1);
    Ok(imageops::resize(img, new_w, new_h, FilterType::Triangle))
}

/// Square crop of `size x size`. Centered crops use floor-division offsets;
/// random crops sample the origin uniformly over `0..=dim - size`.
pub fn crop<R: Rng + ?Sized>(
    img: &RgbImage,
    size: u32,
    centered: bool,
    rng: &mut R,
) -> Result<RgbImage, TransformError> {
    let (w, h) = img.dimensions();
    if size == 0 {
        return Err(TransformError::ZeroTarget);
    }
    if size > w.min(h) {
        return Err(TransformError::CropTooLarge {
            size,
            height: h,
            width: w,
        });
    }
    let (x, y) = if centered {
        ((w - size) / 2, (h - size) / 2)
    } else {
        (rng.gen_range(0..=w - size), rng.gen_range(0..=h - size))
    };
    Ok(imageops::crop_imm(img, x, y, size, size).to_image())
}

/// Reverse the width axis.
pub fn horizontal_flip(img: &RgbImage) -> RgbImage {
    imageops::flip_horizontal(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Gradient image: pixel value encodes its (x, y) position.
    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, 0]))
    }

    #[test]
    fn center_crop_offsets_are_floor_halved() {
        let img = gradient(11, 7);
        let mut rng = StdRng::seed_from_u64(0);
        let out = crop(&img, 5, true, &mut rng).unwrap();
        assert_eq!(out.dimensions(), (5, 5));
        // Expected origin: ((11-5)/2, (7-5)/2) = (3, 1).
        assert_eq!(out.get_pixel(0, 0), &Rgb([3, 1, 0]));
        assert_eq!(out.get_pixel(4, 4), &Rgb([7, 5, 0]));
    }

    #[test]
    fn random_crop_stays_in_bounds() {
        let img = gradient(16, 9);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let out = crop(&img, 8, false, &mut rng).unwrap();
            assert_eq!(out.dimensions(), (8, 8));
            let Rgb([x0, y0, _]) = *out.get_pixel(0, 0);
            assert!(x0 <= 8 && y0 <= 1);
        }
    }

    #[test]
    fn crop_rejects_oversized_request() {
        let img = gradient(4, 4);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            crop(&img, 5, true, &mut rng).unwrap_err(),
            TransformError::CropTooLarge {
                size: 5,
                height: 4,
                width: 4
            }
        );
    }

    #[test]
    fn resize_short_side_hits_target_and_keeps_aspect() {
        let img = gradient(200, 100);
        let out = resize_short_side(&img, 50).unwrap();
        let (w, h) = out.dimensions();
        assert_eq!(w.min(h), 50);
        assert_eq!((w, h), (100, 50));

        let tall = gradient(30, 90);
        let out = resize_short_side(&tall, 60).unwrap();
        assert_eq!(out.dimensions(), (60, 180));
    }

    #[test]
    fn horizontal_flip_reverses_width_only() {
        let img = gradient(4, 2);
        let out = horizontal_flip(&img);
        assert_eq!(out.get_pixel(0, 0), &Rgb([3, 0, 0]));
        assert_eq!(out.get_pixel(3, 1), &Rgb([0, 1, 0]));
    }

    #[test]
    fn rotate_keeps_dimensions() {
        let img = gradient(9, 5);
        let mut rng = StdRng::seed_from_u64(1);
        let out = rotate(&img, &mut rng, 10).unwrap();
        assert_eq!(out.dimensions(), (9, 5));
    }

    #[test]
    fn rotate_zero_range_is_identity() {
        let img = gradient(6, 6);
        let mut rng = StdRng::seed_from_u64(1);
        let out = rotate(&img, &mut rng, 0).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn random_resized_crop_produces_target_square() {
        let img = gradient(64, 48);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let out =
                random_resized_crop(&img, &mut rng, 24, (0.08, 1.0), (0.75, 4.0 / 3.0)).unwrap();
            assert_eq!(out.dimensions(), (24, 24));
        }
    }

    #[test]
    fn random_resized_crop_handles_tiny_images() {
        let img = gradient(3, 2);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let out =
                random_resized_crop(&img, &mut rng, 8, (0.08, 1.0), (0.75, 4.0 / 3.0)).unwrap();
            assert_eq!(out.dimensions(), (8, 8));
        }
    }

    #[test]
    fn random_resized_crop_is_seed_deterministic() {
        let img = gradient(40, 40);
        let mut a = StdRng::seed_from_u64(3);
        let mut b = StdRng::seed_from_u64(3);
        let out_a = random_resized_crop(&img, &mut a, 16, (0.08, 1.0), (0.75, 4.0 / 3.0)).unwrap();
        let out_b = random_resized_crop(&img, &mut b, 16, (0.08, 1.0), (0.75, 4.0 / 3.0)).unwrap();
        assert_eq!(out_a, out_b);
    }
}
