//! Structural Similarity Index over small grayscale thumbnails (spec.md
//! §4.5 step 4). Grounded in `screensearch-capture::frame_diff::FrameDiffer`
//! (the pack's only SSIM implementation), adapted from RGBA frames to the
//! 8-bit grayscale thumbnails the sampler already produces, and returning
//! the similarity score directly rather than `1 - similarity`.

use image::GrayImage;

const WINDOW: u32 = 8;
const K1: f32 = 0.01;
const K2: f32 = 0.03;
const DYNAMIC_RANGE: f32 = 255.0;

/// Mean SSIM over non-overlapping 8x8 windows. Returns `1.0` for
/// identically-sized all-uniform images and falls back to a normalised
/// pixel-difference score if the thumbnail is smaller than one window.
pub fn ssim(a: &GrayImage, b: &GrayImage) -> f32 {
    if a.dimensions() != b.dimensions() {
        return 0.0;
    }
    let (width, height) = a.dimensions();
    if width < WINDOW || height < WINDOW {
        return pixel_similarity(a, b);
    }

    let c1 = (K1 * DYNAMIC_RANGE) * (K1 * DYNAMIC_RANGE);
    let c2 = (K2 * DYNAMIC_RANGE) * (K2 * DYNAMIC_RANGE);

    let mut sum = 0.0f64;
    let mut windows = 0u32;
    for y in (0..height - WINDOW + 1).step_by(WINDOW as usize) {
        for x in (0..width - WINDOW + 1).step_by(WINDOW as usize) {
            sum += window_ssim(a, b, x, y, c1, c2) as f64;
            windows += 1;
        }
    }

    if windows == 0 {
        1.0
    } else {
        (sum / windows as f64) as f32
    }
}

fn window_ssim(a: &GrayImage, b: &GrayImage, x0: u32, y0: u32, c1: f32, c2: f32) -> f32 {
    let count = (WINDOW * WINDOW) as f32;
    let (mut sum_a, mut sum_b, mut sum_aa, mut sum_bb, mut sum_ab) = (0.0f32, 0.0, 0.0, 0.0, 0.0);

    for dy in 0..WINDOW {
        for dx in 0..WINDOW {
            let pa = a.get_pixel(x0 + dx, y0 + dy)[0] as f32;
            let pb = b.get_pixel(x0 + dx, y0 + dy)[0] as f32;
            sum_a += pa;
            sum_b += pb;
            sum_aa += pa * pa;
            sum_bb += pb * pb;
            sum_ab += pa * pb;
        }
    }

    let mean_a = sum_a / count;
    let mean_b = sum_b / count;
    let var_a = sum_aa / count - mean_a * mean_a;
    let var_b = sum_bb / count - mean_b * mean_b;
    let covar = sum_ab / count - mean_a * mean_b;

    let numerator = (2.0 * mean_a * mean_b + c1) * (2.0 * covar + c2);
    let denominator = (mean_a * mean_a + mean_b * mean_b + c1) * (var_a + var_b + c2);

    if denominator == 0.0 {
        1.0
    } else {
        numerator / denominator
    }
}

fn pixel_similarity(a: &GrayImage, b: &GrayImage) -> f32 {
    let total = a.pixels().len().max(1) as f32;
    let matching = a
        .pixels()
        .zip(b.pixels())
        .filter(|(pa, pb)| pa == pb)
        .count() as f32;
    matching / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn identical_images_have_ssim_near_one() {
        let img = GrayImage::from_fn(32, 24, |x, y| Luma([((x * 7 + y * 3) % 255) as u8]));
        assert!(ssim(&img, &img) > 0.99);
    }

    #[test]
    fn very_different_images_have_low_ssim() {
        let a = GrayImage::from_pixel(32, 24, Luma([0]));
        let b = GrayImage::from_pixel(32, 24, Luma([255]));
        assert!(ssim(&a, &b) < 0.5);
    }
}
