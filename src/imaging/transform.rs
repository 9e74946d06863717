//! Photometric transforms applied to tile rasters before recognition.
//!
//! Every function here is pure: it borrows a raster and returns a new one.

use image::{GrayImage, ImageBuffer, Luma, RgbaImage};
use serde::{Deserialize, Serialize};

/// Parameters for local adaptive thresholding.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveParams {
    /// Side length of the square neighbourhood (odd; 15 means +-7)
    pub block_size: u32,
    /// Offset subtracted from the neighbourhood mean
    pub c: f64,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            block_size: 15,
            c: 10.0,
        }
    }
}

/// Parameters for the contrast-stretch / invert enhancement.
///
/// `boost` and `attenuation` are empirical constants; keep them tunable
/// rather than baked in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastParams {
    /// Pivot between the attenuated and the stretched range
    pub threshold: u8,
    /// Extra gain applied to values above the threshold
    pub boost: f64,
    /// Extra damping applied to values at or below the threshold
    pub attenuation: f64,
}

impl Default for ContrastParams {
    fn default() -> Self {
        Self {
            threshold: 80,
            boost: 1.1,
            attenuation: 0.5,
        }
    }
}

/// Converts RGBA to grayscale with the BT.601 luma weights, rounded.
pub fn grayscale(img: &RgbaImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        output.put_pixel(x, y, Luma([luma(pixel[0], pixel[1], pixel[2])]));
    }

    output
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let value = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
    value.round().clamp(0.0, 255.0) as u8
}

/// Builds the 256-bin intensity histogram of a grayscale raster.
pub fn histogram(gray: &GrayImage) -> [u64; 256] {
    let mut bins = [0u64; 256];
    for pixel in gray.pixels() {
        bins[pixel[0] as usize] += 1;
    }
    bins
}

/// Computes the Otsu threshold from a histogram.
///
/// Scans thresholds in ascending order and keeps the first one that
/// maximises the between-class variance `wB * wF * (mB - mF)^2`.
pub fn otsu_threshold(bins: &[u64; 256]) -> u8 {
    let total: u64 = bins.iter().sum();
    if total == 0 {
        return 0;
    }

    let sum_total: f64 = bins
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0f64;
    let mut weight_background = 0u64;
    let mut max_variance = 0.0f64;
    let mut best = 0u8;

    for (t, &count) in bins.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if variance > max_variance {
            max_variance = variance;
            best = t as u8;
        }
    }

    best
}

/// Global binarization at the Otsu threshold: above -> 255, else 0.
pub fn binarize_otsu(gray: &GrayImage) -> GrayImage {
    let threshold = otsu_threshold(&histogram(gray));
    tracing::trace!(threshold, "Otsu threshold computed");

    let (width, height) = gray.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Luma([if v > threshold { 255 } else { 0 }])
    })
}

/// Local mean thresholding.
///
/// A pixel is foreground (0) when it is darker than the mean of its
/// in-bounds neighbourhood minus `c`, background (255) otherwise.
pub fn adaptive_threshold(gray: &GrayImage, params: &AdaptiveParams) -> GrayImage {
    let (width, height) = gray.dimensions();
    let radius = params.block_size / 2;
    let integral = integral_image(gray);

    ImageBuffer::from_fn(width, height, |x, y| {
        let mean = region_mean(&integral, width, height, x, y, radius);
        let v = gray.get_pixel(x, y)[0] as f64;
        Luma([if v < mean - params.c { 0 } else { 255 }])
    })
}

/// Summed-area table with a zero row/column border:
/// `table[y * (w + 1) + x]` holds the sum over `[0, x) x [0, y)`.
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y)[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

fn region_mean(integral: &[u64], width: u32, height: u32, cx: u32, cy: u32, radius: u32) -> f64 {
    let stride = (width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = (cx as usize + radius as usize + 1).min(width as usize);
    let y2 = (cy as usize + radius as usize + 1).min(height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    let sum = integral[y2 * stride + x2] as f64 - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

/// Contrast stretch, invert, then piecewise stretch around `params.threshold`.
///
/// Light-on-dark tiles become dark-on-light with thin strokes pushed
/// toward the extremes. Favours recall of faint glyph strokes over
/// background suppression.
pub fn enhance_contrast(gray: &GrayImage, params: &ContrastParams) -> GrayImage {
    let (width, height) = gray.dimensions();

    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    let range = max.saturating_sub(min) as f64;

    let threshold = params.threshold as f64;
    let stretch = 255.0 / (255.0 - threshold);

    ImageBuffer::from_fn(width, height, |x, y| {
        let v = gray.get_pixel(x, y)[0] as f64;
        let stretched = if range > 0.0 {
            ((v - min as f64) * 255.0 / range).round()
        } else {
            0.0
        };
        let inverted = 255.0 - stretched;

        let out = if inverted > threshold {
            ((inverted - threshold) * stretch * params.boost).min(255.0)
        } else {
            inverted * (threshold / 255.0) * params.attenuation
        };

        Luma([out.round().clamp(0.0, 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_grayscale_weights() {
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        img.put_pixel(2, 0, Rgba([10, 20, 30, 255]));

        let gray = grayscale(&img);
        assert_eq!(gray.get_pixel(0, 0)[0], 76); // 76.245
        assert_eq!(gray.get_pixel(1, 0)[0], 150); // 149.685
        assert_eq!(gray.get_pixel(2, 0)[0], 18); // 2.99 + 11.74 + 3.42 = 18.15
    }

    #[test]
    fn test_otsu_bimodal() {
        let mut bins = [0u64; 256];
        bins[20] = 100;
        bins[200] = 100;
        let t = otsu_threshold(&bins);
        assert!((20..200).contains(&t), "threshold {} should split the modes", t);
        // First maximum wins: every t in 20..200 gives the same variance.
        assert_eq!(t, 20);
    }

    #[test]
    fn test_otsu_is_deterministic() {
        let gray = GrayImage::from_fn(37, 23, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]));
        let bins = histogram(&gray);
        let first = otsu_threshold(&bins);
        for _ in 0..5 {
            assert_eq!(otsu_threshold(&histogram(&gray)), first);
        }
    }

    #[test]
    fn test_otsu_empty_and_flat() {
        assert_eq!(otsu_threshold(&[0u64; 256]), 0);
        let mut bins = [0u64; 256];
        bins[128] = 50;
        assert_eq!(otsu_threshold(&bins), 0);
    }

    #[test]
    fn test_binarize_otsu_splits_dark_and_light() {
        let gray = GrayImage::from_fn(4, 1, |x, _| Luma([if x < 2 { 30 } else { 220 }]));
        let bin = binarize_otsu(&gray);
        assert_eq!(bin.get_pixel(0, 0)[0], 0);
        assert_eq!(bin.get_pixel(3, 0)[0], 255);
    }

    #[test]
    fn test_adaptive_threshold_marks_dark_stroke() {
        // Light background with a single dark column.
        let gray = GrayImage::from_fn(15, 15, |x, _| Luma([if x == 7 { 40 } else { 200 }]));
        let out = adaptive_threshold(&gray, &AdaptiveParams::default());
        assert_eq!(out.get_pixel(7, 7)[0], 0);
        assert_eq!(out.get_pixel(2, 7)[0], 255);
    }

    #[test]
    fn test_adaptive_threshold_uniform_is_background() {
        let gray = GrayImage::from_pixel(10, 10, Luma([90]));
        let out = adaptive_threshold(&gray, &AdaptiveParams::default());
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_adaptive_threshold_border_uses_in_bounds_mean() {
        // Every window covers the whole 3x3 raster: mean (8 * 200 + 60) / 9 = 184.4
        let gray = GrayImage::from_fn(3, 3, |x, y| Luma([if (x, y) == (1, 1) { 60 } else { 200 }]));
        let out = adaptive_threshold(&gray, &AdaptiveParams::default());
        assert_eq!(out.get_pixel(1, 1)[0], 0);
        assert_eq!(out.get_pixel(0, 0)[0], 255);
        assert_eq!(out.get_pixel(2, 1)[0], 255);
    }

    #[test]
    fn test_region_mean_matches_brute_force() {
        let gray = GrayImage::from_fn(20, 17, |x, y| Luma([((x * 11 + y * 29) % 256) as u8]));
        let (w, h) = gray.dimensions();
        let integral = integral_image(&gray);
        let radius = 7;

        for (cx, cy) in [(0u32, 0u32), (19, 0), (0, 16), (19, 16), (3, 9), (10, 8)] {
            let xs = cx.saturating_sub(radius)..(cx + radius + 1).min(w);
            let ys = cy.saturating_sub(radius)..(cy + radius + 1).min(h);
            let mut sum = 0u64;
            let mut count = 0u64;
            for y in ys {
                for x in xs.clone() {
                    sum += gray.get_pixel(x, y)[0] as u64;
                    count += 1;
                }
            }
            let expected = sum as f64 / count as f64;
            let mean = region_mean(&integral, w, h, cx, cy, radius);
            assert!((mean - expected).abs() < 1e-9, "({}, {}): {} vs {}", cx, cy, mean, expected);
        }
    }

    #[test]
    fn test_enhance_contrast_inverts_light_on_dark() {
        // Dark tile background (10) with light glyph pixels (240).
        let gray = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 10 } else { 240 }]));
        let out = enhance_contrast(&gray, &ContrastParams::default());

        // Background: stretched 0 -> inverted 255 -> (175 * 255/175 * 1.1) clamped.
        assert_eq!(out.get_pixel(0, 0)[0], 255);
        // Glyph: stretched 255 -> inverted 0 -> attenuated 0.
        assert_eq!(out.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn test_enhance_contrast_piecewise_midtones() {
        // min 0, max 255 so stretching is the identity.
        let gray = GrayImage::from_fn(4, 1, |x, _| Luma([[0, 255, 155, 215][x as usize]]));
        let out = enhance_contrast(&gray, &ContrastParams::default());

        // 155 -> inverted 100 -> (20 * 255/175 * 1.1) = 32.06
        assert_eq!(out.get_pixel(2, 0)[0], 32);
        // 215 -> inverted 40 -> 40 * 80/255 * 0.5 = 6.27
        assert_eq!(out.get_pixel(3, 0)[0], 6);
    }

    #[test]
    fn test_enhance_contrast_flat_raster() {
        let gray = GrayImage::from_pixel(3, 3, Luma([77]));
        let out = enhance_contrast(&gray, &ContrastParams::default());
        assert!(out.pixels().all(|p| p[0] == 255));
    }
}
