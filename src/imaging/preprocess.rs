//! Crop, scale normalization and photometric transform of single tiles.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

use super::regions::TileRegion;
use super::transform::{
    adaptive_threshold, binarize_otsu, enhance_contrast, grayscale, AdaptiveParams, ContrastParams,
};
use crate::debug::ArtifactLog;

/// Photometric transform a recognition strategy applies to its tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    ContrastEnhance,
    BinaryOtsu,
    AdaptiveThreshold,
    PassThrough,
}

impl TransformKind {
    /// Short label used in debug step names (`preprocessed-<label>`).
    pub fn label(&self) -> &'static str {
        match self {
            TransformKind::ContrastEnhance => "contrast",
            TransformKind::BinaryOtsu => "otsu",
            TransformKind::AdaptiveThreshold => "adaptive",
            TransformKind::PassThrough => "raw",
        }
    }
}

/// Crop and scale limits for tile preparation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Pixels trimmed from each side of a region to drop bleed from neighbours
    pub inset: u32,
    /// Crops whose smaller side is below this are upscaled
    pub min_size: u32,
    /// Crops whose larger side exceeds this are downscaled
    pub max_size: u32,
    /// Larger side after downscaling
    pub target_size: u32,
    /// Upper bound on the upscale factor
    pub max_upscale: f64,
    pub adaptive: AdaptiveParams,
    pub contrast: ContrastParams,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            inset: 1,
            min_size: 150,
            max_size: 300,
            target_size: 250,
            max_upscale: 5.0,
            adaptive: AdaptiveParams::default(),
            contrast: ContrastParams::default(),
        }
    }
}

/// Crops `region` from `img` with the configured inset, clamped to bounds.
///
/// Returns `None` when nothing of the region lies inside the raster.
pub fn crop_tile(img: &RgbaImage, region: &TileRegion, inset: u32) -> Option<RgbaImage> {
    let (w, h) = img.dimensions();

    let bounds = |inset: u32| {
        let x0 = region.x.saturating_add(inset).min(w);
        let y0 = region.y.saturating_add(inset).min(h);
        let x1 = region
            .x
            .saturating_add(region.width)
            .saturating_sub(inset)
            .min(w);
        let y1 = region
            .y
            .saturating_add(region.height)
            .saturating_sub(inset)
            .min(h);
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1 - x0, y1 - y0))
    };

    // Regions too small to survive the inset are taken whole.
    let (x, y, cw, ch) = bounds(inset).or_else(|| bounds(0))?;
    Some(imageops::crop_imm(img, x, y, cw, ch).to_image())
}

/// Scale decision for one crop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scaling {
    Up { width: u32, height: u32 },
    Down { width: u32, height: u32 },
    Unchanged,
}

impl Scaling {
    pub fn step(&self) -> &'static str {
        match self {
            Scaling::Up { .. } => "scaled-up",
            Scaling::Down { .. } => "scaled-down",
            Scaling::Unchanged => "no-scaling",
        }
    }
}

/// Decides how a `width` x `height` crop should be rescaled.
pub fn plan_scaling(width: u32, height: u32, config: &PreprocessConfig) -> Scaling {
    let smaller = width.min(height);
    let larger = width.max(height);
    if smaller == 0 {
        return Scaling::Unchanged;
    }

    if smaller < config.min_size {
        let factor = (config.min_size as f64 / smaller as f64).min(config.max_upscale);
        return Scaling::Up {
            width: ((width as f64 * factor).round() as u32).max(1),
            height: ((height as f64 * factor).round() as u32).max(1),
        };
    }

    if larger > config.max_size {
        let factor = config.target_size as f64 / larger as f64;
        return Scaling::Down {
            width: ((width as f64 * factor).round() as u32).max(1),
            height: ((height as f64 * factor).round() as u32).max(1),
        };
    }

    Scaling::Unchanged
}

/// Prepares one tile for one strategy: inset crop, scale normalization,
/// then the photometric transform.
///
/// Upscaling is nearest-neighbour to keep glyph edges hard; downscaling is
/// smoothed to avoid aliasing. Intermediate stages go to `artifacts` when it
/// is enabled.
pub fn prepare_tile(
    img: &RgbaImage,
    region: &TileRegion,
    kind: TransformKind,
    config: &PreprocessConfig,
    tile_index: usize,
    artifacts: &mut ArtifactLog,
) -> Option<DynamicImage> {
    let cropped = crop_tile(img, region, config.inset)?;
    let (cw, ch) = cropped.dimensions();
    artifacts.record(tile_index, "original-region", || {
        (
            DynamicImage::ImageRgba8(cropped.clone()),
            format!("{}x{} crop at ({}, {})", cw, ch, region.x, region.y),
        )
    });

    let scaling = plan_scaling(cw, ch, config);
    let scaled = match scaling {
        Scaling::Up { width, height } => {
            imageops::resize(&cropped, width, height, FilterType::Nearest)
        }
        Scaling::Down { width, height } => {
            imageops::resize(&cropped, width, height, FilterType::Lanczos3)
        }
        Scaling::Unchanged => cropped,
    };
    let (sw, sh) = scaled.dimensions();
    artifacts.record(tile_index, scaling.step(), || {
        (
            DynamicImage::ImageRgba8(scaled.clone()),
            format!("{}x{} -> {}x{}", cw, ch, sw, sh),
        )
    });

    let prepared = match kind {
        TransformKind::ContrastEnhance => {
            DynamicImage::ImageLuma8(enhance_contrast(&grayscale(&scaled), &config.contrast))
        }
        TransformKind::BinaryOtsu => DynamicImage::ImageLuma8(binarize_otsu(&grayscale(&scaled))),
        TransformKind::AdaptiveThreshold => {
            DynamicImage::ImageLuma8(adaptive_threshold(&grayscale(&scaled), &config.adaptive))
        }
        TransformKind::PassThrough => DynamicImage::ImageRgba8(scaled),
    };
    artifacts.record(tile_index, &format!("preprocessed-{}", kind.label()), || {
        (prepared.clone(), format!("{:?} transform applied", kind))
    });

    Some(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_crop_tile_applies_inset() {
        let img: RgbaImage = RgbaImage::from_fn(100, 100, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let region = TileRegion::new(50, 0, 50, 50);
        let cropped = crop_tile(&img, &region, 1).unwrap();

        assert_eq!(cropped.dimensions(), (48, 48));
        assert_eq!(cropped.get_pixel(0, 0)[0], 51);
        assert_eq!(cropped.get_pixel(0, 0)[1], 1);
    }

    #[test]
    fn test_crop_tile_clamps_to_bounds() {
        let img = RgbaImage::new(100, 100);
        let region = TileRegion::new(80, 80, 50, 50);
        let cropped = crop_tile(&img, &region, 1).unwrap();
        assert_eq!(cropped.dimensions(), (19, 19));
    }

    #[test]
    fn test_crop_tile_outside_raster() {
        let img = RgbaImage::new(10, 10);
        assert!(crop_tile(&img, &TileRegion::new(20, 20, 5, 5), 1).is_none());
    }

    #[test]
    fn test_crop_tile_too_small_for_inset() {
        let img = RgbaImage::new(10, 10);
        let cropped = crop_tile(&img, &TileRegion::new(0, 0, 2, 2), 1).unwrap();
        assert_eq!(cropped.dimensions(), (2, 2));
    }

    #[test]
    fn test_plan_scaling_upscale_capped() {
        let config = PreprocessConfig::default();
        // 150 / 20 = 7.5, capped at 5
        assert_eq!(
            plan_scaling(20, 40, &config),
            Scaling::Up { width: 100, height: 200 }
        );
        // 150 / 100 = 1.5
        assert_eq!(
            plan_scaling(100, 120, &config),
            Scaling::Up { width: 150, height: 180 }
        );
    }

    #[test]
    fn test_plan_scaling_downscale_and_unchanged() {
        let config = PreprocessConfig::default();
        assert_eq!(
            plan_scaling(500, 200, &config),
            Scaling::Down { width: 250, height: 100 }
        );
        assert_eq!(plan_scaling(200, 250, &config), Scaling::Unchanged);
    }

    #[test]
    fn test_prepare_tile_records_steps() {
        let img = RgbaImage::from_pixel(200, 200, Rgba([20, 20, 20, 255]));
        let region = TileRegion::new(0, 0, 100, 100);
        let mut artifacts = ArtifactLog::enabled();

        let prepared = prepare_tile(
            &img,
            &region,
            TransformKind::BinaryOtsu,
            &PreprocessConfig::default(),
            3,
            &mut artifacts,
        )
        .unwrap();

        // 98x98 crop upscaled by 150/98
        assert_eq!((prepared.width(), prepared.height()), (150, 150));
        let steps: Vec<&str> = artifacts.items().iter().map(|a| a.step.as_str()).collect();
        assert_eq!(steps, vec!["original-region", "scaled-up", "preprocessed-otsu"]);
        assert!(artifacts.items().iter().all(|a| a.tile_index == 3));
    }

    #[test]
    fn test_prepare_tile_pass_through_keeps_color() {
        let img = RgbaImage::from_pixel(200, 200, Rgba([200, 10, 10, 255]));
        let region = TileRegion::new(0, 0, 200, 200);
        let mut artifacts = ArtifactLog::disabled();

        let prepared = prepare_tile(
            &img,
            &region,
            TransformKind::PassThrough,
            &PreprocessConfig::default(),
            0,
            &mut artifacts,
        )
        .unwrap();

        assert!(matches!(prepared, DynamicImage::ImageRgba8(_)));
        assert_eq!((prepared.width(), prepared.height()), (198, 198));
        assert!(artifacts.items().is_empty());
    }
}
