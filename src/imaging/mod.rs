pub mod preprocess;
pub mod regions;
pub mod transform;

pub use preprocess::{crop_tile, plan_scaling, prepare_tile, PreprocessConfig, Scaling, TransformKind};
pub use regions::{detect_regions, sort_reading_order, TileRegion, DEFAULT_COLS, DEFAULT_ROWS};
pub use transform::{
    adaptive_threshold, binarize_otsu, enhance_contrast, grayscale, histogram, otsu_threshold,
    AdaptiveParams, ContrastParams,
};
