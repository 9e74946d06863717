use super::engine::{EngineParams, SegmentationMode};
use crate::imaging::TransformKind;

/// A named combination of preprocessing and engine parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognitionStrategy {
    pub id: &'static str,
    pub transform: TransformKind,
    pub segmentation: SegmentationMode,
    /// Candidates scoring below this are discarded for this strategy
    pub min_confidence: f32,
}

impl RecognitionStrategy {
    pub const fn new(
        id: &'static str,
        transform: TransformKind,
        segmentation: SegmentationMode,
        min_confidence: f32,
    ) -> Self {
        Self {
            id,
            transform,
            segmentation,
            min_confidence,
        }
    }

    /// Engine parameters for this strategy.
    pub fn params(&self, language: &str) -> EngineParams {
        EngineParams::new(self.segmentation).with_language(language)
    }
}

/// Strategies in the order they are tried, most reliable first.
///
/// Tiles are light glyphs on dark tiles, so the inverting contrast
/// enhancement with single-word segmentation resolves most of a board on
/// the first pass; later entries exist for tiles it reads poorly.
pub const STRATEGY_CATALOG: &[RecognitionStrategy] = &[
    RecognitionStrategy::new(
        "contrast-word",
        TransformKind::ContrastEnhance,
        SegmentationMode::SingleWord,
        0.0,
    ),
    RecognitionStrategy::new(
        "otsu-word",
        TransformKind::BinaryOtsu,
        SegmentationMode::SingleWord,
        0.0,
    ),
    RecognitionStrategy::new(
        "adaptive-word",
        TransformKind::AdaptiveThreshold,
        SegmentationMode::SingleWord,
        10.0,
    ),
    RecognitionStrategy::new(
        "contrast-line",
        TransformKind::ContrastEnhance,
        SegmentationMode::SingleLine,
        10.0,
    ),
    RecognitionStrategy::new(
        "raw-sparse",
        TransformKind::PassThrough,
        SegmentationMode::SparseText,
        20.0,
    ),
    RecognitionStrategy::new(
        "otsu-block",
        TransformKind::BinaryOtsu,
        SegmentationMode::SingleBlock,
        20.0,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_are_unique() {
        let ids: HashSet<&str> = STRATEGY_CATALOG.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), STRATEGY_CATALOG.len());
    }

    #[test]
    fn test_catalog_starts_with_contrast_word() {
        let first = &STRATEGY_CATALOG[0];
        assert_eq!(first.transform, TransformKind::ContrastEnhance);
        assert_eq!(first.segmentation, SegmentationMode::SingleWord);
    }

    #[test]
    fn test_params_disable_engine_dictionaries() {
        let params = STRATEGY_CATALOG[1].params("eng");
        assert_eq!(params.segmentation.psm(), 8);
        assert!(!params.system_dictionary);
        assert!(!params.frequent_words);
        assert!(params.char_whitelist.is_some());
    }
}
