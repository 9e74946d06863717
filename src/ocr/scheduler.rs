//! Runs recognition strategies over the tiles of one board.
//!
//! Strategies run one after another. Each strategy only sees the tiles that
//! are still below the high-confidence threshold, and those tiles are
//! recognized concurrently across the engine pool. Once every tile is
//! resolved, the remaining strategies are skipped.

use image::{DynamicImage, RgbaImage};
use std::thread;
use tracing::{debug, info, warn};

use super::aggregate::{best_candidate, improves, TileCandidate};
use super::engine::{EngineParams, RecognitionEngine};
use super::pool::EnginePool;
use super::strategy::RecognitionStrategy;
use crate::debug::ArtifactLog;
use crate::imaging::{prepare_tile, PreprocessConfig, TileRegion};

/// Score at which a tile is considered read and skipped by later strategies.
pub const HIGH_CONFIDENCE: f32 = 80.0;

/// Settings shared by every strategy pass.
#[derive(Clone, Debug)]
pub struct SchedulerSettings {
    pub high_confidence: f32,
    pub language: String,
    pub preprocess: PreprocessConfig,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            high_confidence: HIGH_CONFIDENCE,
            language: "eng".to_string(),
            preprocess: PreprocessConfig::default(),
        }
    }
}

fn is_resolved(best: &Option<TileCandidate>, threshold: f32) -> bool {
    best.as_ref().is_some_and(|c| c.confidence >= threshold)
}

/// Recognizes one prepared tile with a pooled engine.
///
/// Any failure is logged and reported as no candidate, so one bad tile never
/// affects the others.
fn recognize_tile<E: RecognitionEngine>(
    pool: &EnginePool<E>,
    tile_index: usize,
    image: &DynamicImage,
    params: &EngineParams,
    strategy: &RecognitionStrategy,
) -> Option<TileCandidate> {
    let mut engine = match pool.acquire() {
        Ok(engine) => engine,
        Err(e) => {
            warn!(tile = tile_index, strategy = strategy.id, "No engine available: {:#}", e);
            return None;
        }
    };

    let raw = match engine.recognize(image, params) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(tile = tile_index, strategy = strategy.id, "Recognition failed: {:#}", e);
            return None;
        }
    };
    drop(engine);

    let candidate = best_candidate(&raw, strategy.id)?;
    if candidate.confidence < strategy.min_confidence {
        debug!(
            tile = tile_index,
            strategy = strategy.id,
            text = %candidate.text,
            confidence = candidate.confidence,
            "Candidate below strategy floor"
        );
        return None;
    }
    Some(candidate)
}

/// Runs `strategies` in order over `regions` of `image`.
///
/// Returns the best reading per region, index-aligned with `regions`.
pub fn run_strategies<E: RecognitionEngine>(
    image: &RgbaImage,
    regions: &[TileRegion],
    strategies: &[RecognitionStrategy],
    pool: &EnginePool<E>,
    settings: &SchedulerSettings,
    artifacts: &mut ArtifactLog,
) -> Vec<Option<TileCandidate>> {
    let mut best: Vec<Option<TileCandidate>> = vec![None; regions.len()];

    for strategy in strategies {
        let pending: Vec<usize> = best
            .iter()
            .enumerate()
            .filter(|(_, b)| !is_resolved(b, settings.high_confidence))
            .map(|(i, _)| i)
            .collect();

        if pending.is_empty() {
            info!(strategy = strategy.id, "All tiles resolved, skipping remaining strategies");
            break;
        }

        info!(
            strategy = strategy.id,
            tiles = pending.len(),
            "Running recognition strategy"
        );

        let prepared: Vec<(usize, DynamicImage)> = pending
            .iter()
            .filter_map(|&index| {
                let tile = prepare_tile(
                    image,
                    &regions[index],
                    strategy.transform,
                    &settings.preprocess,
                    index,
                    artifacts,
                );
                if tile.is_none() {
                    warn!(tile = index, "Region lies outside the image, skipping");
                }
                tile.map(|t| (index, t))
            })
            .collect();

        let params = strategy.params(&settings.language);
        let outcomes: Vec<(usize, Option<TileCandidate>)> = thread::scope(|s| {
            let handles: Vec<_> = prepared
                .iter()
                .map(|(index, tile)| {
                    let params = &params;
                    (
                        *index,
                        s.spawn(move || recognize_tile(pool, *index, tile, params, strategy)),
                    )
                })
                .collect();

            handles
                .into_iter()
                .map(|(index, handle)| {
                    let candidate = handle.join().unwrap_or_else(|_| {
                        warn!(tile = index, strategy = strategy.id, "Recognition thread panicked");
                        None
                    });
                    (index, candidate)
                })
                .collect()
        });

        for (index, candidate) in outcomes {
            let Some(candidate) = candidate else { continue };
            if improves(best[index].as_ref(), &candidate) {
                debug!(
                    tile = index,
                    text = %candidate.text,
                    confidence = candidate.confidence,
                    strategy = strategy.id,
                    "New best reading"
                );
                best[index] = Some(candidate);
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{detect_regions, TransformKind};
    use crate::ocr::engine::SegmentationMode;
    use crate::ocr::testing::{board, word, ScriptedEngines};
    use anyhow::anyhow;

    const FIRST: RecognitionStrategy = RecognitionStrategy::new(
        "first",
        TransformKind::PassThrough,
        SegmentationMode::SingleWord,
        0.0,
    );
    const SECOND: RecognitionStrategy = RecognitionStrategy::new(
        "second",
        TransformKind::PassThrough,
        SegmentationMode::SingleLine,
        0.0,
    );
    const THIRD: RecognitionStrategy = RecognitionStrategy::new(
        "third",
        TransformKind::PassThrough,
        SegmentationMode::SparseText,
        0.0,
    );

    fn run(
        engines: &ScriptedEngines,
        rows: u32,
        cols: u32,
        strategies: &[RecognitionStrategy],
    ) -> Vec<Option<TileCandidate>> {
        let image = board(rows, cols, 40);
        let regions = detect_regions(image.width(), image.height(), rows, cols);
        let pool = EnginePool::new(2, |id| engines.engine(id)).unwrap();
        let mut artifacts = ArtifactLog::disabled();
        run_strategies(
            &image,
            &regions,
            strategies,
            &pool,
            &SchedulerSettings::default(),
            &mut artifacts,
        )
    }

    #[test]
    fn test_early_exit_when_first_strategy_resolves_everything() {
        let engines = ScriptedEngines::new(|_, _| Ok(word("ing", 95.0)));
        let results = run(&engines, 2, 2, &[FIRST, SECOND, THIRD]);

        assert!(results.iter().all(|r| r.as_ref().unwrap().strategy == "first"));
        assert_eq!(engines.call_count(), 4);
        assert!(engines.tiles_seen(SegmentationMode::SingleLine).is_empty());
        assert!(engines.tiles_seen(SegmentationMode::SparseText).is_empty());
    }

    #[test]
    fn test_only_unresolved_tiles_are_retried() {
        let engines = ScriptedEngines::new(|tile, params| {
            let confidence = match (tile, params.segmentation) {
                (1, SegmentationMode::SingleWord) => 40.0,
                (_, SegmentationMode::SingleWord) => 90.0,
                _ => 85.0,
            };
            Ok(word("rec", confidence))
        });
        let results = run(&engines, 2, 2, &[FIRST, SECOND, THIRD]);

        assert_eq!(engines.tiles_seen(SegmentationMode::SingleLine), vec![1]);
        assert!(engines.tiles_seen(SegmentationMode::SparseText).is_empty());
        assert_eq!(results[1].as_ref().unwrap().strategy, "second");
        assert_eq!(results[0].as_ref().unwrap().strategy, "first");
    }

    #[test]
    fn test_higher_confidence_replaces_and_attributes() {
        let engines = ScriptedEngines::new(|_, params| match params.segmentation {
            SegmentationMode::SingleWord => Ok(word("bat", 60.0)),
            _ => Ok(word("bat", 75.0)),
        });
        let results = run(&engines, 1, 1, &[FIRST, SECOND]);

        let best = results[0].as_ref().unwrap();
        assert_eq!(best.text, "bat");
        assert_eq!(best.confidence, 75.0);
        assert_eq!(best.strategy, "second");
    }

    #[test]
    fn test_equal_confidence_keeps_earlier_strategy() {
        let engines = ScriptedEngines::new(|_, params| match params.segmentation {
            SegmentationMode::SingleWord => Ok(word("la", 50.0)),
            _ => Ok(word("le", 50.0)),
        });
        let results = run(&engines, 1, 1, &[FIRST, SECOND]);
        assert_eq!(results[0].as_ref().unwrap().text, "la");
        assert_eq!(results[0].as_ref().unwrap().strategy, "first");
    }

    #[test]
    fn test_engine_failure_only_affects_its_tile() {
        let engines = ScriptedEngines::new(|tile, _| {
            if tile == 3 {
                Err(anyhow!("engine crashed"))
            } else {
                Ok(word("te", 90.0))
            }
        });
        let results = run(&engines, 2, 2, &[FIRST, SECOND]);

        assert!(results[3].is_none());
        assert!(results[..3].iter().all(|r| r.is_some()));
        // Tile 3 was retried by the second strategy and failed again.
        assert_eq!(engines.tiles_seen(SegmentationMode::SingleLine), vec![3]);
    }

    #[test]
    fn test_candidates_below_floor_are_dropped() {
        let strict = RecognitionStrategy::new(
            "strict",
            TransformKind::PassThrough,
            SegmentationMode::SingleWord,
            70.0,
        );
        let engines = ScriptedEngines::new(|_, _| Ok(word("al", 65.0)));
        let results = run(&engines, 1, 2, &[strict]);
        assert!(results.iter().all(|r| r.is_none()));
    }

    #[test]
    fn test_no_strategies_leaves_tiles_empty() {
        let engines = ScriptedEngines::new(|_, _| Ok(word("al", 65.0)));
        let results = run(&engines, 1, 2, &[]);
        assert_eq!(results, vec![None, None]);
        assert_eq!(engines.call_count(), 0);
    }
}
