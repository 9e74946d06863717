//! Top-level tile extraction: decode, detect, recognize, report.

use image::RgbaImage;
use serde::Serialize;
use tracing::info;

use crate::config::ExtractorConfig;
use crate::debug::{ArtifactLog, DebugArtifact};
use crate::error::ExtractError;
use crate::imaging::{detect_regions, TileRegion, DEFAULT_COLS, DEFAULT_ROWS};
use crate::ocr::{
    run_strategies, EnginePool, RecognitionEngine, RecognitionStrategy, SchedulerSettings,
    TesseractEngine, TileCandidate, STRATEGY_CATALOG,
};

/// Per-call options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtractOptions {
    pub rows: u32,
    pub cols: u32,
    /// Collect per-step snapshots of every tile
    pub capture_debug: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            capture_debug: false,
        }
    }
}

impl ExtractOptions {
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self {
            rows: config.grid.rows,
            cols: config.grid.cols,
            capture_debug: false,
        }
    }
}

/// Everything one extraction produced.
#[derive(Debug, Serialize)]
pub struct ExtractionReport {
    /// Tile texts in reading order; tiles without a reading are left out
    pub tiles: Vec<String>,
    pub regions: Vec<TileRegion>,
    /// Best reading per region, index-aligned with `regions`
    pub results: Vec<Option<TileCandidate>>,
    #[serde(skip)]
    pub artifacts: Vec<DebugArtifact>,
}

impl ExtractionReport {
    /// Id of the strategy that produced the reading of region `index`.
    pub fn strategy_for(&self, index: usize) -> Option<&str> {
        self.results
            .get(index)?
            .as_ref()
            .map(|c| c.strategy.as_str())
    }

    pub fn unresolved(&self) -> usize {
        self.results.iter().filter(|r| r.is_none()).count()
    }
}

#[derive(Debug)]
pub enum TileExtraction {
    /// The grid produced no regions, so nothing was recognized
    NoRegions,
    Extracted(ExtractionReport),
}

pub struct TileExtractor {
    config: ExtractorConfig,
    strategies: Vec<RecognitionStrategy>,
}

impl TileExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            strategies: STRATEGY_CATALOG.to_vec(),
        }
    }

    /// Replaces the strategy catalog.
    pub fn with_strategies(mut self, strategies: Vec<RecognitionStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extracts tile texts with Tesseract engines.
    pub fn extract(
        &self,
        bytes: &[u8],
        options: &ExtractOptions,
    ) -> Result<TileExtraction, ExtractError> {
        let tesseract = self.config.tesseract.clone();
        self.extract_with(bytes, options, |id| TesseractEngine::new(id, &tesseract))
    }

    /// Extracts tile texts with engines built by `factory`.
    ///
    /// The pool is only created when there is something to recognize, and is
    /// terminated before this returns.
    pub fn extract_with<E, F>(
        &self,
        bytes: &[u8],
        options: &ExtractOptions,
        factory: F,
    ) -> Result<TileExtraction, ExtractError>
    where
        E: RecognitionEngine,
        F: Fn(usize) -> anyhow::Result<E> + Sync,
    {
        let image: RgbaImage = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = image.dimensions();

        let regions = detect_regions(width, height, options.rows, options.cols);
        if regions.is_empty() {
            info!(width, height, rows = options.rows, cols = options.cols, "No tile regions found");
            return Ok(TileExtraction::NoRegions);
        }
        info!(
            width,
            height,
            regions = regions.len(),
            "Extracting tiles ({}x{} grid)",
            options.rows,
            options.cols
        );

        let settings = SchedulerSettings {
            high_confidence: self.config.high_confidence,
            language: self.config.tesseract.language.clone(),
            preprocess: self.config.preprocess.clone(),
        };
        let mut artifacts = ArtifactLog::new(options.capture_debug);

        let results = EnginePool::scoped(self.config.pool_size, factory, |pool| {
            run_strategies(
                &image,
                &regions,
                &self.strategies,
                pool,
                &settings,
                &mut artifacts,
            )
        })
        .map_err(ExtractError::PoolInit)?;

        let tiles: Vec<String> = results.iter().flatten().map(|c| c.text.clone()).collect();
        info!(
            found = tiles.len(),
            missing = regions.len() - tiles.len(),
            "Tile extraction finished"
        );

        Ok(TileExtraction::Extracted(ExtractionReport {
            tiles,
            regions,
            results,
            artifacts: artifacts.into_sorted(),
        }))
    }
}
