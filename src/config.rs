//! Extractor configuration loaded from quartiles.json.
//!
//! Every section is optional. A missing file, or one that fails to parse,
//! falls back to the built-in defaults, so a config only needs the keys it
//! changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::imaging::{PreprocessConfig, DEFAULT_COLS, DEFAULT_ROWS};
use crate::ocr::{TesseractConfig, DEFAULT_POOL_SIZE, HIGH_CONFIDENCE};

/// Expected tile layout of the board.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub rows: u32,
    pub cols: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
        }
    }
}

/// Complete extractor configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub grid: GridConfig,
    /// Number of engine instances working in parallel
    pub pool_size: usize,
    /// Tiles at or above this score are not retried by later strategies
    pub high_confidence: f32,
    /// Crop, scale and transform settings (includes `adaptive` and `contrast`)
    pub preprocess: PreprocessConfig,
    pub tesseract: TesseractConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            pool_size: DEFAULT_POOL_SIZE,
            high_confidence: HIGH_CONFIDENCE,
            preprocess: PreprocessConfig::default(),
            tesseract: TesseractConfig::default(),
        }
    }
}

impl ExtractorConfig {
    /// Load config from file, or return defaults if it is missing or invalid.
    pub fn load(config_path: &Path) -> Self {
        info!("Looking for config at: {}", config_path.display());

        if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(content) => match Self::from_json(&content) {
                    Ok(config) => {
                        info!("Loaded config from {}", config_path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Failed to parse {}: {:#}. Using defaults.", config_path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Failed to read {}: {}. Using defaults.", config_path.display(), e);
                }
            }
        }
        Self::default()
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid extractor config")
    }

    /// Save default config to file (for reference).
    pub fn save_default(config_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&Self::default())?;
        fs::write(config_path, json)
            .with_context(|| format!("Failed to write {}", config_path.display()))
    }
}
