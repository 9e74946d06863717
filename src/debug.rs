//! Diagnostic snapshots of the tile pipeline.
//!
//! Artifacts are collected in memory while a run is in progress and can be
//! written out afterwards as PNG files. Nothing downstream ever reads them.

use anyhow::{Context, Result};
use chrono::Local;
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};

/// One captured processing stage of one tile.
#[derive(Debug, Clone)]
pub struct DebugArtifact {
    pub tile_index: usize,
    /// Step label, e.g. `original-region`, `scaled-up`, `preprocessed-otsu`
    pub step: String,
    pub image: DynamicImage,
    pub description: String,
}

/// Collector that is a no-op unless capture was requested.
#[derive(Debug, Default)]
pub struct ArtifactLog {
    enabled: bool,
    items: Vec<DebugArtifact>,
}

impl ArtifactLog {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            items: Vec::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(enabled: bool) -> Self {
        if enabled { Self::enabled() } else { Self::disabled() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Records a snapshot. `render` only runs when capture is enabled.
    pub fn record<F>(&mut self, tile_index: usize, step: &str, render: F)
    where
        F: FnOnce() -> (DynamicImage, String),
    {
        if !self.enabled {
            return;
        }
        let (image, description) = render();
        self.items.push(DebugArtifact {
            tile_index,
            step: step.to_string(),
            image,
            description,
        });
    }

    pub fn items(&self) -> &[DebugArtifact] {
        &self.items
    }

    /// Returns artifacts ordered by tile index, keeping capture order within a tile.
    pub fn into_sorted(mut self) -> Vec<DebugArtifact> {
        self.items.sort_by_key(|a| a.tile_index);
        self.items
    }
}

/// Writes artifacts into a new timestamped folder under `base_dir`.
///
/// Files are named `tile<NN>_<seq>_<step>.png` so a directory listing
/// follows tile order and processing order. Returns the session folder.
pub fn save_artifacts(artifacts: &[DebugArtifact], base_dir: &Path) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let session_dir = base_dir.join(timestamp);
    fs::create_dir_all(&session_dir).with_context(|| {
        format!("Failed to create debug directory: {}", session_dir.display())
    })?;

    let mut seq_per_tile: Vec<usize> = Vec::new();
    for artifact in artifacts {
        if seq_per_tile.len() <= artifact.tile_index {
            seq_per_tile.resize(artifact.tile_index + 1, 0);
        }
        let seq = seq_per_tile[artifact.tile_index];
        seq_per_tile[artifact.tile_index] += 1;

        let path = session_dir.join(format!(
            "tile{:02}_{:03}_{}.png",
            artifact.tile_index, seq, artifact.step
        ));
        artifact
            .image
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    tracing::info!(
        count = artifacts.len(),
        dir = %session_dir.display(),
        "Debug artifacts saved"
    );

    Ok(session_dir)
}
