//! In-memory engine for exercising the scheduler and extractor.
//!
//! Test rasters paint every tile a flat colour whose red channel is
//! `10 * tile_index`, and use pass-through strategies so the colour reaches
//! the engine intact. The script sees the tile index and the call's
//! parameters and decides what to return.

use anyhow::Result;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::engine::{EngineParams, RawRecognitionOutput, RecognitionEngine, SegmentationMode};

pub type Script =
    dyn Fn(usize, &EngineParams) -> Result<RawRecognitionOutput> + Send + Sync + 'static;

/// Shared call log of every scripted engine built from one `ScriptedEngines`.
#[derive(Clone)]
pub struct ScriptedEngines {
    script: Arc<Script>,
    pub calls: Arc<AtomicUsize>,
    pub seen: Arc<Mutex<Vec<(usize, SegmentationMode)>>>,
}

impl ScriptedEngines {
    pub fn new<S>(script: S) -> Self
    where
        S: Fn(usize, &EngineParams) -> Result<RawRecognitionOutput> + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn engine(&self, _id: usize) -> Result<ScriptedEngine> {
        Ok(ScriptedEngine {
            shared: self.clone(),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Tiles seen under `mode`, sorted.
    pub fn tiles_seen(&self, mode: SegmentationMode) -> Vec<usize> {
        let mut tiles: Vec<usize> = self
            .seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m)| *m == mode)
            .map(|(t, _)| *t)
            .collect();
        tiles.sort();
        tiles
    }
}

pub struct ScriptedEngine {
    shared: ScriptedEngines,
}

impl RecognitionEngine for ScriptedEngine {
    fn recognize(
        &mut self,
        image: &DynamicImage,
        params: &EngineParams,
    ) -> Result<RawRecognitionOutput> {
        let tile = (image.get_pixel(0, 0)[0] / 10) as usize;
        self.shared.calls.fetch_add(1, Ordering::SeqCst);
        self.shared
            .seen
            .lock()
            .unwrap()
            .push((tile, params.segmentation));
        (self.shared.script)(tile, params)
    }
}

/// A `cols * cell` x `rows * cell` board with tile `i` painted red `10 * i`.
pub fn board(rows: u32, cols: u32, cell: u32) -> RgbaImage {
    RgbaImage::from_fn(cols * cell, rows * cell, |x, y| {
        let index = (y / cell) * cols + x / cell;
        Rgba([(index * 10) as u8, 0, 0, 255])
    })
}

/// A raw output carrying a single word.
pub fn word(text: &str, confidence: f32) -> RawRecognitionOutput {
    RawRecognitionOutput {
        words: vec![super::engine::OcrWord {
            text: text.to_string(),
            confidence: Some(confidence),
        }],
        ..Default::default()
    }
}
