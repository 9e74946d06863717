use anyhow::Result;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Layout hint passed to the engine for one raster.
///
/// Values follow Tesseract's page segmentation modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentationMode {
    /// A single uniform block of text (`--psm 6`)
    SingleBlock,
    /// A single text line (`--psm 7`)
    SingleLine,
    /// A single word (`--psm 8`)
    SingleWord,
    /// As much text as possible in no particular order (`--psm 11`)
    SparseText,
}

impl SegmentationMode {
    pub fn psm(&self) -> u8 {
        match self {
            SegmentationMode::SingleBlock => 6,
            SegmentationMode::SingleLine => 7,
            SegmentationMode::SingleWord => 8,
            SegmentationMode::SparseText => 11,
        }
    }
}

/// Parameters for one recognition call.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineParams {
    pub segmentation: SegmentationMode,
    /// Restricts the classifier to these characters. `None` allows everything.
    pub char_whitelist: Option<String>,
    /// Lets the engine snap readings to its built-in word list.
    /// Off by default: tiles are word fragments, not words.
    pub system_dictionary: bool,
    /// Lets the engine favour frequent words. Off by default for the same reason.
    pub frequent_words: bool,
    /// Language model, e.g. `eng`
    pub language: String,
}

/// Upper and lower case ASCII letters.
pub const LETTER_WHITELIST: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

impl EngineParams {
    pub fn new(segmentation: SegmentationMode) -> Self {
        Self {
            segmentation,
            char_whitelist: Some(LETTER_WHITELIST.to_string()),
            system_dictionary: false,
            frequent_words: false,
            language: "eng".to_string(),
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }
}

/// A line of recognized text.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrLine {
    pub text: String,
    pub confidence: Option<f32>,
}

/// A single recognized word.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    pub confidence: Option<f32>,
}

/// A single recognized character and the left edge of its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrSymbol {
    pub text: String,
    pub confidence: f32,
    pub x0: u32,
}

/// Everything one engine call produced. Any part may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecognitionOutput {
    pub text: Option<String>,
    pub text_confidence: Option<f32>,
    pub lines: Vec<OcrLine>,
    pub words: Vec<OcrWord>,
    pub symbols: Vec<OcrSymbol>,
}

/// A text recognizer that can be pooled.
///
/// Instances are used by one caller at a time; the pool guarantees that.
pub trait RecognitionEngine: Send {
    fn recognize(&mut self, image: &DynamicImage, params: &EngineParams)
        -> Result<RawRecognitionOutput>;

    /// Releases resources held by the instance. Called exactly once, by the pool.
    fn shutdown(&mut self) {}
}
