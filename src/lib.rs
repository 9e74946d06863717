//! Quartiles tile reader.
//!
//! Splits a screenshot of a Quartiles board into its tile grid, reads each
//! tile with a pool of OCR engines under several preprocessing strategies,
//! and keeps the most confident reading per tile. The solver then searches
//! tile arrangements against a word list.

pub mod config;
pub mod debug;
pub mod dictionary;
pub mod error;
pub mod extract;
pub mod imaging;
pub mod ocr;
pub mod paths;
pub mod solver;

pub use config::ExtractorConfig;
pub use debug::{save_artifacts, ArtifactLog, DebugArtifact};
pub use dictionary::{DictionaryCache, DictionaryName, DictionaryProvider};
pub use error::ExtractError;
pub use extract::{ExtractOptions, ExtractionReport, TileExtraction, TileExtractor};
pub use solver::{solve, SolveReport};
