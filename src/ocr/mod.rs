pub mod aggregate;
pub mod engine;
pub mod pool;
pub mod scheduler;
pub mod setup;
pub mod strategy;
pub mod tesseract;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{best_candidate, improves, TileCandidate};
pub use engine::{
    EngineParams, OcrLine, OcrSymbol, OcrWord, RawRecognitionOutput, RecognitionEngine,
    SegmentationMode,
};
pub use pool::{EnginePool, PooledEngine, DEFAULT_POOL_SIZE};
pub use scheduler::{run_strategies, SchedulerSettings, HIGH_CONFIDENCE};
pub use setup::TesseractConfig;
pub use strategy::{RecognitionStrategy, STRATEGY_CATALOG};
pub use tesseract::TesseractEngine;
