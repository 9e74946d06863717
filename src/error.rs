use thiserror::Error;

/// Fatal failures of a tile extraction.
///
/// Per-tile recognition failures never surface here; they only leave that
/// tile without a reading.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("engine pool initialization failed: {0:#}")]
    PoolInit(anyhow::Error),
}
