use std::path::PathBuf;

use thiserror::Error;

/// Fatal pipeline errors. Every variant aborts the whole render; no stage
/// retries internally and no partial video is ever reported as success.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Input not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    #[error("Inference failed: {0}")]
    Inference(#[source] anyhow::Error),

    #[error("Video assembly failed: {0}")]
    Assembly(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
