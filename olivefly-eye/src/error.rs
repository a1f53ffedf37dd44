//! Error types for olivefly-eye

use thiserror::Error;
use olivefly_core::Error as CoreError;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Model not available: {0}")]
    ModelUnavailable(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("ONNX Runtime error: {0}")]
    Ort(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}
