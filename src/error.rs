use burn::config::ConfigError;
use burn::record::RecorderError;
use std::path::PathBuf;

/// Errors produced while normalizing drawings, loading weights or classifying.
#[derive(thiserror::Error, Debug)]
pub enum DigitError {
    /// The snapshot cannot be interpreted as a bitmap.
    #[error("Invalid bitmap: {reason}")]
    InvalidBitmap { reason: String },

    /// The weight artifact is missing, corrupt or does not match the classifier shapes.
    #[error("Failed to load weights from '{}': {reason}", .path.display())]
    WeightLoad { path: PathBuf, reason: String },

    /// Classification was requested before weights were loaded.
    #[error("Inference session is not ready, load weights first")]
    SessionNotReady,

    /// The classifier output does not hold one score per digit.
    #[error("Expected {expected} class scores, got {actual}")]
    ScoreCount { expected: usize, actual: usize },

    #[error("Inference error: {reason}")]
    Inference { reason: String },

    #[error("Export error: {reason}")]
    Export { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl DigitError {
    pub(crate) fn invalid_bitmap(reason: impl Into<String>) -> Self {
        Self::InvalidBitmap {
            reason: reason.into(),
        }
    }

    pub(crate) fn weight_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::WeightLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn weight_decode(path: impl Into<PathBuf>, err: RecorderError) -> Self {
        Self::weight_load(path, format!("decoding failed ({err})"))
    }
}

pub type Result<T> = core::result::Result<T, DigitError>;
