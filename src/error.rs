//! Custom error types for mvtec-ad.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the mvtec-ad library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read a serialized array.
    #[error("failed to read array from {path}: {source}")]
    ArrayRead {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ReadNpyError,
    },

    /// Failed to load an image file.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to save an image file.
    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to load an ONNX model.
    #[error("failed to load ONNX model {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },

    /// Model inference failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// Channel count is neither 1 (grayscale) nor 3 (RGB).
    #[error("unsupported channel count {channels}: expected {expected}")]
    UnsupportedChannels { channels: usize, expected: &'static str },

    /// Image is smaller than the similarity filter window.
    #[error("image of {height}x{width} is smaller than the {window}x{window} filter window")]
    ImageTooSmall {
        height: usize,
        width: usize,
        window: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shape mismatch in array operations.
    #[error("array shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
}

/// Result type alias for mvtec-ad operations.
pub type Result<T> = std::result::Result<T, Error>;
