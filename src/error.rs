//! Custom error types for duosr.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the duosr library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read a parameter blob from disk.
    #[error("failed to read parameters from {path}: {source}")]
    ParameterRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The parameter blob is not a valid safetensors file.
    #[error("corrupt parameter blob {path}: {source}")]
    ParameterDecode {
        path: PathBuf,
        #[source]
        source: candle_core::Error,
    },

    /// A tensor the architecture needs is absent from the blob.
    #[error("parameter blob {path} has no tensor {name}")]
    MissingTensor { path: PathBuf, name: String },

    /// The blob carries tensors the architecture does not declare.
    #[error("parameter blob {path} has unexpected tensors: {}", .names.join(", "))]
    UnexpectedTensors { path: PathBuf, names: Vec<String> },

    /// A tensor is not stored as floating point.
    #[error("parameter {name} has unsupported dtype {dtype}")]
    ParameterDtype { name: String, dtype: String },

    /// A layer could not be built from its tensors, usually a shape mismatch.
    #[error("failed to load layer {layer} from {path}: {source}")]
    LayerLoad {
        path: PathBuf,
        layer: String,
        #[source]
        source: candle_core::Error,
    },

    /// Failed to load an image file.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to decode an in-memory image.
    #[error("failed to decode image: {source}")]
    ImageDecode {
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

    /// Input tensor has the wrong number of channels.
    #[error("expected {expected} input channels, got {actual}")]
    ChannelCount { expected: usize, actual: usize },

    /// Image or tensor dimensions are not supported.
    #[error("unsupported dimensions {width}x{height}: {reason}")]
    UnsupportedDimensions {
        width: usize,
        height: usize,
        reason: String,
    },

    /// Crop rectangle is empty once clamped to the image.
    #[error("crop rectangle {x},{y} {width}x{height} is empty inside a {image_width}x{image_height} image")]
    DegenerateCrop {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        image_width: u32,
        image_height: u32,
    },

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// A device tensor operation failed.
    #[error("tensor operation failed: {source}")]
    Tensor {
        #[source]
        source: candle_core::Error,
    },

    /// A host array could not take the requested shape.
    #[error("array layout error: {source}")]
    Layout {
        #[source]
        source: ndarray::ShapeError,
    },

    /// The requested compute device cannot be opened.
    #[error("compute device {device} is unavailable: {source}")]
    DeviceUnavailable {
        device: String,
        #[source]
        source: candle_core::Error,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`Error`] used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Parameter blob missing, corrupt, or incompatible. Fatal at startup.
    Load,
    /// The request itself is unusable. Only that request fails.
    InvalidInput,
    /// A forward pass failed unexpectedly.
    Compute,
    /// Configuration values are out of range.
    Configuration,
    /// Results could not be persisted.
    Output,
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ParameterRead { .. }
            | Self::ParameterDecode { .. }
            | Self::MissingTensor { .. }
            | Self::UnexpectedTensors { .. }
            | Self::ParameterDtype { .. }
            | Self::LayerLoad { .. } => ErrorKind::Load,
            Self::ImageLoad { .. }
            | Self::ImageDecode { .. }
            | Self::ChannelCount { .. }
            | Self::UnsupportedDimensions { .. }
            | Self::DegenerateCrop { .. } => ErrorKind::InvalidInput,
            Self::ShapeMismatch { .. } | Self::Tensor { .. } | Self::Layout { .. } => {
                ErrorKind::Compute
            }
            Self::InvalidParameter { .. } | Self::DeviceUnavailable { .. } => {
                ErrorKind::Configuration
            }
            Self::ImageSave { .. } | Self::Io(_) => ErrorKind::Output,
        }
    }
}

impl From<candle_core::Error> for Error {
    fn from(source: candle_core::Error) -> Self {
        Self::Tensor { source }
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(source: ndarray::ShapeError) -> Self {
        Self::Layout { source }
    }
}

/// Result type alias for duosr operations.
pub type Result<T> = std::result::Result<T, Error>;
