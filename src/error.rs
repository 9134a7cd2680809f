//! Error types for round-trip operations

use crate::types::{ScalarType, VolumeClass};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for round-trip operations
#[derive(Error, Debug)]
pub enum RoundTripError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported input kind: {class} with {channels} channel(s)")]
    UnsupportedInputKind { class: VolumeClass, channels: usize },

    #[error("Failed to convert scalar label volume to unsigned char, type is {observed}: {detail}")]
    CastFailed { observed: ScalarType, detail: String },

    #[error("Failed to write file {}: {reason}", .path.display())]
    WriteFailed { path: PathBuf, reason: String },

    #[error("Failed to reload saved label map file {}: {reason}", .path.display())]
    ReloadFailed { path: PathBuf, reason: String },

    #[error("Entity not found: {0}")]
    IdentityNotFound(String),

    #[error("Reloaded {} is not a label volume, type = {observed}", .path.display())]
    ClassificationMismatch { path: PathBuf, observed: VolumeClass },

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image codec error: {0}")]
    Image(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Specialized Result type for round-trip operations
pub type Result<T> = std::result::Result<T, RoundTripError>;

/// Flat discriminant of [`RoundTripError`], kept by failed pipeline runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedInputKind,
    CastFailed,
    WriteFailed,
    ReloadFailed,
    IdentityNotFound,
    ClassificationMismatch,
    InvalidDimensions,
    Io,
    Image,
    Serialization,
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl RoundTripError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoundTripError::InvalidInput(_) => ErrorKind::InvalidInput,
            RoundTripError::UnsupportedInputKind { .. } => ErrorKind::UnsupportedInputKind,
            RoundTripError::CastFailed { .. } => ErrorKind::CastFailed,
            RoundTripError::WriteFailed { .. } => ErrorKind::WriteFailed,
            RoundTripError::ReloadFailed { .. } => ErrorKind::ReloadFailed,
            RoundTripError::IdentityNotFound(_) => ErrorKind::IdentityNotFound,
            RoundTripError::ClassificationMismatch { .. } => ErrorKind::ClassificationMismatch,
            RoundTripError::InvalidDimensions(_) => ErrorKind::InvalidDimensions,
            RoundTripError::Io(_) => ErrorKind::Io,
            RoundTripError::Image(_) => ErrorKind::Image,
            RoundTripError::Serialization(_) => ErrorKind::Serialization,
            RoundTripError::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

impl From<image::ImageError> for RoundTripError {
    fn from(err: image::ImageError) -> Self {
        RoundTripError::Image(err.to_string())
    }
}

impl From<serde_json::Error> for RoundTripError {
    fn from(err: serde_json::Error) -> Self {
        RoundTripError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = RoundTripError::IdentityNotFound("image01_grey-label".into());
        assert_eq!(err.kind(), ErrorKind::IdentityNotFound);

        let err = RoundTripError::CastFailed {
            observed: ScalarType::I16,
            detail: "cast left input untouched".into(),
        };
        assert_eq!(err.kind(), ErrorKind::CastFailed);
        assert!(err.to_string().contains("I16"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RoundTripError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_classification_message_carries_context() {
        let err = RoundTripError::ClassificationMismatch {
            path: PathBuf::from("/tmp/x-label.png"),
            observed: VolumeClass::Vector,
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/x-label.png"));
        assert!(msg.contains("vector volume"));
    }
}
