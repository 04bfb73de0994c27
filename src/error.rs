//! Error types for nightcore.
//!
//! Every request ends in exactly one [`ErrorKind`]. [`NightcoreError`] carries
//! the context of a failure and always maps to one non-success kind.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Closed outcome taxonomy of a processing request.
///
/// The discriminants are stable and double as process exit details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Success = 0,
    InvalidInputFilePath = 1,
    InvalidOutputFilePath = 2,
    InvalidInputExtension = 3,
    InvalidOutputExtension = 4,
    CannotCreateElements = 5,
    CannotLinkElements = 6,
    NullPointer = 7,
    InvalidValueRange = 8,
    CannotStartPipeline = 9,
    InvalidThumbnailExtension = 10,
    Unimplemented = 11,
}

impl ErrorKind {
    /// Numeric code of this kind.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Success => "Success",
            ErrorKind::InvalidInputFilePath => "Invalid input file path",
            ErrorKind::InvalidOutputFilePath => "Invalid output file path",
            ErrorKind::InvalidInputExtension => "Invalid input extension",
            ErrorKind::InvalidOutputExtension => "Invalid output extension",
            ErrorKind::CannotCreateElements => "Unable to create all GstElements",
            ErrorKind::CannotLinkElements => "Unable to link all elements",
            ErrorKind::NullPointer => "Null pointer",
            ErrorKind::InvalidValueRange => "Invalid value range",
            ErrorKind::CannotStartPipeline => "Cant start pipeline to play",
            ErrorKind::InvalidThumbnailExtension => "Invalid Thumbnail extension",
            ErrorKind::Unimplemented => "Mode not implemented",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
pub enum NightcoreError {
    // Request validation
    #[error("Invalid input file path: {}", path.display())]
    InvalidInputFilePath { path: PathBuf },

    #[error("Invalid output file path: {}", path.display())]
    InvalidOutputFilePath { path: PathBuf },

    #[error("Invalid input extension: {}", path.display())]
    InvalidInputExtension { path: PathBuf },

    #[error("Invalid output extension: {}", path.display())]
    InvalidOutputExtension { path: PathBuf },

    #[error("Invalid thumbnail extension: {}", path.display())]
    InvalidThumbnailExtension { path: PathBuf },

    #[error("Invalid value for {field}: {message}")]
    InvalidValueRange { field: &'static str, message: String },

    // Graph assembly
    #[error("Cannot create stage '{stage}' ({factory}): {message}")]
    CannotCreateElements {
        stage: String,
        factory: String,
        message: String,
    },

    #[error("Cannot link {upstream} -> {downstream}: {message}")]
    CannotLinkElements {
        upstream: String,
        downstream: String,
        message: String,
    },

    #[error("Missing handle: {what}")]
    NullPointer { what: String },

    // Lifecycle
    #[error("Cannot start pipeline '{pipeline}': {message}")]
    CannotStartPipeline { pipeline: String, message: String },

    #[error("Fault from stage '{stage}': {message}")]
    StageFault {
        stage: String,
        kind: ErrorKind,
        message: String,
        debug: Option<String>,
    },

    #[error("{mode} is not implemented")]
    Unimplemented { mode: &'static str },
}

impl NightcoreError {
    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NightcoreError::InvalidInputFilePath { .. } => ErrorKind::InvalidInputFilePath,
            NightcoreError::InvalidOutputFilePath { .. } => ErrorKind::InvalidOutputFilePath,
            NightcoreError::InvalidInputExtension { .. } => ErrorKind::InvalidInputExtension,
            NightcoreError::InvalidOutputExtension { .. } => ErrorKind::InvalidOutputExtension,
            NightcoreError::InvalidThumbnailExtension { .. } => {
                ErrorKind::InvalidThumbnailExtension
            }
            NightcoreError::InvalidValueRange { .. } => ErrorKind::InvalidValueRange,
            NightcoreError::CannotCreateElements { .. } => ErrorKind::CannotCreateElements,
            NightcoreError::CannotLinkElements { .. } => ErrorKind::CannotLinkElements,
            NightcoreError::NullPointer { .. } => ErrorKind::NullPointer,
            NightcoreError::CannotStartPipeline { .. } => ErrorKind::CannotStartPipeline,
            NightcoreError::StageFault { kind, .. } => *kind,
            NightcoreError::Unimplemented { .. } => ErrorKind::Unimplemented,
        }
    }
}

/// Final result of one processing request.
pub type Outcome = std::result::Result<(), NightcoreError>;

/// Kind of a finished request, `Success` included.
pub fn outcome_kind(outcome: &Outcome) -> ErrorKind {
    match outcome {
        Ok(()) => ErrorKind::Success,
        Err(e) => e.kind(),
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, NightcoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorKind::Success.code(), 0);
        assert_eq!(ErrorKind::InvalidInputFilePath.code(), 1);
        assert_eq!(ErrorKind::CannotLinkElements.code(), 6);
        assert_eq!(ErrorKind::CannotStartPipeline.code(), 9);
        assert_eq!(ErrorKind::InvalidThumbnailExtension.code(), 10);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::Success.to_string(), "Success");
        assert_eq!(ErrorKind::InvalidValueRange.name(), "Invalid value range");
        assert_eq!(
            ErrorKind::InvalidThumbnailExtension.name(),
            "Invalid Thumbnail extension"
        );
        assert_eq!(ErrorKind::NullPointer.name(), "Null pointer");
        assert_eq!(
            ErrorKind::CannotCreateElements.name(),
            "Unable to create all GstElements"
        );
        assert_eq!(
            ErrorKind::CannotStartPipeline.name(),
            "Cant start pipeline to play"
        );
    }

    #[test]
    fn test_input_path_display() {
        let error = NightcoreError::InvalidInputFilePath {
            path: PathBuf::from("/music/missing.mp3"),
        };
        assert_eq!(
            error.to_string(),
            "Invalid input file path: /music/missing.mp3"
        );
        assert_eq!(error.kind(), ErrorKind::InvalidInputFilePath);
    }

    #[test]
    fn test_value_range_display() {
        let error = NightcoreError::InvalidValueRange {
            field: "pitch",
            message: "must be >= 1.0, got 0.5".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid value for pitch: must be >= 1.0, got 0.5"
        );
    }

    #[test]
    fn test_stage_fault_carries_translated_kind() {
        let error = NightcoreError::StageFault {
            stage: "sink".to_string(),
            kind: ErrorKind::InvalidOutputFilePath,
            message: "Could not open file for writing".to_string(),
            debug: None,
        };
        assert_eq!(error.kind(), ErrorKind::InvalidOutputFilePath);
        assert!(error.to_string().contains("sink"));
    }

    #[test]
    fn test_outcome_kind() {
        assert_eq!(outcome_kind(&Ok(())), ErrorKind::Success);
        let failed: Outcome = Err(NightcoreError::Unimplemented {
            mode: "video speed-up",
        });
        assert_eq!(outcome_kind(&failed), ErrorKind::Unimplemented);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<NightcoreError>();
        assert_sync::<NightcoreError>();
    }
}
