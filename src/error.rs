//! Error types for cutout compositing operations

use thiserror::Error;

/// Result type alias for compositing operations
pub type Result<T> = std::result::Result<T, ComposeError>;

/// Failure reported by the external segmentation oracle.
///
/// Cloneable so it can live inside [`crate::SegmentationState::Error`] and be
/// delivered to every observer of a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The segmentation service (or its model) is not available
    #[error("segmentation service unavailable: {0}")]
    Unavailable(String),

    /// The service ran but could not segment the image
    #[error("segmentation failed: {0}")]
    Failed(String),

    /// The call did not complete within the configured timeout
    #[error("segmentation timed out after {0}ms")]
    Timeout(u64),

    /// The call was cancelled before completing
    #[error("segmentation request cancelled")]
    Cancelled,
}

impl OracleError {
    /// Create a new failure error
    pub fn failed<S: Into<String>>(msg: S) -> Self {
        Self::Failed(msg.into())
    }

    /// Create a new unavailable error
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Short machine-readable code for UI retry affordances
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Failed(_) => "failed",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Comprehensive error types for compositing operations
#[derive(Error, Debug)]
pub enum ComposeError {
    /// Zero-area or malformed pixel buffer
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Subject mask whose confidence field does not match its extent
    #[error("Invalid mask: {0}")]
    InvalidMask(String),

    /// The segmentation oracle failed
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Result of a superseded session generation was discarded
    #[error("Stale segmentation result discarded (generation {generation}, current {current})")]
    CancelledStale { generation: u64, current: u64 },

    /// Image encoding or decoding errors
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected processing failure
    #[error("Processing error: {0}")]
    Processing(String),
}

impl ComposeError {
    /// Create a new invalid image error
    pub fn invalid_image<S: Into<String>>(msg: S) -> Self {
        Self::InvalidImage(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new invalid mask error
    pub fn invalid_mask<S: Into<String>>(msg: S) -> Self {
        Self::InvalidMask(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a zero-area image error naming the offending dimensions
    #[must_use]
    pub fn zero_area(operation: &str, width: u32, height: u32) -> Self {
        Self::InvalidImage(format!(
            "{} requires a non-empty image, got {}x{}",
            operation, width, height
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Whether this is the internal stale-generation signal rather than a user error
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::CancelledStale { .. })
    }
}
