//! Segmentation oracle abstraction
//!
//! The oracle is the external component that separates a subject from its
//! background. It is opaque to this crate: it receives an image, may take
//! arbitrarily long, and answers with either a foreground cutout, a set of
//! per-subject confidence masks, or a failure.

use crate::{
    error::OracleError,
    types::{PixelBuffer, SegmentationResult},
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
pub mod test_utils;

/// Trait for segmentation backends
#[async_trait]
pub trait SegmentationOracle: Send + Sync {
    /// Segment `image`
    ///
    /// `cancel` fires when the caller no longer wants the answer. Honoring it
    /// is best-effort: a result delivered after cancellation is discarded by
    /// the session.
    ///
    /// # Errors
    /// - `OracleError::Unavailable` when the backend cannot serve requests
    /// - `OracleError::Failed` when segmentation itself fails
    /// - `OracleError::Cancelled` when the request was abandoned
    async fn submit(
        &self,
        image: &PixelBuffer,
        cancel: CancellationToken,
    ) -> std::result::Result<SegmentationResult, OracleError>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "oracle"
    }
}

/// Oracle that always answers with a fixed result
///
/// Useful when segmentation already happened elsewhere (for example a mask
/// file produced by another tool) and only reconstruction is needed.
#[derive(Debug, Clone)]
pub struct PrecomputedOracle {
    result: SegmentationResult,
}

impl PrecomputedOracle {
    #[must_use]
    pub fn new(result: SegmentationResult) -> Self {
        Self { result }
    }
}

#[async_trait]
impl SegmentationOracle for PrecomputedOracle {
    async fn submit(
        &self,
        _image: &PixelBuffer,
        cancel: CancellationToken,
    ) -> std::result::Result<SegmentationResult, OracleError> {
        if cancel.is_cancelled() {
            return Err(OracleError::Cancelled);
        }
        Ok(self.result.clone())
    }

    fn name(&self) -> &str {
        "precomputed"
    }
}
