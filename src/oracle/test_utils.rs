//! Mock oracles for unit tests

use super::SegmentationOracle;
use crate::{
    error::OracleError,
    types::{PixelBuffer, SegmentationResult},
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Scripted oracle that records every submitted image size
#[derive(Debug, Clone)]
pub struct MockOracle {
    /// Answer returned for every submission
    response: std::result::Result<SegmentationResult, OracleError>,
    /// Simulated processing time
    delay: Option<Duration>,
    /// Dimensions of each submitted image, in order
    call_history: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl MockOracle {
    /// Oracle answering with an empty mask list
    #[must_use]
    pub fn new() -> Self {
        Self {
            response: Ok(SegmentationResult::SubjectMasks(Vec::new())),
            delay: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Oracle answering with a fixed result
    #[must_use]
    pub fn with_result(result: SegmentationResult) -> Self {
        let mut oracle = Self::new();
        oracle.response = Ok(result);
        oracle
    }

    /// Oracle that always fails with `error`
    #[must_use]
    pub fn failing(error: OracleError) -> Self {
        let mut oracle = Self::new();
        oracle.response = Err(error);
        oracle
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<(u32, u32)> {
        self.call_history.lock().unwrap().clone()
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SegmentationOracle for MockOracle {
    async fn submit(
        &self,
        image: &PixelBuffer,
        cancel: CancellationToken,
    ) -> std::result::Result<SegmentationResult, OracleError> {
        self.call_history.lock().unwrap().push(image.dimensions());

        if let Some(delay) = self.delay {
            tokio::select! {
                () = tokio::time::sleep(delay) => {},
                () = cancel.cancelled() => return Err(OracleError::Cancelled),
            }
        }

        self.response.clone()
    }

    fn name(&self) -> &str {
        "mock"
    }
}
