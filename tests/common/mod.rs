//! Shared test doubles for session tests

#![allow(dead_code)]

use async_trait::async_trait;
use cutout_compose::{OracleError, PixelBuffer, SegmentationOracle, SegmentationResult};
use image::Rgba;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

type Outcome = Result<SegmentationResult, OracleError>;

/// One submission waiting for the test to answer it
pub struct PendingRequest {
    pub dimensions: (u32, u32),
    pub cancel: CancellationToken,
    reply: oneshot::Sender<Outcome>,
}

impl PendingRequest {
    /// Deliver the oracle's answer, even if the session gave up on it
    pub fn reply(self, outcome: Outcome) {
        let _ = self.reply.send(outcome);
    }
}

/// Oracle whose answers are supplied by the test, in any order
///
/// Cancellation is ignored so late answers still reach the session.
pub struct ManualOracle {
    requests: mpsc::UnboundedSender<PendingRequest>,
}

impl ManualOracle {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PendingRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { requests: tx }), rx)
    }
}

#[async_trait]
impl SegmentationOracle for ManualOracle {
    async fn submit(&self, image: &PixelBuffer, cancel: CancellationToken) -> Outcome {
        let (reply, answer) = oneshot::channel();
        let request = PendingRequest {
            dimensions: image.dimensions(),
            cancel,
            reply,
        };
        if self.requests.send(request).is_err() {
            return Err(OracleError::unavailable("test harness dropped"));
        }
        answer.await.unwrap_or(Err(OracleError::Cancelled))
    }

    fn name(&self) -> &str {
        "manual"
    }
}

/// Solid foreground of the given size
pub fn solid(width: u32, height: u32, color: [u8; 4]) -> PixelBuffer {
    PixelBuffer::from_pixel(width, height, Rgba(color))
}

/// Foreground with an opaque left half and a clear right half
pub fn half_cutout(width: u32, height: u32, color: [u8; 3]) -> PixelBuffer {
    let mut image = image::RgbaImage::new(width, height);
    for (x, _, pixel) in image.enumerate_pixels_mut() {
        if x < width / 2 {
            *pixel = Rgba([color[0], color[1], color[2], 255]);
        }
    }
    PixelBuffer::from(image)
}
