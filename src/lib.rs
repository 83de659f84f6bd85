#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Cutout Compose
//!
//! Compositing and mask reconstruction for subject cutouts.
//!
//! A photo goes through an optional resolution limit, is handed to an external
//! segmentation oracle, and comes back either as a ready foreground cutout or
//! as per-subject confidence masks. Masks are painted onto an image-sized
//! overlay. The resulting bitmap can then be placed over any background color.
//!
//! ## Features
//!
//! - **Resolution limiting**: aspect-preserving downscale before segmentation
//! - **Mask reconstruction**: thresholded, clipped, last-write-wins overlays
//! - **Compositing**: straight-alpha source-over onto solid colors or a preview checkerboard
//! - **Segmentation sessions**: observable state machine with stale-result protection
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cutout_compose::{
//!     CompositeColor, Compositor, PixelBuffer, SegmentationOracle, SegmentationSession,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(oracle: Arc<dyn SegmentationOracle>) -> anyhow::Result<()> {
//! let session = SegmentationSession::new(oracle);
//! let photo = PixelBuffer::from_encoded_bytes(&std::fs::read("photo.jpg")?)?;
//!
//! let cutout = session.process(photo).await?;
//! let on_white = Compositor::composite(&cutout, CompositeColor::WHITE)?;
//! on_white.save_png("photo_white.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface and tracing subscriber setup
//! - `tracing-json`: JSON log output for the CLI
//! - `webp-support`: WebP decoding
//!
//! To use only as a library without CLI dependencies:
//!
//! ```toml
//! [dependencies]
//! cutout-compose = { version = "0.1", default-features = false }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod mask;
pub mod oracle;
pub mod services;
pub mod session;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

use tokio::io::AsyncRead;

// Public API exports
pub use compositor::Compositor;
pub use config::{
    LimiterConfig, MaskConfig, ResizeFilter, SessionConfig, SessionConfigBuilder,
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MARKER_COLOR,
};
pub use error::{ComposeError, OracleError, Result};
pub use mask::MaskReconstructor;
pub use oracle::{PrecomputedOracle, SegmentationOracle};
pub use services::{LoggingObserver, NoOpObserver, StateObserver};
pub use session::{
    SegmentationSession, SegmentationState, SessionTicket, SessionTimings, StateTransition,
};
pub use types::{CompositeColor, PixelBuffer, SegmentationResult, SubjectMask, TRANSPARENT};
pub use utils::{ColorParser, ResolutionLimiter};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Composite an encoded foreground (PNG, JPEG, ...) over `background`
///
/// Returns the composited image encoded as PNG.
///
/// # Examples
/// ```rust,no_run
/// use cutout_compose::{composite_bytes, CompositeColor};
///
/// # fn example(upload: Vec<u8>) -> cutout_compose::Result<()> {
/// let png = composite_bytes(&upload, CompositeColor::BLACK)?;
/// std::fs::write("on_black.png", png)?;
/// # Ok(())
/// # }
/// ```
pub fn composite_bytes(foreground: &[u8], background: CompositeColor) -> Result<Vec<u8>> {
    let foreground = PixelBuffer::from_encoded_bytes(foreground)?;
    Compositor::composite(&foreground, background)?.to_png_bytes()
}

/// Composite an encoded foreground read from an async stream
pub async fn composite_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    background: CompositeColor,
) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer).await?;
    composite_bytes(&buffer, background)
}
