//! Resolution limiting for images submitted to segmentation
//!
//! Large photos are downscaled to a bounded resolution before segmentation to
//! keep memory and processing time predictable. The scaled copy replaces the
//! original, which is released as soon as the copy exists.

use crate::{
    config::LimiterConfig,
    error::{ComposeError, Result},
    types::PixelBuffer,
};
use tracing::{debug, instrument};

/// Aspect-ratio preserving downscaler
pub struct ResolutionLimiter;

impl ResolutionLimiter {
    /// Bound `image` to `config.max_width` x `config.max_height`
    ///
    /// Images already within bounds are returned unchanged (same allocation).
    /// Otherwise the image is resampled with `config.filter` and the input is
    /// dropped before returning.
    ///
    /// # Errors
    /// - `InvalidImage` for zero-area input
    /// - `InvalidConfig` for zero bounds
    #[instrument(
        skip(image, config),
        fields(
            width = image.width(),
            height = image.height(),
            max_width = config.max_width,
            max_height = config.max_height
        )
    )]
    pub fn limit(image: PixelBuffer, config: &LimiterConfig) -> Result<PixelBuffer> {
        image.ensure_non_empty("resolution limit")?;
        config.validate()?;

        let (width, height) = image.dimensions();
        if width <= config.max_width && height <= config.max_height {
            return Ok(image);
        }

        let (new_width, new_height) =
            Self::scaled_dimensions(width, height, config.max_width, config.max_height)?;

        let scaled = image::imageops::resize(
            image.as_rgba_image(),
            new_width,
            new_height,
            config.filter.to_filter_type(),
        );
        drop(image);

        debug!(
            "Downscaled {}x{} -> {}x{} ({})",
            width, height, new_width, new_height, config.filter
        );
        Ok(PixelBuffer::from(scaled))
    }

    /// Bound `image` with the default bilinear filter
    pub fn limit_to(image: PixelBuffer, max_width: u32, max_height: u32) -> Result<PixelBuffer> {
        Self::limit(image, &LimiterConfig::new(max_width, max_height))
    }

    /// Output dimensions for a `width` x `height` image bounded by `max_width` x `max_height`
    ///
    /// Equivalent to `floor(side * min(max_width / width, max_height / height))`
    /// evaluated in exact integer arithmetic: the limiting side lands exactly on
    /// its bound and the other side is floored. Neither side drops below one pixel.
    pub fn scaled_dimensions(
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    ) -> Result<(u32, u32)> {
        if width == 0 || height == 0 {
            return Err(ComposeError::zero_area("resolution limit", width, height));
        }
        if max_width == 0 || max_height == 0 {
            return Err(ComposeError::invalid_config(format!(
                "Resolution bound must be non-zero, got {}x{}",
                max_width, max_height
            )));
        }
        if width <= max_width && height <= max_height {
            return Ok((width, height));
        }

        let (w, h) = (u64::from(width), u64::from(height));
        let (max_w, max_h) = (u64::from(max_width), u64::from(max_height));

        // max_w / w <= max_h / h  <=>  max_w * h <= max_h * w
        let (new_w, new_h) = if max_w * h <= max_h * w {
            (max_w, h * max_w / w)
        } else {
            (w * max_h / h, max_h)
        };

        // Both values are bounded by the u32 maxima above
        Ok((new_w.max(1) as u32, new_h.max(1) as u32))
    }
}
