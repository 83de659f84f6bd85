//! Background compositing for foreground cutouts
//!
//! Compositing uses straight (non-premultiplied) alpha and the Porter-Duff
//! source-over operator. For an opaque background this is
//! `out = fg * fg_a + bg * (1 - fg_a)` per channel with an opaque result.
//! Channels are computed in integer arithmetic and rounded to nearest.

use crate::{
    error::{ComposeError, Result},
    types::{CompositeColor, PixelBuffer, TRANSPARENT},
};
use image::{Rgba, RgbaImage};
use std::{borrow::Cow, sync::Arc};
use tracing::{debug, instrument};

/// Side length of the transparency preview squares, in pixels
pub const CHECKER_SQUARE: u32 = 8;

/// Darker preview square (gray at ~30% opacity)
pub const CHECKER_DARK: Rgba<u8> = Rgba([0xA1, 0xA1, 0xA1, 0x4D]);

/// Lighter preview square (white at ~5% opacity)
pub const CHECKER_LIGHT: Rgba<u8> = Rgba([0xFF, 0xFF, 0xFF, 0x0D]);

/// Places foreground cutouts over solid colors or other buffers
pub struct Compositor;

impl Compositor {
    /// Composite `foreground` over a background color
    ///
    /// `CompositeColor::Transparent` returns the foreground itself (borrowed, no
    /// allocation). A solid color yields a fresh buffer of the foreground's
    /// size; the foreground is never modified.
    ///
    /// # Errors
    /// - `InvalidImage` when painting a solid color under a zero-area foreground
    #[instrument(
        skip(foreground),
        fields(width = foreground.width(), height = foreground.height())
    )]
    pub fn composite(
        foreground: &PixelBuffer,
        background: CompositeColor,
    ) -> Result<Cow<'_, PixelBuffer>> {
        let color = match background {
            CompositeColor::Transparent => return Ok(Cow::Borrowed(foreground)),
            CompositeColor::Solid(color) => color,
        };
        foreground.ensure_non_empty("composite")?;

        let (width, height) = foreground.dimensions();
        let mut output = RgbaImage::from_pixel(width, height, color);
        for (dst, src) in output.pixels_mut().zip(foreground.pixels()) {
            *dst = Self::blend_pixel(*src, *dst);
        }

        debug!("Composited {}x{} foreground over {}", width, height, background);
        Ok(Cow::Owned(PixelBuffer::from(output)))
    }

    /// Composite a shared foreground on the blocking thread pool
    ///
    /// The transparent choice hands back the same `Arc` without spawning.
    pub async fn composite_shared(
        foreground: Arc<PixelBuffer>,
        background: CompositeColor,
    ) -> Result<Arc<PixelBuffer>> {
        if background.is_transparent() {
            return Ok(foreground);
        }

        tokio::task::spawn_blocking(move || {
            Self::composite(&foreground, background).map(|out| Arc::new(out.into_owned()))
        })
        .await
        .map_err(|e| ComposeError::processing(format!("Compositing task failed: {}", e)))?
    }

    /// Composite `foreground` over a background buffer of identical size
    ///
    /// # Errors
    /// - `InvalidImage` when the dimensions differ or the foreground is empty
    pub fn composite_over(
        foreground: &PixelBuffer,
        background: &PixelBuffer,
    ) -> Result<PixelBuffer> {
        foreground.ensure_non_empty("composite")?;
        if foreground.dimensions() != background.dimensions() {
            return Err(ComposeError::invalid_image(format!(
                "Foreground is {}x{} but background is {}x{}",
                foreground.width(),
                foreground.height(),
                background.width(),
                background.height()
            )));
        }

        let mut output = background.as_rgba_image().clone();
        for (dst, src) in output.pixels_mut().zip(foreground.pixels()) {
            *dst = Self::blend_pixel(*src, *dst);
        }
        Ok(PixelBuffer::from(output))
    }

    /// Place `foreground` over the transparency preview checkerboard
    pub fn preview(foreground: &PixelBuffer) -> Result<PixelBuffer> {
        let (width, height) = foreground.dimensions();
        let board = Self::checkerboard(width, height, CHECKER_SQUARE, CHECKER_DARK, CHECKER_LIGHT);
        Self::composite_over(foreground, &board)
    }

    /// Build a checkerboard of `square`-pixel tiles, `even` where `(col + row)` is even
    #[must_use]
    pub fn checkerboard(
        width: u32,
        height: u32,
        square: u32,
        even: Rgba<u8>,
        odd: Rgba<u8>,
    ) -> PixelBuffer {
        let square = square.max(1);
        let board = RgbaImage::from_fn(width, height, |x, y| {
            if (x / square + y / square) % 2 == 0 {
                even
            } else {
                odd
            }
        });
        PixelBuffer::from(board)
    }

    /// Source-over blend of one straight-alpha pixel onto another
    #[must_use]
    pub fn blend_pixel(fg: Rgba<u8>, bg: Rgba<u8>) -> Rgba<u8> {
        let fg_a = u32::from(fg[3]);
        match fg_a {
            255 => return fg,
            0 => return bg,
            _ => {},
        }

        let bg_a = u32::from(bg[3]);
        let inv = 255 - fg_a;
        // Output alpha scaled by 255: fg_a + bg_a * (1 - fg_a)
        let out_a = fg_a * 255 + bg_a * inv;
        if out_a == 0 {
            return TRANSPARENT;
        }

        let channel = |f: u8, b: u8| -> u8 {
            let num = u32::from(f) * fg_a * 255 + u32::from(b) * bg_a * inv;
            ((num + out_a / 2) / out_a).min(255) as u8
        };

        Rgba([
            channel(fg[0], bg[0]),
            channel(fg[1], bg[1]),
            channel(fg[2], bg[2]),
            ((out_a + 127) / 255).min(255) as u8,
        ])
    }
}
