//! Reconstruction of an image-sized overlay from per-subject confidence masks
//!
//! Each [`SubjectMask`] covers its own sub-rectangle. Local pixel `(x, y)` maps
//! to image pixel `(origin_x + x, origin_y + y)` with no row or column offset.
//! Masks are painted in sequence order, so where sub-rectangles overlap the
//! later mask wins. Coordinates that fall outside the image are dropped.

use crate::{
    config::MaskConfig,
    error::{ComposeError, Result},
    types::{PixelBuffer, SubjectMask},
};
use image::{Rgba, RgbaImage};
use std::ops::Range;
use tracing::{debug, instrument};

/// Paints subject pixels above a confidence threshold onto a transparent canvas
#[derive(Debug, Clone, Default)]
pub struct MaskReconstructor {
    config: MaskConfig,
}

impl MaskReconstructor {
    /// Create a reconstructor with validated settings
    pub fn new(config: MaskConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &MaskConfig {
        &self.config
    }

    /// Build a `width` x `height` overlay from `masks` using the configured
    /// threshold and marker color
    pub fn reconstruct(
        &self,
        masks: &[SubjectMask],
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer> {
        Self::reconstruct_with(
            masks,
            width,
            height,
            self.config.threshold,
            self.config.marker_rgba(),
        )
    }

    /// Build a `width` x `height` overlay from `masks`
    ///
    /// Pixels whose confidence is strictly greater than `threshold` are set to
    /// `marker`; everything else stays fully transparent.
    ///
    /// # Errors
    /// - `InvalidImage` when the target canvas has zero area
    #[instrument(skip(masks, marker), fields(masks = masks.len(), width, height))]
    pub fn reconstruct_with(
        masks: &[SubjectMask],
        width: u32,
        height: u32,
        threshold: f32,
        marker: Rgba<u8>,
    ) -> Result<PixelBuffer> {
        if width == 0 || height == 0 {
            return Err(ComposeError::zero_area("mask reconstruction", width, height));
        }

        let mut canvas = RgbaImage::new(width, height);
        let mut painted = 0usize;
        for mask in masks {
            painted += Self::paint_mask(&mut canvas, mask, threshold, marker);
        }

        debug!(
            "Reconstructed {}x{} overlay from {} masks ({} pixels painted)",
            width,
            height,
            masks.len(),
            painted
        );
        Ok(PixelBuffer::from(canvas))
    }

    /// Paint one mask, returning the number of writes
    fn paint_mask(
        canvas: &mut RgbaImage,
        mask: &SubjectMask,
        threshold: f32,
        marker: Rgba<u8>,
    ) -> usize {
        let Some(cols) = Self::visible_range(mask.origin_x, mask.width, canvas.width()) else {
            return 0;
        };
        let Some(rows) = Self::visible_range(mask.origin_y, mask.height, canvas.height()) else {
            return 0;
        };

        let local_width = mask.width as usize;
        let mut painted = 0;
        for y in rows {
            let row_start = y as usize * local_width;
            // Oracle input is untrusted: a short confidence field ends the row early
            let Some(row) = mask.confidence.get(row_start..row_start + local_width) else {
                let available = mask.confidence.get(row_start..).unwrap_or(&[]);
                painted +=
                    Self::paint_row(canvas, mask, y, cols.clone(), available, threshold, marker);
                break;
            };
            painted += Self::paint_row(canvas, mask, y, cols.clone(), row, threshold, marker);
        }
        painted
    }

    fn paint_row(
        canvas: &mut RgbaImage,
        mask: &SubjectMask,
        y: u32,
        cols: Range<u32>,
        row: &[f32],
        threshold: f32,
        marker: Rgba<u8>,
    ) -> usize {
        let global_y = (i64::from(mask.origin_y) + i64::from(y)) as u32;
        let mut painted = 0;
        for x in cols {
            let Some(&confidence) = row.get(x as usize) else {
                break;
            };
            if confidence > threshold {
                let global_x = (i64::from(mask.origin_x) + i64::from(x)) as u32;
                canvas.put_pixel(global_x, global_y, marker);
                painted += 1;
            }
        }
        painted
    }

    /// Local coordinates of a mask axis that land inside `[0, bound)` once offset by `origin`
    fn visible_range(origin: i32, extent: u32, bound: u32) -> Option<Range<u32>> {
        let origin = i64::from(origin);
        let start = (-origin).max(0);
        let end = (i64::from(bound) - origin).min(i64::from(extent));
        (start < end).then(|| start as u32..end as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TRANSPARENT;

    const MARKER: Rgba<u8> = Rgba([255, 0, 255, 128]);

    fn mask(
        origin_x: i32,
        origin_y: i32,
        width: u32,
        height: u32,
        confidence: Vec<f32>,
    ) -> SubjectMask {
        SubjectMask {
            origin_x,
            origin_y,
            width,
            height,
            confidence,
        }
    }

    #[test]
    fn test_thresholding_single_mask() {
        let masks = [mask(0, 0, 2, 2, vec![0.9, 0.4, 0.6, 0.1])];
        let overlay = MaskReconstructor::default().reconstruct(&masks, 2, 2).unwrap();

        assert_eq!(overlay.pixel_at_index(0), Some(MARKER));
        assert_eq!(overlay.pixel_at_index(1), Some(TRANSPARENT));
        assert_eq!(overlay.pixel_at_index(2), Some(MARKER));
        assert_eq!(overlay.pixel_at_index(3), Some(TRANSPARENT));
    }

    #[test]
    fn test_threshold_is_strict() {
        let masks = [mask(0, 0, 1, 1, vec![0.5])];
        let overlay = MaskReconstructor::default().reconstruct(&masks, 1, 1).unwrap();
        assert_eq!(overlay.pixel(0, 0), Some(TRANSPARENT));
    }

    #[test]
    fn test_origin_maps_without_row_offset() {
        let masks = [mask(2, 1, 1, 1, vec![1.0])];
        let overlay = MaskReconstructor::default().reconstruct(&masks, 4, 3).unwrap();

        assert_eq!(overlay.pixel(2, 1), Some(MARKER));
        let painted = overlay.pixels().filter(|p| **p == MARKER).count();
        assert_eq!(painted, 1);
    }

    #[test]
    fn test_negative_origin_is_clipped() {
        let masks = [mask(-1, -1, 2, 2, vec![0.9, 0.9, 0.9, 0.8])];
        let overlay = MaskReconstructor::default().reconstruct(&masks, 2, 2).unwrap();

        // Only local (1, 1) lands inside the canvas, at global (0, 0)
        assert_eq!(overlay.pixel(0, 0), Some(MARKER));
        assert_eq!(overlay.pixel(1, 0), Some(TRANSPARENT));
        assert_eq!(overlay.pixel(0, 1), Some(TRANSPARENT));
    }

    #[test]
    fn test_later_masks_overwrite_earlier() {
        let first = Rgba([1, 1, 1, 255]);
        let masks = [
            mask(0, 0, 2, 1, vec![0.9, 0.9]),
            mask(1, 0, 1, 1, vec![0.9]),
        ];
        // Paint with two passes to distinguish which mask wrote last
        let mut canvas = RgbaImage::new(2, 1);
        MaskReconstructor::paint_mask(&mut canvas, &masks[0], 0.5, first);
        MaskReconstructor::paint_mask(&mut canvas, &masks[1], 0.5, MARKER);
        assert_eq!(*canvas.get_pixel(0, 0), first);
        assert_eq!(*canvas.get_pixel(1, 0), MARKER);
    }

    #[test]
    fn test_low_confidence_does_not_erase_earlier_mask() {
        let masks = [mask(0, 0, 1, 1, vec![0.9]), mask(0, 0, 1, 1, vec![0.1])];
        let overlay = MaskReconstructor::default().reconstruct(&masks, 1, 1).unwrap();
        assert_eq!(overlay.pixel(0, 0), Some(MARKER));
    }

    #[test]
    fn test_no_masks_gives_transparent_canvas() {
        let overlay = MaskReconstructor::default().reconstruct(&[], 3, 3).unwrap();
        assert_eq!(overlay.pixel_count(), 9);
        assert!(overlay.pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn test_zero_canvas_rejected() {
        let err = MaskReconstructor::default().reconstruct(&[], 0, 3).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidImage(_)));
    }

    #[test]
    fn test_short_confidence_field_is_tolerated() {
        let masks = [mask(0, 0, 2, 2, vec![0.9, 0.9, 0.9])];
        let overlay = MaskReconstructor::default().reconstruct(&masks, 2, 2).unwrap();
        assert_eq!(overlay.pixel(0, 1), Some(MARKER));
        assert_eq!(overlay.pixel(1, 1), Some(TRANSPARENT));
    }

    #[test]
    fn test_out_of_bounds_origins_never_escape_canvas() {
        let (width, height) = (5u32, 4u32);
        for origin_x in -7..8 {
            for origin_y in -6..7 {
                for extent_w in 0..7u32 {
                    for extent_h in 0..6u32 {
                        let n = (extent_w * extent_h) as usize;
                        let m = mask(origin_x, origin_y, extent_w, extent_h, vec![1.0; n]);
                        let overlay =
                            MaskReconstructor::default().reconstruct(&[m], width, height).unwrap();
                        assert_eq!(overlay.pixel_count(), (width * height) as usize);

                        let col_end = (origin_x + extent_w as i32).min(width as i32);
                        let row_end = (origin_y + extent_h as i32).min(height as i32);
                        let expected_cols = (origin_x.max(0)..col_end).count();
                        let expected_rows = (origin_y.max(0)..row_end).count();
                        let painted = overlay.pixels().filter(|p| **p == MARKER).count();
                        assert_eq!(painted, expected_cols * expected_rows);
                    }
                }
            }
        }
    }

    #[test]
    fn test_extreme_origins() {
        let masks = [
            mask(i32::MAX, 0, 3, 1, vec![1.0; 3]),
            mask(i32::MIN, i32::MIN, 3, 1, vec![1.0; 3]),
            mask(0, i32::MAX - 1, 1, 3, vec![1.0; 3]),
        ];
        let overlay = MaskReconstructor::default().reconstruct(&masks, 4, 4).unwrap();
        assert!(overlay.pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn test_custom_config() {
        let config = MaskConfig {
            threshold: 0.2,
            marker_color: [0, 0, 0, 255],
        };
        let reconstructor = MaskReconstructor::new(config).unwrap();
        let masks = [mask(0, 0, 2, 1, vec![0.3, 0.1])];
        let overlay = reconstructor.reconstruct(&masks, 2, 1).unwrap();
        assert_eq!(overlay.pixel(0, 0), Some(Rgba([0, 0, 0, 255])));
        assert_eq!(overlay.pixel(1, 0), Some(TRANSPARENT));

        assert!(MaskReconstructor::new(MaskConfig {
            threshold: -0.1,
            ..MaskConfig::default()
        })
        .is_err());
    }
}
