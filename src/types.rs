//! Core types for cutout compositing operations

use crate::{
    error::{ComposeError, Result},
    utils::ColorParser,
};
use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};

/// Fully transparent pixel, the initial value of every overlay canvas
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Row-major grid of RGBA pixels
///
/// Wraps an [`RgbaImage`], so `pixels.len() == width * height` holds by
/// construction. A buffer is owned by exactly one component at a time; the
/// operations that replace a buffer take it by value and drop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Create a fully transparent buffer
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    /// Create a buffer filled with a single color
    #[must_use]
    pub fn from_pixel(width: u32, height: u32, pixel: Rgba<u8>) -> Self {
        Self {
            image: ImageBuffer::from_pixel(width, height, pixel),
        }
    }

    /// Create a buffer from raw RGBA bytes (4 bytes per pixel, row-major)
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let actual = data.len();
        ImageBuffer::from_raw(width, height, data)
            .map(|image| Self { image })
            .ok_or_else(|| {
                ComposeError::invalid_image(format!(
                    "raw buffer of {} bytes does not describe a {}x{} RGBA image",
                    actual, width, height
                ))
            })
    }

    /// Decode an encoded image (PNG, JPEG) into an RGBA buffer
    pub fn from_encoded_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes).map_err(|e| {
            ComposeError::invalid_image(format!("Failed to decode image from bytes: {}", e))
        })?;
        let buffer = Self::from(decoded);
        buffer.ensure_non_empty("decode")?;
        Ok(buffer)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Buffer dimensions as `(width, height)`
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Number of pixels (`width * height`)
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.image.width() as usize * self.image.height() as usize
    }

    /// Whether the buffer has zero area
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    /// Fail with `InvalidImage` when the buffer has zero area
    pub fn ensure_non_empty(&self, operation: &str) -> Result<()> {
        if self.is_empty() {
            return Err(ComposeError::zero_area(
                operation,
                self.image.width(),
                self.image.height(),
            ));
        }
        Ok(())
    }

    /// Pixel at `(x, y)`, or `None` outside the buffer
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    /// Pixel at row-major index `y * width + x`
    #[must_use]
    pub fn pixel_at_index(&self, index: usize) -> Option<Rgba<u8>> {
        let width = self.image.width() as usize;
        if width == 0 {
            return None;
        }
        self.pixel((index % width) as u32, (index / width) as u32)
    }

    /// Iterate pixels in row-major order
    pub fn pixels(&self) -> impl Iterator<Item = &Rgba<u8>> {
        self.image.pixels()
    }

    /// Raw RGBA bytes in row-major order
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    #[must_use]
    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.image
    }

    pub(crate) fn as_rgba_image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    #[must_use]
    pub fn into_rgba_image(self) -> RgbaImage {
        self.image
    }

    /// Encode the buffer as PNG with alpha channel
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image.write_to(&mut cursor, image::ImageFormat::Png)?;
        Ok(buffer)
    }

    /// Save the buffer as PNG with alpha channel
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.image
            .save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        Self { image }
    }
}

impl From<DynamicImage> for PixelBuffer {
    fn from(image: DynamicImage) -> Self {
        Self {
            image: image.into_rgba8(),
        }
    }
}

/// One detected subject's confidence field in its own local sub-rectangle
///
/// `origin_x`/`origin_y` place the sub-rectangle in image coordinates and may
/// lie partially or entirely outside the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectMask {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: u32,
    pub height: u32,
    /// Per-pixel foreground confidence in `[0.0, 1.0]`, row-major
    pub confidence: Vec<f32>,
}

impl SubjectMask {
    /// Create a validated subject mask
    pub fn new(
        origin_x: i32,
        origin_y: i32,
        width: u32,
        height: u32,
        confidence: Vec<f32>,
    ) -> Result<Self> {
        let mask = Self {
            origin_x,
            origin_y,
            width,
            height,
            confidence,
        };
        mask.validate()?;
        Ok(mask)
    }

    /// Check that the confidence field matches the extent and lies in `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        let expected = self.width as usize * self.height as usize;
        if self.confidence.len() != expected {
            return Err(ComposeError::invalid_mask(format!(
                "{}x{} mask needs {} confidence values, got {}",
                self.width,
                self.height,
                expected,
                self.confidence.len()
            )));
        }

        if let Some((index, value)) = self
            .confidence
            .iter()
            .enumerate()
            .find(|(_, c)| !(0.0..=1.0).contains(*c))
        {
            return Err(ComposeError::invalid_mask(format!(
                "confidence {} at index {} is outside [0, 1]",
                value, index
            )));
        }

        Ok(())
    }

    /// Confidence at local coordinates, `None` outside the field
    #[must_use]
    pub fn confidence_at(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.confidence.get(index).copied()
    }
}

/// The two result shapes the segmentation oracle may return
#[derive(Debug, Clone)]
pub enum SegmentationResult {
    /// Foreground already separated from the background (transparent elsewhere)
    WholeImageForeground(PixelBuffer),
    /// Per-subject confidence masks in subject-local coordinates
    SubjectMasks(Vec<SubjectMask>),
}

impl SegmentationResult {
    /// Short label for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WholeImageForeground(_) => "foreground",
            Self::SubjectMasks(_) => "subject_masks",
        }
    }
}

/// Background choice for compositing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CompositeColor {
    /// Pass-through: the foreground is returned unchanged
    #[default]
    Transparent,
    /// Solid RGBA background painted under the foreground
    Solid(Rgba<u8>),
}

impl CompositeColor {
    pub const WHITE: Self = Self::Solid(Rgba([255, 255, 255, 255]));
    pub const BLACK: Self = Self::Solid(Rgba([0, 0, 0, 255]));
    pub const GREEN: Self = Self::Solid(Rgba([0, 255, 0, 255]));
    pub const YELLOW: Self = Self::Solid(Rgba([255, 255, 0, 255]));
    pub const MAGENTA: Self = Self::Solid(Rgba([255, 0, 255, 255]));
    pub const BLUE: Self = Self::Solid(Rgba([0, 0, 255, 255]));
    pub const RED: Self = Self::Solid(Rgba([255, 0, 0, 255]));
    pub const GRAY: Self = Self::Solid(Rgba([0x88, 0x88, 0x88, 255]));
    pub const CYAN: Self = Self::Solid(Rgba([0, 255, 255, 255]));
    pub const DARK_GRAY: Self = Self::Solid(Rgba([0x44, 0x44, 0x44, 255]));
    pub const LIGHT_GRAY: Self = Self::Solid(Rgba([0xCC, 0xCC, 0xCC, 255]));

    /// Solid color from RGBA components; alpha 0 collapses to `Transparent`
    #[must_use]
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        if a == 0 {
            Self::Transparent
        } else {
            Self::Solid(Rgba([r, g, b, a]))
        }
    }

    /// Opaque solid color
    #[must_use]
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::Solid(Rgba([r, g, b, 255]))
    }

    /// Preset background choices in editor order
    #[must_use]
    pub fn palette() -> [(&'static str, CompositeColor); 12] {
        [
            ("transparent", Self::Transparent),
            ("white", Self::WHITE),
            ("black", Self::BLACK),
            ("green", Self::GREEN),
            ("yellow", Self::YELLOW),
            ("magenta", Self::MAGENTA),
            ("blue", Self::BLUE),
            ("red", Self::RED),
            ("gray", Self::GRAY),
            ("cyan", Self::CYAN),
            ("darkgray", Self::DARK_GRAY),
            ("lightgray", Self::LIGHT_GRAY),
        ]
    }

    /// Look up a preset by name (case-insensitive, `_`/`-`/spaces ignored)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let normalized = match normalized.as_str() {
            "grey" => "gray",
            "darkgrey" => "darkgray",
            "lightgrey" => "lightgray",
            other => other,
        };
        Self::palette()
            .into_iter()
            .find(|(preset, _)| *preset == normalized)
            .map(|(_, color)| color)
    }

    #[must_use]
    pub fn is_transparent(&self) -> bool {
        matches!(self, Self::Transparent)
    }
}

impl fmt::Display for CompositeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transparent => write!(f, "transparent"),
            Self::Solid(color) => write!(f, "{}", ColorParser::to_hex(*color)),
        }
    }
}

impl FromStr for CompositeColor {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Some(preset) = Self::from_name(trimmed) {
            return Ok(preset);
        }
        let Rgba([r, g, b, a]) = ColorParser::parse_hex(trimmed)?;
        Ok(Self::rgba(r, g, b, a))
    }
}

impl TryFrom<String> for CompositeColor {
    type Error = ComposeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CompositeColor> for String {
    fn from(color: CompositeColor) -> Self {
        color.to_string()
    }
}
