//! Color parsing and conversion utilities

use crate::error::{ComposeError, Result};
use image::Rgba;

/// Utility for parsing and converting colors
pub struct ColorParser;

impl ColorParser {
    /// Parse a hex color string into an RGBA pixel
    ///
    /// Supports `#RGB`, `#RRGGBB` and `#RRGGBBAA` (the `#` is optional).
    /// Colors without an alpha component are opaque.
    ///
    /// # Examples
    /// ```rust
    /// use cutout_compose::utils::ColorParser;
    ///
    /// let white = ColorParser::parse_hex("#ffffff")?;
    /// let red = ColorParser::parse_hex("#f00")?;
    /// let half_blue = ColorParser::parse_hex("0000ff80")?;
    /// assert_eq!(half_blue.0, [0, 0, 255, 128]);
    /// # Ok::<(), cutout_compose::ComposeError>(())
    /// ```
    pub fn parse_hex(hex: &str) -> Result<Rgba<u8>> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ComposeError::invalid_config(format!(
                "Color '{}' must be in #RRGGBB, #RRGGBBAA or #RGB format",
                hex
            )));
        }

        match hex.len() {
            3 => {
                let r = Self::component(hex, 0, 1, "red")? * 17;
                let g = Self::component(hex, 1, 2, "green")? * 17;
                let b = Self::component(hex, 2, 3, "blue")? * 17;
                Ok(Rgba([r, g, b, 255]))
            },
            6 => Ok(Rgba([
                Self::component(hex, 0, 2, "red")?,
                Self::component(hex, 2, 4, "green")?,
                Self::component(hex, 4, 6, "blue")?,
                255,
            ])),
            8 => Ok(Rgba([
                Self::component(hex, 0, 2, "red")?,
                Self::component(hex, 2, 4, "green")?,
                Self::component(hex, 4, 6, "blue")?,
                Self::component(hex, 6, 8, "alpha")?,
            ])),
            _ => Err(ComposeError::invalid_config(format!(
                "Color '{}' must be in #RRGGBB, #RRGGBBAA or #RGB format",
                hex
            ))),
        }
    }

    fn component(hex: &str, start: usize, end: usize, name: &str) -> Result<u8> {
        hex.get(start..end)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .ok_or_else(|| {
                ComposeError::invalid_config(format!("Invalid {} component in hex color", name))
            })
    }

    /// Convert an RGBA pixel to a lowercase hex string
    ///
    /// Opaque colors are written as `#rrggbb`, others as `#rrggbbaa`.
    #[must_use]
    pub fn to_hex(color: Rgba<u8>) -> String {
        let Rgba([r, g, b, a]) = color;
        if a == 255 {
            format!("#{:02x}{:02x}{:02x}", r, g, b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
        }
    }
}
