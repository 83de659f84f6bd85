//! Configuration types for compositing and segmentation sessions

use crate::error::{ComposeError, Result};
use image::{imageops::FilterType, Rgba};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Confidence a mask pixel must exceed to be painted
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Half-transparent magenta used to paint reconstructed subject pixels
pub const DEFAULT_MARKER_COLOR: [u8; 4] = [255, 0, 255, 128];

/// Default bound applied before submitting an image for segmentation (1080p landscape)
pub const DEFAULT_MAX_WIDTH: u32 = 1920;
pub const DEFAULT_MAX_HEIGHT: u32 = 1080;

/// Resampling filter used when downscaling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    /// Nearest neighbour (fastest, blocky)
    Nearest,
    /// Bilinear interpolation
    #[default]
    Bilinear,
    /// Catmull-Rom cubic
    CatmullRom,
    /// Gaussian
    Gaussian,
    /// Lanczos with window 3 (slowest, sharpest)
    Lanczos3,
}

impl ResizeFilter {
    #[must_use]
    pub fn to_filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl std::fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Bilinear => write!(f, "bilinear"),
            Self::CatmullRom => write!(f, "catmullrom"),
            Self::Gaussian => write!(f, "gaussian"),
            Self::Lanczos3 => write!(f, "lanczos3"),
        }
    }
}

/// Bounds for the resolution limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Maximum output width in pixels
    pub max_width: u32,
    /// Maximum output height in pixels
    pub max_height: u32,
    /// Resampling filter used when the image must shrink
    #[serde(default)]
    pub filter: ResizeFilter,
}

impl LimiterConfig {
    #[must_use]
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
            filter: ResizeFilter::default(),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Validate the bounds
    pub fn validate(&self) -> Result<()> {
        if self.max_width == 0 {
            return Err(ComposeError::config_value_error(
                "max_width",
                self.max_width,
                "1 or more",
                Some(DEFAULT_MAX_WIDTH),
            ));
        }
        if self.max_height == 0 {
            return Err(ComposeError::config_value_error(
                "max_height",
                self.max_height,
                "1 or more",
                Some(DEFAULT_MAX_HEIGHT),
            ));
        }
        Ok(())
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WIDTH, DEFAULT_MAX_HEIGHT)
    }
}

/// Mask reconstruction settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskConfig {
    /// Pixels whose confidence is strictly greater than this are painted
    pub threshold: f32,
    /// RGBA color painted on subject pixels
    pub marker_color: [u8; 4],
}

impl MaskConfig {
    #[must_use]
    pub fn marker_rgba(&self) -> Rgba<u8> {
        Rgba(self.marker_color)
    }

    /// Validate the threshold range
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(ComposeError::config_value_error(
                "threshold",
                self.threshold,
                "0.0-1.0",
                Some(DEFAULT_CONFIDENCE_THRESHOLD),
            ));
        }
        Ok(())
    }
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            marker_color: DEFAULT_MARKER_COLOR,
        }
    }
}

/// Configuration for a segmentation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Downscale bound applied before the oracle sees the image (`None` = submit as-is)
    ///
    /// Missing from JSON means the default bound; only an explicit `null` disables it.
    #[serde(default = "default_limiter")]
    pub limiter: Option<LimiterConfig>,

    /// Reconstruction settings for mask-shaped oracle results
    #[serde(default)]
    pub mask: MaskConfig,

    /// Give up on the oracle after this long (`None` = wait indefinitely)
    #[serde(default)]
    pub oracle_timeout: Option<Duration>,
}

fn default_limiter() -> Option<LimiterConfig> {
    Some(LimiterConfig::default())
}

impl SessionConfig {
    /// Create a new session configuration builder
    #[must_use]
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Load a configuration from JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ComposeError::invalid_config(format!("Malformed session config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every nested setting
    pub fn validate(&self) -> Result<()> {
        if let Some(limiter) = &self.limiter {
            limiter.validate()?;
        }
        self.mask.validate()?;
        if self.oracle_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ComposeError::invalid_config(
                "oracle_timeout must be greater than zero (use None to disable)",
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            limiter: default_limiter(),
            mask: MaskConfig::default(),
            oracle_timeout: None,
        }
    }
}

/// Builder for `SessionConfig`
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    #[must_use]
    pub fn max_resolution(mut self, max_width: u32, max_height: u32) -> Self {
        let filter = self.config.limiter.map(|l| l.filter).unwrap_or_default();
        self.config.limiter = Some(LimiterConfig::new(max_width, max_height).with_filter(filter));
        self
    }

    #[must_use]
    pub fn resize_filter(mut self, filter: ResizeFilter) -> Self {
        if let Some(limiter) = self.config.limiter.as_mut() {
            limiter.filter = filter;
        }
        self
    }

    /// Submit images to the oracle at their original resolution
    #[must_use]
    pub fn no_resolution_limit(mut self) -> Self {
        self.config.limiter = None;
        self
    }

    #[must_use]
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.config.mask.threshold = threshold;
        self
    }

    #[must_use]
    pub fn marker_color(mut self, color: [u8; 4]) -> Self {
        self.config.mask.marker_color = color;
        self
    }

    #[must_use]
    pub fn oracle_timeout(mut self, timeout: Duration) -> Self {
        self.config.oracle_timeout = Some(timeout);
        self
    }

    /// Build the session configuration
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::InvalidConfig` for:
    /// - Thresholds outside `[0, 1]`
    /// - Zero resolution bounds
    /// - A zero oracle timeout
    pub fn build(self) -> Result<SessionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.limiter, Some(LimiterConfig::new(1920, 1080)));
        assert_eq!(config.mask.threshold, 0.5);
        assert_eq!(config.mask.marker_rgba(), Rgba([255, 0, 255, 128]));
        assert!(config.oracle_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = SessionConfig::builder()
            .max_resolution(800, 600)
            .resize_filter(ResizeFilter::Lanczos3)
            .threshold(0.7)
            .marker_color([0, 255, 0, 255])
            .oracle_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        let limiter = config.limiter.unwrap();
        assert_eq!((limiter.max_width, limiter.max_height), (800, 600));
        assert_eq!(limiter.filter, ResizeFilter::Lanczos3);
        assert_eq!(config.mask.threshold, 0.7);
        assert_eq!(config.oracle_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        let err = SessionConfig::builder().threshold(1.5).build().unwrap_err();
        assert!(err.to_string().contains("threshold"));
        assert!(err.to_string().contains("0.0-1.0"));

        assert!(SessionConfig::builder().threshold(f32::NAN).build().is_err());
        assert!(SessionConfig::builder().max_resolution(0, 10).build().is_err());
        assert!(SessionConfig::builder()
            .oracle_timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn test_no_resolution_limit() {
        let config = SessionConfig::builder().no_resolution_limit().build().unwrap();
        assert!(config.limiter.is_none());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "limiter": {"max_width": 640, "max_height": 480, "filter": "nearest"},
            "mask": {"threshold": 0.25, "marker_color": [1, 2, 3, 4]}
        }"#;
        let config = SessionConfig::from_json_str(json).unwrap();
        assert_eq!(
            config.limiter,
            Some(LimiterConfig::new(640, 480).with_filter(ResizeFilter::Nearest))
        );
        assert_eq!(config.mask.marker_color, [1, 2, 3, 4]);
        assert!(config.oracle_timeout.is_none());

        let bad = r#"{"limiter": null, "mask": {"threshold": 2.0, "marker_color": [0,0,0,0]}}"#;
        assert!(SessionConfig::from_json_str(bad).is_err());
        assert!(SessionConfig::from_json_str("{").is_err());
    }

    #[test]
    fn test_from_json_missing_fields_use_defaults() {
        let config = SessionConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.limiter, Some(LimiterConfig::new(1920, 1080)));

        let unlimited = SessionConfig::from_json_str(r#"{"limiter": null}"#).unwrap();
        assert!(unlimited.limiter.is_none());
    }

    #[test]
    fn test_filter_mapping() {
        assert_eq!(ResizeFilter::default().to_filter_type(), FilterType::Triangle);
        assert_eq!(ResizeFilter::Lanczos3.to_filter_type(), FilterType::Lanczos3);
        assert_eq!(ResizeFilter::CatmullRom.to_string(), "catmullrom");
    }
}
