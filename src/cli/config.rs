//! Conversion of command-line arguments into library configuration

use crate::{
    config::{LimiterConfig, MaskConfig, ResizeFilter, SessionConfig, DEFAULT_MARKER_COLOR},
    types::{CompositeColor, SubjectMask},
};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Raw limiter arguments shared by `limit` and `segment`
#[derive(Debug, Clone, Copy)]
pub(crate) struct LimitArgs {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub filter: ResizeFilter,
    pub no_limit: bool,
}

/// Convert CLI arguments to library configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Parse a background argument (preset name or hex)
    pub(crate) fn background(value: &str) -> Result<CompositeColor> {
        value
            .parse::<CompositeColor>()
            .with_context(|| format!("Unknown background '{}' (try `palette`)", value))
    }

    /// Mask settings from optional threshold and marker arguments
    pub(crate) fn mask(threshold: Option<f32>, marker: Option<&str>) -> Result<MaskConfig> {
        let marker_color = match marker {
            Some(value) => match Self::background(value)? {
                CompositeColor::Solid(color) => color.0,
                CompositeColor::Transparent => bail!("Marker color must not be transparent"),
            },
            None => DEFAULT_MARKER_COLOR,
        };

        let config = MaskConfig {
            threshold: threshold.unwrap_or(MaskConfig::default().threshold),
            marker_color,
        };
        config.validate().context("Invalid mask settings")?;
        Ok(config)
    }

    /// Limiter settings; missing bounds fall back to the defaults
    pub(crate) fn limiter(args: LimitArgs) -> Result<Option<LimiterConfig>> {
        if args.no_limit {
            if args.max_width.is_some() || args.max_height.is_some() {
                bail!("--no-limit cannot be combined with --max-width/--max-height");
            }
            return Ok(None);
        }

        let defaults = LimiterConfig::default();
        let config = LimiterConfig::new(
            args.max_width.unwrap_or(defaults.max_width),
            args.max_height.unwrap_or(defaults.max_height),
        )
        .with_filter(args.filter);
        config.validate().context("Invalid resolution bound")?;
        Ok(Some(config))
    }

    /// Session settings for the `segment` command
    pub(crate) fn session(
        limit: LimitArgs,
        threshold: Option<f32>,
        marker: Option<&str>,
    ) -> Result<SessionConfig> {
        let config = SessionConfig {
            limiter: Self::limiter(limit)?,
            mask: Self::mask(threshold, marker)?,
            oracle_timeout: None,
        };
        config.validate().context("Invalid session configuration")?;
        Ok(config)
    }

    /// Load a JSON array of subject masks, validating each one
    pub(crate) fn load_masks(path: &Path) -> Result<Vec<SubjectMask>> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read masks from {}", path.display()))?;
        let masks: Vec<SubjectMask> = serde_json::from_str(&data)
            .with_context(|| format!("Malformed mask file {}", path.display()))?;
        for (index, mask) in masks.iter().enumerate() {
            mask.validate()
                .with_context(|| format!("Mask {} in {} is invalid", index, path.display()))?;
        }
        Ok(masks)
    }

    /// File-name fragment for a background argument
    ///
    /// `#FF0000` becomes `ff0000` and `Dark Gray` becomes `dark-gray`.
    pub(crate) fn background_suffix(value: &str) -> String {
        let words: Vec<String> = value
            .trim()
            .trim_start_matches('#')
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        if words.is_empty() {
            "composited".to_string()
        } else {
            words.join("-")
        }
    }

    /// `<dir>/<stem>_<suffix>.png` next to the input
    pub(crate) fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
        let stem = input.file_stem().unwrap_or_default();
        let dir = input.parent().unwrap_or(Path::new("."));
        dir.join(format!("{}_{}.png", stem.to_string_lossy(), suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn limit_args(max_width: Option<u32>, max_height: Option<u32>, no_limit: bool) -> LimitArgs {
        LimitArgs {
            max_width,
            max_height,
            filter: ResizeFilter::Bilinear,
            no_limit,
        }
    }

    #[test]
    fn test_background_parsing() {
        assert_eq!(
            CliConfigBuilder::background("Light-Gray").unwrap(),
            CompositeColor::LIGHT_GRAY
        );
        assert_eq!(
            CliConfigBuilder::background("#102030").unwrap(),
            CompositeColor::rgb(0x10, 0x20, 0x30)
        );
        assert!(CliConfigBuilder::background("mauve").is_err());
    }

    #[test]
    fn test_mask_settings() {
        let config = CliConfigBuilder::mask(Some(0.8), Some("green")).unwrap();
        assert_eq!(config.threshold, 0.8);
        assert_eq!(config.marker_color, [0, 255, 0, 255]);

        let defaults = CliConfigBuilder::mask(None, None).unwrap();
        assert_eq!(defaults, MaskConfig::default());

        assert!(CliConfigBuilder::mask(None, Some("transparent")).is_err());
        assert!(CliConfigBuilder::mask(Some(3.0), None).is_err());
    }

    #[test]
    fn test_limiter_settings() {
        let config = CliConfigBuilder::limiter(limit_args(Some(640), None, false))
            .unwrap()
            .unwrap();
        assert_eq!((config.max_width, config.max_height), (640, 1080));

        assert!(CliConfigBuilder::limiter(limit_args(None, None, true))
            .unwrap()
            .is_none());
        assert!(CliConfigBuilder::limiter(limit_args(Some(10), None, true)).is_err());
        assert!(CliConfigBuilder::limiter(limit_args(Some(0), None, false)).is_err());
    }

    #[test]
    fn test_load_masks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = r#"[{"origin_x": -1, "origin_y": 2, "width": 2, "height": 1,
                        "confidence": [0.2, 0.9]}]"#;
        file.write_all(json.as_bytes()).unwrap();

        let masks = CliConfigBuilder::load_masks(file.path()).unwrap();
        assert_eq!(masks.len(), 1);
        assert_eq!(masks[0].origin_x, -1);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(
            bad,
            r#"[{{"origin_x": 0, "origin_y": 0, "width": 2, "height": 2, "confidence": [0.5]}}]"#
        )
        .unwrap();
        assert!(CliConfigBuilder::load_masks(bad.path()).is_err());
    }

    #[test]
    fn test_default_output_path() {
        let path = CliConfigBuilder::default_output_path(Path::new("photos/cat.jpg"), "white");
        assert_eq!(path, PathBuf::from("photos/cat_white.png"));
    }

    #[test]
    fn test_background_suffix_is_file_name_safe() {
        assert_eq!(CliConfigBuilder::background_suffix("#FF0000"), "ff0000");
        assert_eq!(CliConfigBuilder::background_suffix("Dark Gray"), "dark-gray");
        assert_eq!(CliConfigBuilder::background_suffix("white"), "white");
        assert_eq!(CliConfigBuilder::background_suffix("#"), "composited");

        let path = CliConfigBuilder::default_output_path(
            Path::new("fg.png"),
            &CliConfigBuilder::background_suffix("#ff0000"),
        );
        assert_eq!(path, PathBuf::from("fg_ff0000.png"));
    }
}
