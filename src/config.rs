//! Configuration module.
//!
//! Handles loading, validating, and merging `lensframe.toml`. Stock defaults
//! are serialized to a TOML table, the user file is merged on top, and the
//! result is deserialized and validated. Command-line flags are applied
//! after that by the binary.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [frame]
//! show_model = true
//! show_lens = false
//! show_tech_specs = true
//! show_date = true
//! show_gps = true
//! show_logo = true
//! brand = "Auto"            # "Auto", "None", or a brand name
//! frame_style = "solid"     # "solid" or "glass"
//! frame_color = "#ffffff"
//! text_color = "#000000"
//! padding = 10              # Bar height, % of image height (5-25)
//! blur_strength = 30        # Glass blur (0-100)
//! glass_opacity = 20        # Glass tint, % (0-90)
//!
//! [output]
//! suffix = "-framed"        # Appended to the file stem
//! quality = 95              # JPEG quality (1-100)
//! logo_policy = "skip"      # "skip" or "fail" when a logo cannot be drawn
//!
//! [logos]
//! directory = "logos"       # Extra <Brand>.svg files (optional)
//!
//! [processing]
//! max_processes = 4         # Batch workers (default: all cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early. Out-of-range numbers are
//! clamped with a warning rather than rejected, matching how the renderer
//! treats them.

use crate::imaging::{LogoPolicy, Quality};
use crate::style::{BLUR_RANGE, GLASS_OPACITY_RANGE, PADDING_RANGE, Style};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "lensframe.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `lensframe.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LensframeConfig {
    /// Default style for every render.
    pub frame: Style,
    /// Where and how rendered files are written.
    pub output: OutputConfig,
    /// Extra logo assets.
    pub logos: LogosConfig,
    /// Parallel batch settings.
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Appended to the source file stem, e.g. `IMG_0001-framed.jpg`.
    pub suffix: String,
    pub quality: u32,
    pub logo_policy: LogoPolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: "-framed".to_string(),
            quality: Quality::default().value() as u32,
            logo_policy: LogoPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogosConfig {
    /// Directory of `<Brand>.svg` files. Relative paths resolve against the
    /// directory holding the config file.
    pub directory: Option<PathBuf>,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel render workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

fn clamp_with_warning(key: &str, value: u32, range: (u32, u32)) -> u32 {
    let clamped = value.clamp(range.0, range.1);
    if clamped != value {
        log::warn!(
            "{key} = {value} is outside {}-{}, using {clamped}",
            range.0,
            range.1
        );
    }
    clamped
}

impl LensframeConfig {
    /// Validate the config, clamping numeric ranges.
    ///
    /// Only values that cannot be repaired are errors.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let frame = &mut self.frame;
        frame.padding = clamp_with_warning("frame.padding", frame.padding, PADDING_RANGE);
        frame.blur_strength =
            clamp_with_warning("frame.blur_strength", frame.blur_strength, BLUR_RANGE);
        frame.glass_opacity = clamp_with_warning(
            "frame.glass_opacity",
            frame.glass_opacity,
            GLASS_OPACITY_RANGE,
        );
        self.output.quality = clamp_with_warning("output.quality", self.output.quality, (1, 100));

        if self.output.suffix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "output.suffix must not contain path separators".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(self)
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.output.quality)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(LensframeConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<LensframeConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: LensframeConfig = merged.try_into()?;
    config.validate()
}

/// Load config from the file at `path`, or stock defaults when it is absent.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// validates the result, and anchors a relative logo directory to the
/// file's own directory.
pub fn load_config(path: &Path) -> Result<LensframeConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    if overlay.is_some() {
        log::debug!("Loaded config from {}", path.display());
    }
    let mut config = resolve_config(base, overlay)?;

    if let Some(dir) = config.logos.directory.take() {
        let anchored = match path.parent() {
            Some(parent) if dir.is_relative() => parent.join(dir),
            _ => dir,
        };
        config.logos.directory = Some(anchored);
    }
    Ok(config)
}

/// Returns a fully-commented stock `lensframe.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# LensFrame Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# lensframe reads ./lensframe.toml, or the file given with --config.
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Frame: what the information bar shows and how it looks
# ---------------------------------------------------------------------------
[frame]
show_model = true
# Append " | <lens>" after the model. Turned on automatically for photos
# that record a lens when rendering with --adapt.
show_lens = false
# Focal length, aperture, shutter speed and ISO.
show_tech_specs = true
show_date = true
show_gps = true
show_logo = true

# Override any metadata field. Empty means "use what the photo says".
custom_model = ""
custom_lens = ""
custom_focal_length = ""
custom_aperture = ""
custom_shutter_speed = ""
custom_iso = ""
custom_date_time = ""
custom_gps = ""

# "Auto" picks the logo from the camera make, "None" hides it,
# anything else names a brand (see `lensframe brands`).
brand = "Auto"

# "solid" fills the bar with frame_color.
# "glass" stretches and blurs the bottom of the photo, tinted with frame_color.
frame_style = "solid"

# Colors accept #rgb, #rrggbb, #rrggbbaa, rgb(...), rgba(...) or a CSS name.
frame_color = "#ffffff"
text_color = "#000000"

# Bar height as a percentage of the photo height (5-25).
padding = 10

# Glass only: blur strength (0-100) and tint opacity in percent (0-90).
blur_strength = 30
glass_opacity = 20

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Appended to the file stem: IMG_0001.jpg -> IMG_0001-framed.jpg
suffix = "-framed"

# JPEG quality (1 = worst, 100 = best).
quality = 95

# What to do when a logo fails to render: "skip" draws the frame without
# it, "fail" aborts that image.
logo_policy = "skip"

# ---------------------------------------------------------------------------
# Logos
# ---------------------------------------------------------------------------
[logos]
# Directory of <Brand>.svg files that add to or replace the built-in logos.
# Write {{FILL}} wherever the logo should take the text color.
# Relative paths resolve against this file's directory.
# directory = "logos"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel render workers for `batch`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::style::{BrandSelection, FrameStyle};
    use tempfile::TempDir;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn default_config_has_stock_values() {
        let config = LensframeConfig::default();
        assert_eq!(config.frame, Style::default());
        assert_eq!(config.output.suffix, "-framed");
        assert_eq!(config.output.quality, 95);
        assert_eq!(config.logos.directory, None);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, LensframeConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let (_tmp, path) = write_config(
            r##"
            [frame]
            frame_style = "glass"
            frame_color = "#000000"
            brand = "Leica"
            "##,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.frame.frame_style, FrameStyle::Glass);
        assert_eq!(config.frame.frame_color, Color::BLACK);
        assert_eq!(config.frame.brand, BrandSelection::Named("Leica".into()));
        assert_eq!(config.frame.padding, 10);
        assert!(config.frame.show_model);
        assert_eq!(config.output.suffix, "-framed");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let (_tmp, path) = write_config("[frame]\nshow_modle = true\n");
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_section_is_rejected() {
        let (_tmp, path) = write_config("[theme]\ncolor = \"red\"\n");
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn invalid_color_is_rejected() {
        let (_tmp, path) = write_config("[frame]\ntext_color = \"#12\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let (_tmp, path) = write_config(
            "[frame]\npadding = 40\nblur_strength = 500\nglass_opacity = 95\n[output]\nquality = 0\n",
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.frame.padding, 25);
        assert_eq!(config.frame.blur_strength, 100);
        assert_eq!(config.frame.glass_opacity, 90);
        assert_eq!(config.output.quality, 1);
    }

    #[test]
    fn suffix_with_separator_fails_validation() {
        let (_tmp, path) = write_config("[output]\nsuffix = \"../x\"\n");
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn zero_processes_fails_validation() {
        let (_tmp, path) = write_config("[processing]\nmax_processes = 0\n");
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn relative_logo_directory_anchors_to_config_file() {
        let (tmp, path) = write_config("[logos]\ndirectory = \"my-logos\"\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.logos.directory, Some(tmp.path().join("my-logos")));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let (_tmp, path) = write_config("[frame\npadding = ");
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn merge_toml_overlays_nested_tables() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n[b]\nz = 3\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 20\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(20));
        assert_eq!(merged["b"]["z"].as_integer(), Some(3));
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(stock_defaults_value(), Some(value)).unwrap();
        assert_eq!(config, LensframeConfig::default());
    }

    #[test]
    fn stock_defaults_round_trip() {
        let config: LensframeConfig = stock_defaults_value().try_into().unwrap();
        assert_eq!(config, LensframeConfig::default());
    }

    #[test]
    fn effective_threads_clamps_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
        let many = ProcessingConfig {
            max_processes: Some(cores + 100),
        };
        assert_eq!(effective_threads(&many), cores);
        let one = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&one), 1);
    }
}
