//! Style configuration for a render.
//!
//! A [`Style`] is an immutable value: every edit produces a new one, and the
//! compositor only ever borrows it. Text content is resolved through the
//! *effective value* rule: a non-empty custom override always wins over the
//! metadata field it replaces.

use crate::color::Color;
use crate::metadata::Metadata;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Valid range for [`Style::padding`] (bar height, % of source height).
pub const PADDING_RANGE: (u32, u32) = (5, 25);
/// Valid range for [`Style::blur_strength`].
pub const BLUR_RANGE: (u32, u32) = (0, 100);
/// Valid range for [`Style::glass_opacity`] (% opacity of the tint).
pub const GLASS_OPACITY_RANGE: (u32, u32) = (0, 90);

/// Background treatment of the information bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameStyle {
    /// Flat fill with the frame color.
    #[default]
    Solid,
    /// Blurred reuse of the photo's bottom strip, tinted with the frame color.
    Glass,
}

/// Which logo to draw.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BrandSelection {
    /// Derive the brand from the camera make.
    #[default]
    Auto,
    /// Draw no logo even when `show_logo` is set.
    None,
    /// An explicit brand name from the logo table.
    Named(String),
}

impl BrandSelection {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("auto") {
            BrandSelection::Auto
        } else if value.eq_ignore_ascii_case("none") {
            BrandSelection::None
        } else {
            BrandSelection::Named(value.to_string())
        }
    }
}

impl fmt::Display for BrandSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrandSelection::Auto => f.write_str("Auto"),
            BrandSelection::None => f.write_str("None"),
            BrandSelection::Named(name) => f.write_str(name),
        }
    }
}

impl Serialize for BrandSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BrandSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(BrandSelection::parse(&String::deserialize(deserializer)?))
    }
}

/// Everything the user can adjust about a render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Style {
    pub show_model: bool,
    pub show_lens: bool,
    pub show_tech_specs: bool,
    pub show_date: bool,
    pub show_gps: bool,
    pub show_logo: bool,

    pub custom_model: String,
    pub custom_lens: String,
    pub custom_focal_length: String,
    pub custom_aperture: String,
    pub custom_shutter_speed: String,
    pub custom_iso: String,
    pub custom_date_time: String,
    pub custom_gps: String,

    pub brand: BrandSelection,
    pub frame_style: FrameStyle,
    /// Bar fill for solid frames, tint for glass frames.
    pub frame_color: Color,
    pub text_color: Color,
    /// Bar height as a percentage of the source image height (5–25).
    pub padding: u32,
    /// Gaussian blur sigma for glass frames (0–100).
    pub blur_strength: u32,
    /// Tint opacity percentage for glass frames (0–90).
    pub glass_opacity: u32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            show_model: true,
            show_lens: false,
            show_tech_specs: true,
            show_date: true,
            show_gps: true,
            show_logo: true,
            custom_model: String::new(),
            custom_lens: String::new(),
            custom_focal_length: String::new(),
            custom_aperture: String::new(),
            custom_shutter_speed: String::new(),
            custom_iso: String::new(),
            custom_date_time: String::new(),
            custom_gps: String::new(),
            brand: BrandSelection::Auto,
            frame_style: FrameStyle::Solid,
            frame_color: Color::WHITE,
            text_color: Color::BLACK,
            padding: 10,
            blur_strength: 30,
            glass_opacity: 20,
        }
    }
}

/// Pick the override when non-empty, else the metadata value.
fn effective<'a>(custom: &'a str, fallback: &'a str) -> &'a str {
    if custom.is_empty() { fallback } else { custom }
}

impl Style {
    /// Copy with every numeric field forced into its valid range.
    pub fn clamped(&self) -> Self {
        Self {
            padding: self.padding.clamp(PADDING_RANGE.0, PADDING_RANGE.1),
            blur_strength: self.blur_strength.clamp(BLUR_RANGE.0, BLUR_RANGE.1),
            glass_opacity: self
                .glass_opacity
                .clamp(GLASS_OPACITY_RANGE.0, GLASS_OPACITY_RANGE.1),
            ..self.clone()
        }
    }

    /// Copy with lens and GPS visibility following what the photo carries.
    ///
    /// Applied once when a new photo is loaded so a lens line or coordinates
    /// appear only when there is something to show.
    pub fn adapted_to(&self, metadata: &Metadata) -> Self {
        Self {
            show_lens: !metadata.lens.is_empty(),
            show_gps: !metadata.gps.is_empty(),
            ..self.clone()
        }
    }

    pub fn model_text<'a>(&'a self, metadata: &'a Metadata) -> &'a str {
        effective(&self.custom_model, &metadata.model)
    }

    pub fn lens_text<'a>(&'a self, metadata: &'a Metadata) -> &'a str {
        effective(&self.custom_lens, &metadata.lens)
    }

    pub fn date_text<'a>(&'a self, metadata: &'a Metadata) -> &'a str {
        effective(&self.custom_date_time, &metadata.date_time)
    }

    pub fn gps_text<'a>(&'a self, metadata: &'a Metadata) -> &'a str {
        effective(&self.custom_gps, &metadata.gps)
    }

    /// Focal length, aperture, shutter speed, ISO joined by spaces.
    ///
    /// Empty fields are skipped so a missing value never leaves a double gap.
    pub fn specs_text(&self, metadata: &Metadata) -> String {
        [
            effective(&self.custom_focal_length, &metadata.focal_length),
            effective(&self.custom_aperture, &metadata.aperture),
            effective(&self.custom_shutter_speed, &metadata.shutter_speed),
            effective(&self.custom_iso, &metadata.iso),
        ]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}
