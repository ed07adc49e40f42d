//! Parameter types for the compositor.
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 95). Clamped on construction.
//! - [`LogoPolicy`]: what a render does when the logo cannot be drawn.

use serde::{Deserialize, Serialize};

/// Quality setting for JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Behavior when a logo asset fails to parse or rasterize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoPolicy {
    /// Log a warning and finish the render without a logo.
    #[default]
    Skip,
    /// Abort the render with [`RenderError::Asset`](super::RenderError::Asset).
    Fail,
}
