//! Pure geometry for the information bar.
//!
//! All functions here are pure and testable without any I/O or pixels. The
//! compositor measures text, feeds the widths in, and draws wherever these
//! functions say.
//!
//! ```text
//!  0 ┌──────────────────────────────────────────────┐
//!    │                 source image                 │
//!  h ├──────────────────────────────────────────────┤
//!    │ Model | Lens              LOGO │ 35mm f/2 …  │  ← center_y
//!    │ 2024.05.01 14:30                │ 35.68°N …   │
//!    └──────────────────────────────────────────────┘
//!      ↑ margin_x                       right_edge ↑
//! ```

/// Large text (model, specs) as a fraction of bar height.
pub const LARGE_FONT_RATIO: f32 = 0.35;
/// Small text (date, GPS) as a fraction of bar height.
pub const SMALL_FONT_RATIO: f32 = 0.22;
/// Horizontal margin as a fraction of source width.
pub const MARGIN_RATIO: f32 = 0.04;
/// Logo height as a fraction of bar height.
pub const LOGO_HEIGHT_RATIO: f32 = 0.5;
/// Gap between text block, divider, and logo as a fraction of bar height.
pub const SPACING_RATIO: f32 = 0.4;
/// Glass strip height as a fraction of source height.
pub const GLASS_STRIP_RATIO: f64 = 0.15;

/// Bar height for a source height and padding percentage.
///
/// ```
/// # use lensframe::imaging::calculate_bar_height;
/// assert_eq!(calculate_bar_height(2000, 10), 200);
/// assert_eq!(calculate_bar_height(1333, 10), 133);
/// ```
pub fn calculate_bar_height(source_height: u32, padding: u32) -> u32 {
    (source_height as f64 * padding as f64 / 100.0).round() as u32
}

/// Output canvas dimensions: same width, height plus the bar.
pub fn calculate_canvas_dimensions(source: (u32, u32), padding: u32) -> (u32, u32) {
    let (w, h) = source;
    (w, h + calculate_bar_height(h, padding))
}

/// Height of the bottom strip reused as the glass background.
///
/// Never zero for a non-empty source, never taller than the source.
pub fn calculate_glass_strip_height(source_height: u32) -> u32 {
    let strip = (source_height as f64 * GLASS_STRIP_RATIO).round() as u32;
    strip.clamp(1.min(source_height), source_height)
}

/// Fixed reference lines of the bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarGeometry {
    pub source_width: u32,
    pub source_height: u32,
    pub bar_height: u32,
    pub center_y: f32,
    pub margin_x: f32,
    pub right_edge: f32,
    pub large_font: f32,
    pub small_font: f32,
    pub spacing: f32,
}

/// Vertical positions (em-box middles) of a two-line block.
///
/// `None` means the line is not drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlockRows {
    pub primary: Option<f32>,
    pub secondary: Option<f32>,
}

/// Where the logo and its divider go.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoPlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub divider: Option<Divider>,
}

/// Vertical rule between the logo and the right text block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divider {
    /// Center line of the stroke.
    pub x: f32,
    pub top: f32,
    pub bottom: f32,
    pub thickness: f32,
}

impl BarGeometry {
    pub fn new(source_width: u32, source_height: u32, padding: u32) -> Self {
        let bar_height = calculate_bar_height(source_height, padding);
        let bar = bar_height as f32;
        let margin_x = source_width as f32 * MARGIN_RATIO;
        Self {
            source_width,
            source_height,
            bar_height,
            center_y: source_height as f32 + bar / 2.0,
            margin_x,
            right_edge: source_width as f32 - margin_x,
            large_font: bar * LARGE_FONT_RATIO,
            small_font: bar * SMALL_FONT_RATIO,
            spacing: bar * SPACING_RATIO,
        }
    }

    /// Rows for a large primary line stacked over a small secondary line.
    ///
    /// With both lines shown the primary rises by `0.7 × small` and the
    /// secondary drops by `0.6 × large`. A lone line sits on `center_y`.
    /// Used for both blocks: model/date on the left, specs/GPS on the right.
    pub fn stacked_rows(&self, show_primary: bool, show_secondary: bool) -> BlockRows {
        let both = show_primary && show_secondary;
        BlockRows {
            primary: show_primary.then(|| {
                if both {
                    self.center_y - self.small_font * 0.7
                } else {
                    self.center_y
                }
            }),
            secondary: show_secondary.then(|| {
                if both {
                    self.center_y + self.large_font * 0.6
                } else {
                    self.center_y
                }
            }),
        }
    }

    /// Logo box and divider for a logo of the given aspect ratio (w / h).
    ///
    /// With right-side text (`max_text_width > 0`), a divider sits
    /// `spacing` left of the text block and the logo another `spacing` left
    /// of the divider. Without text the logo is right-aligned to
    /// `right_edge`.
    pub fn logo_placement(&self, max_text_width: f32, logo_aspect: f32) -> LogoPlacement {
        let height = self.bar_height as f32 * LOGO_HEIGHT_RATIO;
        let width = height * logo_aspect;
        let y = self.center_y - height / 2.0;

        if max_text_width > 0.0 {
            let divider_x = self.right_edge - (max_text_width + self.spacing);
            LogoPlacement {
                x: divider_x - self.spacing - width,
                y,
                width,
                height,
                divider: Some(Divider {
                    x: divider_x,
                    top: self.center_y - height * 0.6,
                    bottom: self.center_y + height * 0.6,
                    thickness: (self.source_height as f32 * 0.0015).max(1.0),
                }),
            }
        } else {
            LogoPlacement {
                x: self.right_edge - width,
                y,
                width,
                height,
                divider: None,
            }
        }
    }
}
