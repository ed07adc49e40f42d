//! The render pass: source image + metadata + style → framed JPEG.
//!
//! A render is one synchronous pass over a freshly allocated canvas:
//!
//! 1. **Canvas**: source width × (source height + bar height).
//! 2. **Background**: solid fill, or the glass treatment (bottom strip of
//!    the photo stretched into the bar, blurred, then tinted).
//! 3. **Left block**: model (bold), optional ` | lens`, optional date.
//! 4. **Right block**: exposure settings (mono bold) and GPS, right-aligned.
//! 5. **Logo**: recolored brand logo, with a divider when right-side text
//!    exists.
//! 6. **Encode**: baseline JPEG at a fixed quality.
//!
//! The compositor holds only read-only state (fonts, logo table, policy), so
//! one instance can serve any number of threads. Each call allocates its own
//! canvas.

use super::calculations::{BarGeometry, calculate_glass_strip_height};
use super::canvas::{fill_rect, flatten, overlay};
use super::params::{LogoPolicy, Quality};
use super::text::{Align, Face, Fonts, TextRun};
use crate::brand::{AssetError, LogoTable, resolve_brand};
use crate::color::Color;
use crate::metadata::Metadata;
use crate::style::{BrandSelection, FrameStyle, Style};
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage};
use std::sync::Arc;
use thiserror::Error;

/// Opacity of the ` | lens` suffix.
const LENS_OPACITY: f32 = 0.8;
/// Opacity of the date and GPS lines.
const SECONDARY_OPACITY: f32 = 0.6;
/// Opacity of the divider stroke.
const DIVIDER_OPACITY: f32 = 0.3;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to decode source image: {0}")]
    Decode(String),
    #[error("Logo asset error: {0}")]
    Asset(#[from] AssetError),
    #[error("Embedded fonts failed to load")]
    Font,
    #[error("Failed to encode output: {0}")]
    Encode(String),
}

/// An encoded render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    /// JPEG bytes.
    pub bytes: Vec<u8>,
}

impl RenderedImage {
    pub const MIME_TYPE: &'static str = "image/jpeg";

    /// `data:` URL for embedding the render in a page.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            Self::MIME_TYPE,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Renders framed images. Cheap to clone; safe to share across threads.
#[derive(Clone)]
pub struct Compositor {
    fonts: &'static Fonts,
    logos: Arc<LogoTable>,
    logo_policy: LogoPolicy,
    quality: Quality,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("brands", &self.logos.brands())
            .field("logo_policy", &self.logo_policy)
            .field("quality", &self.quality)
            .finish()
    }
}

impl Compositor {
    /// Compositor with the built-in logos.
    pub fn new() -> Result<Self, RenderError> {
        Self::with_logos(Arc::new(LogoTable::builtin().clone()))
    }

    pub fn with_logos(logos: Arc<LogoTable>) -> Result<Self, RenderError> {
        Ok(Self {
            fonts: Fonts::embedded().ok_or(RenderError::Font)?,
            logos,
            logo_policy: LogoPolicy::default(),
            quality: Quality::default(),
        })
    }

    pub fn logo_policy(mut self, policy: LogoPolicy) -> Self {
        self.logo_policy = policy;
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Compose and encode.
    pub fn render(
        &self,
        image: &DynamicImage,
        metadata: &Metadata,
        style: &Style,
    ) -> Result<RenderedImage, RenderError> {
        let canvas = self.compose(image, metadata, style)?;
        encode_jpeg(&canvas, self.quality)
    }

    /// Compose the framed canvas without encoding it.
    pub fn compose(
        &self,
        image: &DynamicImage,
        metadata: &Metadata,
        style: &Style,
    ) -> Result<RgbImage, RenderError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(RenderError::Decode(format!(
                "source image is empty ({width}x{height})"
            )));
        }
        let style = style.clamped();
        let geometry = BarGeometry::new(width, height, style.padding);
        log::debug!(
            "Rendering {width}x{height} with {}px bar ({:?})",
            geometry.bar_height,
            style.frame_style
        );

        let mut canvas = match style.frame_style {
            FrameStyle::Solid => solid_background(image, &geometry, style.frame_color),
            FrameStyle::Glass => glass_background(image, &geometry, &style),
        };

        if geometry.bar_height > 0 {
            self.draw_left_block(&mut canvas, &geometry, metadata, &style);
            let max_text_width = self.draw_right_block(&mut canvas, &geometry, metadata, &style);
            if style.show_logo {
                self.draw_logo(&mut canvas, &geometry, metadata, &style, max_text_width)?;
            }
        }
        Ok(canvas)
    }

    fn draw_left_block(
        &self,
        canvas: &mut RgbImage,
        geometry: &BarGeometry,
        metadata: &Metadata,
        style: &Style,
    ) {
        let rows = geometry.stacked_rows(style.show_model, style.show_date);

        if let Some(y) = rows.primary {
            let model = style.model_text(metadata);
            let model_width = self.fonts.draw(
                canvas,
                &TextRun {
                    text: model,
                    face: Face::Bold,
                    size: geometry.large_font,
                    x: geometry.margin_x,
                    y,
                    align: Align::Left,
                    color: style.text_color,
                    opacity: 1.0,
                },
            );

            let lens = style.lens_text(metadata);
            if style.show_lens && !lens.is_empty() {
                let suffix = format!(" | {lens}");
                self.fonts.draw(
                    canvas,
                    &TextRun {
                        text: &suffix,
                        face: Face::Regular,
                        size: geometry.large_font,
                        x: geometry.margin_x + model_width,
                        y,
                        align: Align::Left,
                        color: style.text_color,
                        opacity: LENS_OPACITY,
                    },
                );
            }
        }

        if let Some(y) = rows.secondary {
            self.fonts.draw(
                canvas,
                &TextRun {
                    text: style.date_text(metadata),
                    face: Face::Regular,
                    size: geometry.small_font,
                    x: geometry.margin_x,
                    y,
                    align: Align::Left,
                    color: style.text_color,
                    opacity: SECONDARY_OPACITY,
                },
            );
        }
    }

    /// Draws specs and GPS; returns the logo clearance.
    ///
    /// The clearance is the wider of the specs line (when shown) and the
    /// GPS text, which is measured even when its line is hidden.
    fn draw_right_block(
        &self,
        canvas: &mut RgbImage,
        geometry: &BarGeometry,
        metadata: &Metadata,
        style: &Style,
    ) -> f32 {
        let rows = geometry.stacked_rows(style.show_tech_specs, style.show_gps);
        let mut max_text_width: f32 = 0.0;

        if let Some(y) = rows.primary {
            let specs = style.specs_text(metadata);
            let drawn = self.fonts.draw(
                canvas,
                &TextRun {
                    text: &specs,
                    face: Face::Mono,
                    size: geometry.large_font,
                    x: geometry.right_edge,
                    y,
                    align: Align::Right,
                    color: style.text_color,
                    opacity: 1.0,
                },
            );
            max_text_width = max_text_width.max(drawn);
        }

        let gps = style.gps_text(metadata);
        max_text_width =
            max_text_width.max(self.fonts.measure(Face::Regular, geometry.small_font, gps));

        if let Some(y) = rows.secondary {
            self.fonts.draw(
                canvas,
                &TextRun {
                    text: gps,
                    face: Face::Regular,
                    size: geometry.small_font,
                    x: geometry.right_edge,
                    y,
                    align: Align::Right,
                    color: style.text_color,
                    opacity: SECONDARY_OPACITY,
                },
            );
        }

        max_text_width
    }

    fn draw_logo(
        &self,
        canvas: &mut RgbImage,
        geometry: &BarGeometry,
        metadata: &Metadata,
        style: &Style,
        max_text_width: f32,
    ) -> Result<(), RenderError> {
        let brand = match &style.brand {
            BrandSelection::None => return Ok(()),
            BrandSelection::Auto => resolve_brand(&metadata.make),
            BrandSelection::Named(name) => name.as_str(),
        };
        let asset = self.logos.get(brand);

        // Rasterize at the integer height nearest the target box
        let target = geometry.logo_placement(max_text_width, 1.0);
        let raster_height = (target.height.round() as u32).max(1);
        let logo = match asset.rasterize(style.text_color, raster_height) {
            Ok(logo) => logo,
            Err(e) => match self.logo_policy {
                LogoPolicy::Skip => {
                    log::warn!("{e}; rendering without logo");
                    return Ok(());
                }
                LogoPolicy::Fail => return Err(e.into()),
            },
        };

        let aspect = logo.width() as f32 / logo.height() as f32;
        let placement = geometry.logo_placement(max_text_width, aspect);

        if let Some(divider) = placement.divider {
            let half = divider.thickness / 2.0;
            fill_rect(
                canvas,
                (
                    divider.x - half,
                    divider.top,
                    divider.x + half,
                    divider.bottom,
                ),
                style.text_color,
                DIVIDER_OPACITY,
            );
        }

        overlay(
            canvas,
            &logo,
            placement.x.round() as i64,
            placement.y.round() as i64,
            style.text_color.alpha(),
        );
        log::debug!("Drew {} logo at ({:.1}, {:.1})", asset.brand, placement.x, placement.y);
        Ok(())
    }
}

/// Frame-colored canvas with the source drawn unscaled at the origin.
fn solid_background(image: &DynamicImage, geometry: &BarGeometry, frame: Color) -> RgbImage {
    let (width, height) = (geometry.source_width, geometry.source_height);
    let canvas_height = height + geometry.bar_height;
    let mut canvas = RgbImage::new(width, canvas_height);
    fill_rect(
        &mut canvas,
        (0.0, 0.0, width as f32, canvas_height as f32),
        frame,
        1.0,
    );
    let source = image.to_rgba8();
    overlay(&mut canvas, &source, 0, 0, 1.0);
    canvas
}

/// Source at the origin; bar filled with the blurred, tinted bottom strip.
fn glass_background(image: &DynamicImage, geometry: &BarGeometry, style: &Style) -> RgbImage {
    let (width, height) = (geometry.source_width, geometry.source_height);
    let bar_height = geometry.bar_height;
    let source = flatten(&image.to_rgba8(), Color::BLACK);

    let mut canvas = RgbImage::new(width, height + bar_height);
    imageops::replace(&mut canvas, &source, 0, 0);
    if bar_height == 0 {
        return canvas;
    }

    let strip_height = calculate_glass_strip_height(height);
    let strip = imageops::crop_imm(&source, 0, height - strip_height, width, strip_height).to_image();
    let stretched = imageops::resize(&strip, width, bar_height, FilterType::Triangle);
    let blurred = if style.blur_strength > 0 {
        blur_clamped(&stretched, style.blur_strength as f32)
    } else {
        stretched
    };
    imageops::replace(&mut canvas, &blurred, 0, height as i64);

    fill_rect(
        &mut canvas,
        (0.0, height as f32, width as f32, (height + bar_height) as f32),
        style.frame_color,
        style.glass_opacity as f32 / 100.0,
    );
    canvas
}

/// Gaussian blur with edge pixels extended outward first, so the strip's
/// borders keep their color instead of fading toward black.
fn blur_clamped(img: &RgbImage, sigma: f32) -> RgbImage {
    let (width, height) = img.dimensions();
    let pad = (sigma * 3.0).ceil() as u32;
    let padded = RgbImage::from_fn(width + 2 * pad, height + 2 * pad, |x, y| {
        let sx = x.saturating_sub(pad).min(width - 1);
        let sy = y.saturating_sub(pad).min(height - 1);
        *img.get_pixel(sx, sy)
    });
    let blurred = imageops::blur(&padded, sigma);
    imageops::crop_imm(&blurred, pad, pad, width, height).to_image()
}

/// Encode as RGB JPEG.
pub fn encode_jpeg(canvas: &RgbImage, quality: Quality) -> Result<RenderedImage, RenderError> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.value())
        .write_image(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(RenderedImage {
        width: canvas.width(),
        height: canvas.height(),
        bytes,
    })
}
