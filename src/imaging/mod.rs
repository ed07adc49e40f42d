//! Image compositing in pure Rust, with fonts and logos embedded.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` + EXIF orientation |
//! | **Glass strip** | `imageops::crop_imm` + `resize` (Triangle) + `blur` |
//! | **Text** | `rusttype` with embedded DejaVu faces |
//! | **Logos** | `resvg` rasterization of recolored SVG |
//! | **Encode** | `image::codecs::jpeg::JpegEncoder` (quality 95) |
//!
//! The module is split into:
//! - **Calculations**: Pure bar geometry (unit testable)
//! - **Parameters**: Encoding quality, logo failure policy
//! - **Canvas / Text**: Pixel blending and glyph drawing
//! - **Compositor**: The render pass combining all of the above

mod calculations;
mod canvas;
mod compositor;
mod params;
mod text;

pub use calculations::{
    BarGeometry, BlockRows, Divider, LogoPlacement, calculate_bar_height,
    calculate_canvas_dimensions, calculate_glass_strip_height,
};
pub use compositor::{Compositor, RenderError, RenderedImage, encode_jpeg};
pub use params::{LogoPolicy, Quality};

use crate::metadata::Metadata;
use crate::style::Style;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;

/// Decode encoded image bytes, applying the EXIF orientation so the photo
/// is upright the way viewers display it.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, RenderError> {
    let decode_err = |e: image::ImageError| RenderError::Decode(e.to_string());

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| RenderError::Decode(e.to_string()))?;
    let mut decoder = reader.into_decoder().map_err(decode_err)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// Render with a default [`Compositor`] (built-in logos, skip broken logos).
pub fn render(
    image: &DynamicImage,
    metadata: &Metadata,
    style: &Style,
) -> Result<RenderedImage, RenderError> {
    Compositor::new()?.render(image, metadata, style)
}
