//! Shared test utilities for the lensframe test suite.
//!
//! Synthetic images, a realistic metadata record, and bar-region pixel
//! accessors for asserting what the compositor drew.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let canvas = Compositor::new()?.compose(&gradient_image(300, 200), &sample_metadata(), &hidden_style())?;
//! assert!(bar_pixels(&canvas, 200).all(|p| p.0 == [255, 255, 255]));
//! ```

use crate::metadata::Metadata;
use crate::style::Style;
use image::{DynamicImage, ImageEncoder, Rgb, RgbImage};

// =========================================================================
// Synthetic images
// =========================================================================

/// Image with a position-dependent color, so crops and offsets are visible.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

/// Single-color image.
pub fn flat_image(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

/// Top half `top`, bottom half `bottom`.
pub fn split_image(width: u32, height: u32, top: [u8; 3], bottom: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, y| {
        if y < height / 2 { Rgb(top) } else { Rgb(bottom) }
    }))
}

/// Encoded JPEG of [`gradient_image`].
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient_image(width, height).to_rgb8();
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

// =========================================================================
// Inputs
// =========================================================================

pub fn sample_metadata() -> Metadata {
    Metadata {
        make: "canon".into(),
        model: "EOS R5".into(),
        lens: "RF24-70mm F2.8".into(),
        focal_length: "50mm".into(),
        aperture: "f/2.8".into(),
        shutter_speed: "1/250s".into(),
        iso: "ISO400".into(),
        date_time: "2024.05.01 14:30".into(),
        gps: "35.6762°N 139.6503°E".into(),
    }
}

/// Default style with every visibility flag off.
pub fn hidden_style() -> Style {
    Style {
        show_model: false,
        show_lens: false,
        show_tech_specs: false,
        show_date: false,
        show_gps: false,
        show_logo: false,
        ..Style::default()
    }
}

// =========================================================================
// Bar-region accessors
// =========================================================================

/// Every pixel below `source_height`.
pub fn bar_pixels(canvas: &RgbImage, source_height: u32) -> impl Iterator<Item = &Rgb<u8>> {
    canvas
        .enumerate_pixels()
        .filter(move |(_, y, _)| *y >= source_height)
        .map(|(_, _, p)| p)
}

/// Leftmost and rightmost column of dark pixels in the bar. Panics if the
/// bar has no dark pixels.
pub fn ink_columns(canvas: &RgbImage, source_height: u32) -> (u32, u32) {
    let columns: Vec<u32> = canvas
        .enumerate_pixels()
        .filter(|(_, y, p)| *y >= source_height && p.0[0] < 128)
        .map(|(x, _, _)| x)
        .collect();
    let min = *columns.iter().min().expect("bar has no ink");
    let max = *columns.iter().max().expect("bar has no ink");
    (min, max)
}
