//! Pixel-level drawing on an opaque RGB canvas.
//!
//! The canvas has no alpha channel; every operation blends straight-alpha
//! sources over what is already there. Rectangles take fractional
//! coordinates and antialias their edges by area coverage, which is what
//! keeps thin dividers crisp at odd scale factors.

use crate::color::Color;
use image::{Rgb, RgbImage, RgbaImage};

/// Blend `color` over `dst` at `alpha` (0.0–1.0).
#[inline]
pub fn blend_pixel(dst: &mut Rgb<u8>, color: Color, alpha: f32) {
    if alpha <= 0.0 {
        return;
    }
    let a = alpha.min(1.0);
    let inv = 1.0 - a;
    let mix = |src: u8, dst: u8| (src as f32 * a + dst as f32 * inv).round() as u8;
    dst.0 = [
        mix(color.r, dst.0[0]),
        mix(color.g, dst.0[1]),
        mix(color.b, dst.0[2]),
    ];
}

/// Fill a rectangle given by fractional edges, blending at `opacity` times
/// the color's own alpha. Pixels partly inside are blended by the covered
/// area. Clipped to the canvas.
pub fn fill_rect(img: &mut RgbImage, rect: (f32, f32, f32, f32), color: Color, opacity: f32) {
    let (left, top, right, bottom) = rect;
    let alpha = color.alpha() * opacity.clamp(0.0, 1.0);
    if alpha <= 0.0 || right <= left || bottom <= top {
        return;
    }
    let (w, h) = img.dimensions();
    let x0 = left.floor().max(0.0) as u32;
    let y0 = top.floor().max(0.0) as u32;
    let x1 = (right.ceil().max(0.0) as u32).min(w);
    let y1 = (bottom.ceil().max(0.0) as u32).min(h);

    for y in y0..y1 {
        let cover_y = overlap(y as f32, top, bottom);
        for x in x0..x1 {
            let cover = cover_y * overlap(x as f32, left, right);
            blend_pixel(img.get_pixel_mut(x, y), color, alpha * cover);
        }
    }
}

/// Length of the intersection of pixel span `[p, p + 1)` with `[lo, hi)`.
fn overlap(p: f32, lo: f32, hi: f32) -> f32 {
    ((p + 1.0).min(hi) - p.max(lo)).clamp(0.0, 1.0)
}

/// Composite a straight-alpha RGBA image with its top-left corner at
/// `(x, y)`, scaled by `opacity`. Clipped to the canvas.
pub fn overlay(img: &mut RgbImage, src: &RgbaImage, x: i64, y: i64, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }
    let (w, h) = (img.width() as i64, img.height() as i64);
    for (sx, sy, p) in src.enumerate_pixels() {
        let dx = x + sx as i64;
        let dy = y + sy as i64;
        if dx < 0 || dy < 0 || dx >= w || dy >= h || p.0[3] == 0 {
            continue;
        }
        let color = Color::rgb(p.0[0], p.0[1], p.0[2]);
        let alpha = p.0[3] as f32 / 255.0 * opacity;
        blend_pixel(img.get_pixel_mut(dx as u32, dy as u32), color, alpha);
    }
}

/// Flatten a straight-alpha image onto a solid `background`.
pub fn flatten(src: &RgbaImage, background: Color) -> RgbImage {
    RgbImage::from_fn(src.width(), src.height(), |x, y| {
        let p = src.get_pixel(x, y);
        let mut out = Rgb([background.r, background.g, background.b]);
        blend_pixel(
            &mut out,
            Color::rgb(p.0[0], p.0[1], p.0[2]),
            p.0[3] as f32 / 255.0,
        );
        out
    })
}
