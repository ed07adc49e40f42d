//! Text measurement and drawing with embedded fonts.
//!
//! Three faces ship inside the binary (DejaVu, Bitstream Vera license):
//!
//! | Face | Used for |
//! |---|---|
//! | Sans | lens suffix, date, GPS |
//! | Sans Bold | camera model |
//! | Sans Mono Bold | exposure settings |
//!
//! Sizes are CSS-style pixel sizes: `size` is the em height, not the
//! ascent-to-descent span rusttype scales by. Text is positioned by the
//! middle of its em box, like a canvas with `textBaseline = "middle"`.

use super::canvas::blend_pixel;
use crate::color::Color;
use image::RgbImage;
use rusttype::{Font, Scale, point};
use std::sync::LazyLock;

static FONTS: LazyLock<Option<Fonts>> = LazyLock::new(|| {
    Some(Fonts {
        regular: Font::try_from_bytes(include_bytes!("../../assets/fonts/DejaVuSans.ttf"))?,
        bold: Font::try_from_bytes(include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf"))?,
        mono: Font::try_from_bytes(include_bytes!(
            "../../assets/fonts/DejaVuSansMono-Bold.ttf"
        ))?,
    })
});

/// Font face selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
    Mono,
}

pub struct Fonts {
    regular: Font<'static>,
    bold: Font<'static>,
    mono: Font<'static>,
}

/// Horizontal anchor of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// One run of text to draw.
#[derive(Debug, Clone, Copy)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub face: Face,
    pub size: f32,
    /// Left edge or right edge, depending on `align`.
    pub x: f32,
    /// Middle of the em box.
    pub y: f32,
    pub align: Align,
    pub color: Color,
    /// Multiplied with the color's own alpha.
    pub opacity: f32,
}

impl Fonts {
    /// The embedded faces, parsed once per process.
    pub fn embedded() -> Option<&'static Fonts> {
        FONTS.as_ref()
    }

    fn font(&self, face: Face) -> &Font<'static> {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Mono => &self.mono,
        }
    }

    /// rusttype scale for a CSS pixel size.
    fn scale(&self, face: Face, size: f32) -> Scale {
        let font = self.font(face);
        let unscaled = font.v_metrics_unscaled();
        let span = unscaled.ascent - unscaled.descent;
        let units_per_em = font.units_per_em() as f32;
        if span <= 0.0 || units_per_em <= 0.0 {
            return Scale::uniform(size);
        }
        Scale::uniform(size * span / units_per_em)
    }

    /// Advance width of `text` including kerning.
    pub fn measure(&self, face: Face, size: f32, text: &str) -> f32 {
        if text.is_empty() || size <= 0.0 {
            return 0.0;
        }
        let scale = self.scale(face, size);
        self.font(face)
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }

    /// Draw a run into `img`, clipped to the image bounds. Returns the
    /// advance width drawn.
    pub fn draw(&self, img: &mut RgbImage, run: &TextRun<'_>) -> f32 {
        let width = self.measure(run.face, run.size, run.text);
        if width == 0.0 {
            return 0.0;
        }
        let font = self.font(run.face);
        let scale = self.scale(run.face, run.size);
        let v_metrics = font.v_metrics(scale);
        let baseline = run.y + (v_metrics.ascent + v_metrics.descent) / 2.0;
        let left = match run.align {
            Align::Left => run.x,
            Align::Right => run.x - width,
        };
        let alpha = run.color.alpha() * run.opacity.clamp(0.0, 1.0);
        let (img_w, img_h) = img.dimensions();

        for glyph in font.layout(run.text, scale, point(left, baseline)) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let px = gx as i32 + bb.min.x;
                let py = gy as i32 + bb.min.y;
                if px < 0 || py < 0 || px as u32 >= img_w || py as u32 >= img_h {
                    return;
                }
                blend_pixel(
                    img.get_pixel_mut(px as u32, py as u32),
                    run.color,
                    coverage * alpha,
                );
            });
        }
        width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fonts() -> &'static Fonts {
        Fonts::embedded().unwrap()
    }

    fn run(text: &str, align: Align, x: f32) -> TextRun<'_> {
        TextRun {
            text,
            face: Face::Regular,
            size: 20.0,
            x,
            y: 20.0,
            align,
            color: Color::BLACK,
            opacity: 1.0,
        }
    }

    fn inked_columns(img: &RgbImage) -> (u32, u32) {
        let mut min = u32::MAX;
        let mut max = 0;
        for (x, _, p) in img.enumerate_pixels() {
            if p.0[0] < 200 {
                min = min.min(x);
                max = max.max(x);
            }
        }
        (min, max)
    }

    #[test]
    fn embedded_fonts_load() {
        assert!(Fonts::embedded().is_some());
    }

    #[test]
    fn measure_empty_is_zero() {
        assert_eq!(fonts().measure(Face::Bold, 30.0, ""), 0.0);
    }

    #[test]
    fn measure_scales_linearly_with_size() {
        let small = fonts().measure(Face::Regular, 10.0, "Leica M11");
        let large = fonts().measure(Face::Regular, 20.0, "Leica M11");
        assert!(small > 0.0);
        assert!((large / small - 2.0).abs() < 0.05);
    }

    #[test]
    fn bold_is_wider_than_regular() {
        let regular = fonts().measure(Face::Regular, 30.0, "EOS R5");
        let bold = fonts().measure(Face::Bold, 30.0, "EOS R5");
        assert!(bold > regular);
    }

    #[test]
    fn mono_glyphs_share_an_advance() {
        let narrow = fonts().measure(Face::Mono, 20.0, "iiii");
        let wide = fonts().measure(Face::Mono, 20.0, "MMMM");
        assert!((narrow - wide).abs() < 0.01);
    }

    #[test]
    fn draw_left_starts_at_x() {
        let mut img = RgbImage::from_pixel(200, 40, image::Rgb([255, 255, 255]));
        fonts().draw(&mut img, &run("HHH", Align::Left, 50.0));
        let (min, _) = inked_columns(&img);
        assert!((48..=54).contains(&min), "first ink at {min}");
    }

    #[test]
    fn draw_right_ends_at_x() {
        let mut img = RgbImage::from_pixel(200, 40, image::Rgb([255, 255, 255]));
        fonts().draw(&mut img, &run("HHH", Align::Right, 150.0));
        let (_, max) = inked_columns(&img);
        assert!((144..=151).contains(&max), "last ink at {max}");
    }

    #[test]
    fn zero_opacity_draws_nothing() {
        let mut img = RgbImage::from_pixel(100, 40, image::Rgb([255, 255, 255]));
        let mut r = run("Hello", Align::Left, 5.0);
        r.opacity = 0.0;
        fonts().draw(&mut img, &r);
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn draw_clips_outside_image() {
        let mut img = RgbImage::from_pixel(20, 10, image::Rgb([255, 255, 255]));
        // mostly off-canvas, must not panic
        fonts().draw(&mut img, &run("Overflowing text", Align::Left, -40.0));
    }
}
