//! Color values for the frame and text.
//!
//! Colors arrive as strings from the config file and the CLI. Accepted forms:
//!
//! | Form | Example |
//! |---|---|
//! | Short hex | `#fff`, `#fffa` |
//! | Long hex | `#ffffff`, `#ffffff80` |
//! | Functional | `rgb(255, 255, 255)`, `rgba(0, 0, 0, 0.5)` |
//! | Named | `white`, `black`, `silver`, ... |
//!
//! Parsing happens once, when the [`Style`](crate::style::Style) is built, so
//! the compositor never sees an invalid color.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid color: {0:?}")]
pub struct ColorError(pub String);

/// An sRGB color with straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("silver", [192, 192, 192]),
    ("maroon", [128, 0, 0]),
    ("navy", [0, 0, 128]),
    ("olive", [128, 128, 0]),
    ("purple", [128, 0, 128]),
    ("teal", [0, 128, 128]),
    ("orange", [255, 165, 0]),
    ("beige", [245, 245, 220]),
    ("ivory", [255, 255, 240]),
    ("whitesmoke", [245, 245, 245]),
    ("gainsboro", [220, 220, 220]),
    ("darkgray", [169, 169, 169]),
    ("dimgray", [105, 105, 105]),
];

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Alpha as a 0.0–1.0 fraction.
    pub fn alpha(self) -> f32 {
        self.a as f32 / 255.0
    }

    /// `#rrggbb` form, alpha dropped. Used to recolor SVG logos.
    pub fn to_hex_rgb(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "{}", self.to_hex_rgb())
        } else {
            write!(f, "{}{:02x}", self.to_hex_rgb(), self.a)
        }
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let err = || ColorError(s.to_string());
        if let Some(hex) = input.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(err);
        }
        let lower = input.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_functional(args).ok_or_else(err);
        }
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, [r, g, b])| Color::rgb(*r, *g, *b))
            .ok_or_else(err)
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Color {
            a: nibble(3)?,
            ..Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)
        }),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color {
            a: byte(6)?,
            ..Color::rgb(byte(0)?, byte(2)?, byte(4)?)
        }),
        _ => None,
    }
}

fn parse_functional(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let channel = |s: &str| s.parse::<u8>().ok();
    match parts.as_slice() {
        [r, g, b] => Some(Color::rgb(channel(r)?, channel(g)?, channel(b)?)),
        [r, g, b, a] => {
            let alpha = a.parse::<f32>().ok().filter(|v| (0.0..=1.0).contains(v))?;
            Some(Color {
                a: (alpha * 255.0).round() as u8,
                ..Color::rgb(channel(r)?, channel(g)?, channel(b)?)
            })
        }
        _ => None,
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_hex() {
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color::rgb(255, 128, 0));
    }

    #[test]
    fn parses_short_hex_by_doubling_nibbles() {
        assert_eq!("#fa0".parse::<Color>().unwrap(), Color::rgb(255, 170, 0));
    }

    #[test]
    fn parses_hex_with_alpha() {
        let c: Color = "#00000080".parse().unwrap();
        assert_eq!(c.a, 128);
        assert_eq!((c.r, c.g, c.b), (0, 0, 0));
    }

    #[test]
    fn parses_named_case_insensitively() {
        assert_eq!("White".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!(" black ".parse::<Color>().unwrap(), Color::BLACK);
    }

    #[test]
    fn parses_rgb_and_rgba() {
        assert_eq!(
            "rgb(10, 20, 30)".parse::<Color>().unwrap(),
            Color::rgb(10, 20, 30)
        );
        let c: Color = "rgba(0,0,0,0.5)".parse().unwrap();
        assert_eq!(c.a, 128);
    }

    #[test]
    fn rejects_garbage() {
        assert!("#12".parse::<Color>().is_err());
        assert!("#gggggg".parse::<Color>().is_err());
        assert!("rgb(300,0,0)".parse::<Color>().is_err());
        assert!("rgba(0,0,0,2)".parse::<Color>().is_err());
        assert!("chartreuse-ish".parse::<Color>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for c in [Color::WHITE, Color { a: 64, ..Color::rgb(1, 2, 3) }] {
            assert_eq!(c.to_string().parse::<Color>().unwrap(), c);
        }
    }

    #[test]
    fn hex_rgb_drops_alpha() {
        let c = Color { a: 10, ..Color::rgb(0x12, 0x34, 0x56) };
        assert_eq!(c.to_hex_rgb(), "#123456");
    }
}
