//! Camera brands and their logos.
//!
//! Two lookups live here:
//!
//! - [`resolve_brand`] maps a camera make ("Canon Inc.", "NIKON CORPORATION")
//!   to a brand name by case-insensitive substring match.
//! - [`LogoTable`] maps a brand name to a monochrome SVG logo whose fill is the
//!   `{{FILL}}` placeholder. Recoloring substitutes the placeholder in memory;
//!   rasterizing goes through `resvg`.
//!
//! The built-in table is embedded in the binary and built once on first use.
//! A table can also be extended at startup with user SVG files
//! ([`LogoTable::with_directory`]). Tables are never mutated after
//! construction, so they are shared by reference across concurrent renders.

use crate::color::Color;
use image::{Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Fallback logo for unknown makes and unknown brand names.
pub const GENERIC_BRAND: &str = "Generic";

/// Placeholder substituted with the text color.
pub const FILL_PLACEHOLDER: &str = "{{FILL}}";

/// Brands with a built-in logo, in display order.
pub const SUPPORTED_BRANDS: &[&str] = &[
    "Leica",
    "Xiaomi",
    "Sony",
    "Canon",
    "Nikon",
    "Fujifilm",
    "Apple",
    "Hasselblad",
    "Olympus",
    "Panasonic",
    "Samsung",
    "Google",
    "DJI",
];

/// Lowercase maker fragment → brand. First match wins.
const MAKER_MAP: &[(&str, &str)] = &[
    ("leica", "Leica"),
    ("xiaomi", "Xiaomi"),
    ("sony", "Sony"),
    ("canon", "Canon"),
    ("nikon", "Nikon"),
    ("fujifilm", "Fujifilm"),
    ("apple", "Apple"),
    ("hasselblad", "Hasselblad"),
    ("olympus", "Olympus"),
    ("om digital", "Olympus"),
    ("panasonic", "Panasonic"),
    ("samsung", "Samsung"),
    ("google", "Google"),
    ("dji", "DJI"),
];

const BUILTIN_LOGOS: &[(&str, &str)] = &[
    ("Generic", include_str!("../assets/logos/Generic.svg")),
    ("Leica", include_str!("../assets/logos/Leica.svg")),
    ("Xiaomi", include_str!("../assets/logos/Xiaomi.svg")),
    ("Sony", include_str!("../assets/logos/Sony.svg")),
    ("Canon", include_str!("../assets/logos/Canon.svg")),
    ("Nikon", include_str!("../assets/logos/Nikon.svg")),
    ("Fujifilm", include_str!("../assets/logos/Fujifilm.svg")),
    ("Apple", include_str!("../assets/logos/Apple.svg")),
    ("Hasselblad", include_str!("../assets/logos/Hasselblad.svg")),
    ("Olympus", include_str!("../assets/logos/Olympus.svg")),
    ("Panasonic", include_str!("../assets/logos/Panasonic.svg")),
    ("Samsung", include_str!("../assets/logos/Samsung.svg")),
    ("Google", include_str!("../assets/logos/Google.svg")),
    ("DJI", include_str!("../assets/logos/DJI.svg")),
];

static BUILTIN_TABLE: LazyLock<LogoTable> = LazyLock::new(|| {
    let mut logos = BTreeMap::new();
    for (brand, svg) in BUILTIN_LOGOS {
        logos.insert(brand.to_lowercase(), LogoAsset::new(*brand, *svg));
    }
    LogoTable { logos }
});

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Logo for {brand} is not valid SVG: {message}")]
    Parse { brand: String, message: String },
    #[error("Logo for {brand} could not be rasterized: {message}")]
    Render { brand: String, message: String },
}

/// Resolve a camera make to a brand name, defaulting to [`GENERIC_BRAND`].
///
/// ```
/// # use lensframe::brand::resolve_brand;
/// assert_eq!(resolve_brand("Canon Inc."), "Canon");
/// assert_eq!(resolve_brand(""), "Generic");
/// ```
pub fn resolve_brand(make: &str) -> &'static str {
    let make = make.trim().to_lowercase();
    if make.is_empty() {
        return GENERIC_BRAND;
    }
    MAKER_MAP
        .iter()
        .find(|(fragment, _)| make.contains(fragment))
        .map(|(_, brand)| *brand)
        .unwrap_or(GENERIC_BRAND)
}

/// A monochrome SVG logo with a recolorable fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoAsset {
    pub brand: String,
    svg: String,
}

impl LogoAsset {
    pub fn new(brand: impl Into<String>, svg: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            svg: svg.into(),
        }
    }

    /// SVG source with every fill placeholder replaced by `color`.
    pub fn recolor(&self, color: Color) -> String {
        self.svg.replace(FILL_PLACEHOLDER, &color.to_hex_rgb())
    }

    /// Recolor and rasterize to exactly `height` pixels, width following the
    /// logo's aspect ratio.
    ///
    /// Output alpha is straight (not premultiplied). The color's own alpha is
    /// not applied here; the compositor folds it in when blending.
    pub fn rasterize(&self, color: Color, height: u32) -> Result<RgbaImage, AssetError> {
        let render_err = |message: String| AssetError::Render {
            brand: self.brand.clone(),
            message,
        };

        let svg = self.recolor(color);
        let tree = usvg::Tree::from_str(&svg, &usvg::Options::default()).map_err(|e| {
            AssetError::Parse {
                brand: self.brand.clone(),
                message: e.to_string(),
            }
        })?;

        let size = tree.size();
        if height == 0 || size.width() <= 0.0 || size.height() <= 0.0 {
            return Err(render_err(format!(
                "degenerate size {}x{} at height {height}",
                size.width(),
                size.height()
            )));
        }
        let scale = height as f32 / size.height();
        let width = (size.width() * scale).round().max(1.0) as u32;

        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| render_err(format!("cannot allocate {width}x{height} pixmap")))?;
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap.as_mut(),
        );

        let mut out = RgbaImage::new(width, height);
        for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
            let c = src.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(out)
    }
}

/// Brand name → logo lookup. Keys are case-insensitive.
#[derive(Debug, Clone)]
pub struct LogoTable {
    logos: BTreeMap<String, LogoAsset>,
}

impl LogoTable {
    /// The embedded table shared by the whole process.
    pub fn builtin() -> &'static LogoTable {
        &BUILTIN_TABLE
    }

    /// The built-in logos plus every `<Brand>.svg` in `dir`.
    ///
    /// User files replace built-in logos of the same brand. Files are read
    /// here; their SVG is validated lazily at render time.
    pub fn with_directory(dir: &Path) -> Result<LogoTable, AssetError> {
        let io_err = |path: &Path, source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut table = LogoTable::builtin().clone();
        let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| io_err(dir, e))?.path();
            let is_svg = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
            let Some(brand) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_svg {
                continue;
            }
            let svg = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            log::debug!("Loaded logo for {brand} from {}", path.display());
            table
                .logos
                .insert(brand.to_lowercase(), LogoAsset::new(brand, svg));
        }
        Ok(table)
    }

    /// Logo for `brand`, falling back to the generic logo.
    pub fn get(&self, brand: &str) -> &LogoAsset {
        self.logos
            .get(&brand.to_lowercase())
            .or_else(|| {
                log::debug!("No logo for {brand:?}, using {GENERIC_BRAND}");
                self.logos.get(&GENERIC_BRAND.to_lowercase())
            })
            .unwrap_or_else(|| &BUILTIN_TABLE.logos[&GENERIC_BRAND.to_lowercase()])
    }

    /// Brand names with a logo, sorted case-insensitively.
    pub fn brands(&self) -> Vec<&str> {
        self.logos.values().map(|l| l.brand.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_brand_substring_match() {
        assert_eq!(resolve_brand("Canon Inc."), "Canon");
        assert_eq!(resolve_brand("NIKON CORPORATION"), "Nikon");
        assert_eq!(resolve_brand("FUJIFILM"), "Fujifilm");
        assert_eq!(resolve_brand("OM Digital Solutions"), "Olympus");
        assert_eq!(resolve_brand("  apple "), "Apple");
    }

    #[test]
    fn resolve_brand_defaults_to_generic() {
        assert_eq!(resolve_brand(""), GENERIC_BRAND);
        assert_eq!(resolve_brand("Pentax"), GENERIC_BRAND);
    }

    #[test]
    fn every_supported_brand_has_a_logo() {
        let table = LogoTable::builtin();
        for brand in SUPPORTED_BRANDS {
            assert_eq!(table.get(brand).brand, *brand);
        }
    }

    #[test]
    fn every_maker_maps_to_a_supported_brand() {
        for (_, brand) in MAKER_MAP {
            assert!(SUPPORTED_BRANDS.contains(brand), "{brand} has no logo");
        }
    }

    #[test]
    fn lookup_is_case_insensitive_with_generic_fallback() {
        let table = LogoTable::builtin();
        assert_eq!(table.get("leica").brand, "Leica");
        assert_eq!(table.get("Rollei").brand, GENERIC_BRAND);
    }

    #[test]
    fn recolor_replaces_every_placeholder() {
        let svg = LogoTable::builtin()
            .get("Leica")
            .recolor(Color::rgb(0x12, 0x34, 0x56));
        assert!(!svg.contains(FILL_PLACEHOLDER));
        assert!(svg.contains("#123456"));
    }

    #[test]
    fn every_builtin_logo_rasterizes() {
        let table = LogoTable::builtin();
        for brand in table.brands() {
            let img = table.get(brand).rasterize(Color::BLACK, 40).unwrap();
            assert_eq!(img.height(), 40, "{brand}");
            assert!(img.width() > 0, "{brand}");
            assert!(
                img.pixels().any(|p| p.0[3] > 0),
                "{brand} rendered fully transparent"
            );
        }
    }

    #[test]
    fn rasterize_preserves_aspect_ratio() {
        // Sony's viewBox is 120x32
        let img = LogoTable::builtin()
            .get("Sony")
            .rasterize(Color::WHITE, 32)
            .unwrap();
        assert_eq!(img.width(), 120);
    }

    #[test]
    fn rasterize_applies_fill_color() {
        let img = LogoTable::builtin()
            .get("Nikon")
            .rasterize(Color::rgb(255, 0, 0), 48)
            .unwrap();
        let opaque = img.pixels().find(|p| p.0[3] == 255).unwrap();
        assert_eq!(&opaque.0[..3], &[255, 0, 0]);
    }

    #[test]
    fn corrupt_logo_is_an_asset_error() {
        let asset = LogoAsset::new("Broken", "<svg");
        assert!(matches!(
            asset.rasterize(Color::BLACK, 20),
            Err(AssetError::Parse { .. })
        ));
    }

    #[test]
    fn with_directory_adds_and_overrides() {
        let tmp = tempfile::TempDir::new().unwrap();
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><rect width="10" height="10" fill="{{FILL}}"/></svg>"#;
        std::fs::write(tmp.path().join("Pentax.svg"), svg).unwrap();
        std::fs::write(tmp.path().join("Leica.svg"), svg).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let table = LogoTable::with_directory(tmp.path()).unwrap();
        assert_eq!(table.get("pentax").brand, "Pentax");
        assert_eq!(table.get("Leica").recolor(Color::BLACK), svg.replace(FILL_PLACEHOLDER, "#000000"));
        assert!(!table.brands().contains(&"notes"));
        // built-in table untouched
        assert_eq!(LogoTable::builtin().get("pentax").brand, GENERIC_BRAND);
    }

    #[test]
    fn with_directory_missing_dir_errors() {
        assert!(matches!(
            LogoTable::with_directory(Path::new("/nonexistent/logos")),
            Err(AssetError::Io { .. })
        ));
    }
}
