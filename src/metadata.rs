//! Camera metadata extraction and normalization.
//!
//! The compositor never looks at raw EXIF tags. It consumes a [`Metadata`]
//! record whose fields are already display strings ("1/100s", "f/1.8",
//! "ISO200"). This module owns the translation from tags to that record.
//!
//! ## Provider seam
//!
//! [`MetadataProvider`] is the seam between the renderer and whatever reads
//! tags from file bytes. The production implementation is [`ExifProvider`]
//! (backed by `nom-exif`); tests substitute a fixed record.
//!
//! ## Normalization rules
//!
//! | Field | Source tag(s) | Display |
//! |---|---|---|
//! | make | `Make` | lowercased |
//! | model | `Model` | make prefix stripped, `Unknown Camera` if empty |
//! | lens | `LensModel` | verbatim |
//! | focal length | `FocalLengthIn35mmFilm`, else `FocalLength` | `35mm` |
//! | aperture | `FNumber` | `f/1.8` |
//! | shutter | `ExposureTime` | `1/100s`, `2s` |
//! | iso | `ISOSpeedRatings` | `ISO200` |
//! | date | `DateTimeOriginal`, else `ModifyDate` | `2024.05.01 14:30` |
//! | gps | GPS IFD | `34.0522°N 118.2437°W` |
//!
//! Missing tags become empty strings. A file with no EXIF block at all yields
//! a mostly blank record, not an error.

use nom_exif::{EntryValue, Exif, ExifIter, ExifTag, LatLng, MediaParser, MediaSource};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// Shown when the camera did not record a model name.
pub const UNKNOWN_MODEL: &str = "Unknown Camera";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to parse metadata: {0}")]
    Parse(String),
}

/// Normalized metadata for one photograph. Empty string means absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub make: String,
    pub model: String,
    pub lens: String,
    pub focal_length: String,
    pub aperture: String,
    pub shutter_speed: String,
    pub iso: String,
    pub date_time: String,
    pub gps: String,
}

/// Reads a [`Metadata`] record out of encoded image bytes.
pub trait MetadataProvider: Sync {
    fn extract(&self, bytes: &[u8]) -> Result<Metadata, MetadataError>;
}

/// Raw tag values before normalization.
///
/// Kept separate from [`Metadata`] so the formatting rules can be tested
/// without constructing EXIF blobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTags {
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens: Option<String>,
    pub focal_length: Option<String>,
    pub focal_length_35mm: Option<String>,
    pub f_number: Option<String>,
    pub exposure_time: Option<String>,
    pub iso: Option<String>,
    pub date_time: Option<String>,
    /// Signed decimal degrees (latitude, longitude).
    pub gps: Option<(f64, f64)>,
}

impl RawTags {
    pub fn normalize(&self) -> Metadata {
        let make = self.make.as_deref().unwrap_or("").trim().to_lowercase();
        let model = strip_make_prefix(self.model.as_deref().unwrap_or(""), &make);

        let focal_length = match self.focal_length_35mm.as_deref().map(str::trim) {
            Some(f35) if !f35.is_empty() && f35 != "0" => format!("{f35}mm"),
            _ => format_focal_length(self.focal_length.as_deref().unwrap_or("")),
        };

        Metadata {
            make,
            model: if model.is_empty() {
                UNKNOWN_MODEL.to_string()
            } else {
                model
            },
            lens: self.lens.as_deref().unwrap_or("").trim().to_string(),
            focal_length,
            aperture: format_aperture(self.f_number.as_deref().unwrap_or("")),
            shutter_speed: format_shutter_speed(self.exposure_time.as_deref().unwrap_or("")),
            iso: match self.iso.as_deref().map(str::trim) {
                Some(iso) if !iso.is_empty() => format!("ISO{iso}"),
                _ => String::new(),
            },
            date_time: self
                .date_time
                .as_deref()
                .and_then(format_date_time)
                .unwrap_or_default(),
            gps: self
                .gps
                .map(|(lat, lng)| format_gps(lat, lng))
                .unwrap_or_default(),
        }
    }
}

/// Remove a leading make from the model ("Canon Canon EOS R5" style
/// duplication). `make` must already be lowercase.
pub fn strip_make_prefix(model: &str, make: &str) -> String {
    let model = model.trim();
    if !make.is_empty() && model.to_lowercase().starts_with(make) {
        // Lowercasing can change byte lengths for non-ASCII text
        if let Some(rest) = model.get(make.len()..) {
            return rest.trim().to_string();
        }
    }
    model.to_string()
}

/// Normalize a focal length to `<n>mm`.
pub fn format_focal_length(raw: &str) -> String {
    let value = raw.trim().replace(" mm", "").replace("mm", "");
    let value = value.trim();
    if value.is_empty() {
        String::new()
    } else {
        format!("{value}mm")
    }
}

/// Prefix an f-number with `f/` unless already present.
pub fn format_aperture(raw: &str) -> String {
    let value = raw.trim();
    if value.is_empty() || value.to_lowercase().starts_with("f/") {
        value.to_string()
    } else {
        format!("f/{value}")
    }
}

/// Format an exposure time for display.
///
/// ```
/// # use lensframe::metadata::format_shutter_speed;
/// assert_eq!(format_shutter_speed("0.01"), "1/100s");
/// assert_eq!(format_shutter_speed("1/250"), "1/250s");
/// assert_eq!(format_shutter_speed("2"), "2s");
/// ```
pub fn format_shutter_speed(raw: &str) -> String {
    let mut shutter = raw.trim().to_string();
    if shutter.is_empty() {
        return shutter;
    }
    if !shutter.contains('/') {
        if let Ok(value) = shutter.parse::<f64>() {
            if value > 0.0 && value < 1.0 {
                shutter = format!("1/{}", (1.0 / value).round() as u64);
            }
        }
    }
    shutter = shutter.replace(" seconds", "s");
    if !shutter.ends_with('s') {
        shutter.push('s');
    }
    shutter
}

/// Reformat an EXIF or ISO-8601 timestamp as `YYYY.MM.DD HH:MM`.
///
/// Accepts `2024:05:01 14:30:59`, `2024-05-01 14:30:59`, and
/// `2024-05-01T14:30:59+02:00`. Returns `None` for anything else.
pub fn format_date_time(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let (date, time) = raw.split_once([' ', 'T'])?;
    let date_parts: Vec<&str> = date.split([':', '-']).collect();
    let [year, month, day] = date_parts.as_slice() else {
        return None;
    };
    let time = time.get(..5)?;
    let (hour, minute) = time.split_once(':')?;
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if ![*year, *month, *day, hour, minute].into_iter().all(all_digits) {
        return None;
    }
    Some(format!("{year}.{month}.{day} {time}"))
}

/// Format signed decimal degrees with hemisphere letters.
pub fn format_gps(latitude: f64, longitude: f64) -> String {
    let lat_ref = if latitude < 0.0 { 'S' } else { 'N' };
    let lng_ref = if longitude < 0.0 { 'W' } else { 'E' };
    format!(
        "{:.4}°{lat_ref} {:.4}°{lng_ref}",
        latitude.abs(),
        longitude.abs()
    )
}

/// EXIF reader backed by `nom-exif`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifProvider;

impl ExifProvider {
    pub fn new() -> Self {
        Self
    }

    fn read_tags(&self, bytes: &[u8]) -> Result<Option<RawTags>, MetadataError> {
        let mut parser = MediaParser::new();
        let ms = MediaSource::seekable(Cursor::new(bytes))
            .map_err(|e| MetadataError::Parse(e.to_string()))?;

        let iter: ExifIter = match parser.parse(ms) {
            Ok(iter) => iter,
            Err(e) => {
                log::debug!("No EXIF data found: {e}");
                return Ok(None);
            }
        };

        // GPS must be read before the iterator is consumed
        let gps = iter.parse_gps_info().ok().flatten().and_then(|info| {
            Some((
                latlng_to_decimal(&info.latitude, info.latitude_ref)?,
                latlng_to_decimal(&info.longitude, info.longitude_ref)?,
            ))
        });
        let exif: Exif = iter.into();
        let text = |tag: ExifTag| exif.get(tag).and_then(entry_to_string);

        Ok(Some(RawTags {
            make: text(ExifTag::Make),
            model: text(ExifTag::Model),
            lens: text(ExifTag::LensModel),
            focal_length: exif.get(ExifTag::FocalLength).and_then(entry_to_number),
            focal_length_35mm: exif
                .get(ExifTag::FocalLengthIn35mmFilm)
                .and_then(entry_to_number),
            f_number: exif.get(ExifTag::FNumber).and_then(entry_to_number),
            exposure_time: exif.get(ExifTag::ExposureTime).and_then(entry_to_exposure),
            iso: exif.get(ExifTag::ISOSpeedRatings).and_then(entry_to_number),
            date_time: text(ExifTag::DateTimeOriginal).or_else(|| text(ExifTag::ModifyDate)),
            gps,
        }))
    }
}

impl MetadataProvider for ExifProvider {
    fn extract(&self, bytes: &[u8]) -> Result<Metadata, MetadataError> {
        if bytes.is_empty() {
            return Err(MetadataError::Parse("empty input".into()));
        }
        let tags = self.read_tags(bytes)?.unwrap_or_default();
        Ok(tags.normalize())
    }
}

/// Extract with `provider`, falling back to a blank record on failure.
pub fn extract_or_default(provider: &dyn MetadataProvider, bytes: &[u8]) -> Metadata {
    provider.extract(bytes).unwrap_or_else(|e| {
        log::warn!("{e}; continuing with blank metadata");
        Metadata::default()
    })
}

fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').trim_end_matches('\0').trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Render a numeric entry in plain decimal form ("0.01", "1.8", "200").
fn entry_to_number(val: &EntryValue) -> Option<String> {
    let value = match val {
        EntryValue::URational(r) if r.1 != 0 => r.0 as f64 / r.1 as f64,
        EntryValue::IRational(r) if r.1 != 0 => r.0 as f64 / r.1 as f64,
        EntryValue::U8(v) => *v as f64,
        EntryValue::U16(v) => *v as f64,
        EntryValue::U32(v) => *v as f64,
        EntryValue::F32(v) => *v as f64,
        EntryValue::F64(v) => *v,
        EntryValue::U16Array(values) => *values.first()? as f64,
        _ => return entry_to_string(val),
    };
    if !value.is_finite() {
        return None;
    }
    Some(trim_decimal(value))
}

/// Exposure time as a fraction when it is one ("1/8000"), else a decimal
/// with full precision so [`format_shutter_speed`] can round it.
fn entry_to_exposure(val: &EntryValue) -> Option<String> {
    match val {
        EntryValue::URational(r) if r.0 > 0 && r.1 > 0 => {
            Some(exposure_from_ratio(r.0 as u64, r.1 as u64))
        }
        EntryValue::URational(_) => None,
        EntryValue::F32(v) if v.is_finite() => Some(v.to_string()),
        EntryValue::F64(v) if v.is_finite() => Some(v.to_string()),
        _ => entry_to_number(val),
    }
}

fn exposure_from_ratio(numerator: u64, denominator: u64) -> String {
    let divisor = gcd(numerator, denominator);
    let (num, den) = (numerator / divisor, denominator / divisor);
    if den == 1 {
        num.to_string()
    } else if num == 1 {
        format!("1/{den}")
    } else {
        (num as f64 / den as f64).to_string()
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Four significant decimals without trailing zeros.
fn trim_decimal(value: f64) -> String {
    let s = format!("{value:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

/// Signed decimal degrees, or `None` when a component has a zero
/// denominator.
fn latlng_to_decimal(latlng: &LatLng, reference: char) -> Option<f64> {
    let degrees = latlng.0.0 as f64 / latlng.0.1 as f64;
    let minutes = latlng.1.0 as f64 / latlng.1.1 as f64;
    let seconds = latlng.2.0 as f64 / latlng.2.1 as f64;

    let coord = degrees + minutes / 60.0 + seconds / 3600.0;
    if !coord.is_finite() {
        return None;
    }
    Some(if reference == 'S' || reference == 'W' {
        -coord
    } else {
        coord
    })
}
