//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Render / Batch
//!
//! ```text
//! Framing 3 photos
//! 001 IMG_0001.jpg → IMG_0001-framed.jpg (6000×4400)
//! 002 IMG_0002.jpg
//!     Error: Failed to decode source image: ...
//! 003 IMG_0003.jpg → IMG_0003-framed.jpg (4000×6600)
//! 2 rendered, 1 failed
//! ```
//!
//! ## Inspect
//!
//! ```text
//! IMG_0001.jpg
//!     Make:          canon
//!     Model:         EOS R5
//!     Lens:          RF24-70mm F2.8 L IS USM
//!     Focal length:  35mm
//!     ...
//!     Brand:         Canon
//! ```
//!
//! ## Brands
//!
//! ```text
//! Apple
//! Canon
//! ...
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchSummary, RenderedFile};
use crate::brand::{LogoTable, resolve_brand};
use crate::metadata::Metadata;
use std::path::Path;

/// Placeholder shown for metadata fields the photo does not carry.
const MISSING: &str = "—";

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// File name of `path`, or the whole path when it has none.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Render / batch
// ============================================================================

/// One rendered file: `source → output (W×H)`.
pub fn format_rendered(file: &RenderedFile) -> String {
    format!(
        "{} \u{2192} {} ({}\u{d7}{})",
        file_name(&file.source),
        file_name(&file.output),
        file.width,
        file.height
    )
}

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => vec![format!("Framing {}", plural(*total, "photo"))],
        BatchEvent::Rendered { index, file } => {
            vec![format!("{} {}", format_index(*index), format_rendered(file))]
        }
        BatchEvent::Failed {
            index,
            source,
            error,
        } => vec![
            format!("{} {}", format_index(*index), file_name(source)),
            format!("{}Error: {}", indent(1), error),
        ],
    }
}

pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    vec![summary.to_string()]
}

pub fn print_batch_summary(summary: &BatchSummary) {
    for line in format_batch_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Inspect
// ============================================================================

/// Format extracted metadata as an aligned field list.
///
/// Empty fields show a dash so every photo prints the same shape. The
/// brand line shows which logo `brand = "Auto"` would pick.
pub fn format_metadata(source: &Path, metadata: &Metadata) -> Vec<String> {
    let fields = [
        ("Make", metadata.make.as_str()),
        ("Model", metadata.model.as_str()),
        ("Lens", metadata.lens.as_str()),
        ("Focal length", metadata.focal_length.as_str()),
        ("Aperture", metadata.aperture.as_str()),
        ("Shutter", metadata.shutter_speed.as_str()),
        ("ISO", metadata.iso.as_str()),
        ("Date", metadata.date_time.as_str()),
        ("GPS", metadata.gps.as_str()),
        ("Brand", resolve_brand(&metadata.make)),
    ];

    let mut lines = vec![file_name(source)];
    for (label, value) in fields {
        let value = if value.is_empty() { MISSING } else { value };
        lines.push(format!("{}{:<15}{}", indent(1), format!("{label}:"), value));
    }
    lines
}

pub fn print_metadata(source: &Path, metadata: &Metadata) {
    for line in format_metadata(source, metadata) {
        println!("{}", line);
    }
}

// ============================================================================
// Brands
// ============================================================================

/// Every brand with a logo in `table`, one per line.
pub fn format_brands(table: &LogoTable) -> Vec<String> {
    table.brands().into_iter().map(str::to_string).collect()
}

pub fn print_brands(table: &LogoTable) {
    for line in format_brands(table) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_metadata;
    use std::path::PathBuf;

    fn rendered_file() -> RenderedFile {
        RenderedFile {
            source: PathBuf::from("/photos/IMG_0001.jpg"),
            output: PathBuf::from("/photos/IMG_0001-framed.jpg"),
            width: 6000,
            height: 4400,
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads_to_three() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "photo"), "1 photo");
        assert_eq!(plural(0, "photo"), "0 photos");
        assert_eq!(plural(3, "photo"), "3 photos");
    }

    // =========================================================================
    // Render / batch
    // =========================================================================

    #[test]
    fn rendered_line_shows_names_and_size() {
        assert_eq!(
            format_rendered(&rendered_file()),
            "IMG_0001.jpg \u{2192} IMG_0001-framed.jpg (6000\u{d7}4400)"
        );
    }

    #[test]
    fn batch_started_event() {
        let lines = format_batch_event(&BatchEvent::Started { total: 1 });
        assert_eq!(lines, vec!["Framing 1 photo"]);
    }

    #[test]
    fn batch_rendered_event_is_indexed() {
        let lines = format_batch_event(&BatchEvent::Rendered {
            index: 7,
            file: rendered_file(),
        });
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("007 IMG_0001.jpg"));
    }

    #[test]
    fn batch_failed_event_shows_error_indented() {
        let lines = format_batch_event(&BatchEvent::Failed {
            index: 2,
            source: PathBuf::from("/photos/broken.jpg"),
            error: "bad data".into(),
        });
        assert_eq!(lines, vec!["002 broken.jpg", "    Error: bad data"]);
    }

    #[test]
    fn batch_summary_line() {
        let lines = format_batch_summary(&BatchSummary {
            rendered: 2,
            failed: 1,
        });
        assert_eq!(lines, vec!["2 rendered, 1 failed"]);
    }

    // =========================================================================
    // Inspect
    // =========================================================================

    #[test]
    fn metadata_lists_every_field_and_brand() {
        let lines = format_metadata(Path::new("IMG_0001.jpg"), &sample_metadata());
        assert_eq!(lines[0], "IMG_0001.jpg");
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[2], "    Model:         EOS R5");
        assert_eq!(lines[10], "    Brand:         Canon");
    }

    #[test]
    fn metadata_missing_fields_show_dash() {
        let lines = format_metadata(Path::new("blank.png"), &Metadata::default());
        assert_eq!(lines[3], format!("    Lens:          {MISSING}"));
        assert_eq!(lines[10], "    Brand:         Generic");
    }

    // =========================================================================
    // Brands
    // =========================================================================

    #[test]
    fn brands_include_builtins() {
        let lines = format_brands(LogoTable::builtin());
        assert!(lines.iter().any(|l| l == "Leica"));
        assert!(lines.iter().any(|l| l == "Generic"));
    }
}
