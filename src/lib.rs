//! # LensFrame
//!
//! Adds a camera information bar to photographs. The bar sits underneath
//! the photo and carries the camera model, lens, exposure settings, capture
//! date, GPS position and the camera brand's logo, over a solid fill or a
//! frosted-glass treatment derived from the photo itself.
//!
//! # Architecture
//!
//! ```text
//! bytes ──► metadata::ExifProvider ──► Metadata ─┐
//!   │                                           ├─► imaging::Compositor ──► JPEG
//!   └───► imaging::decode ──► DynamicImage ──────┤
//!                                  Style ────────┘
//! ```
//!
//! A render is a pure function of its three inputs: the same image,
//! metadata and style always produce the same bytes. Nothing is cached
//! between renders and the engine holds no mutable state, so one
//! [`imaging::Compositor`] can be shared by every thread of a batch.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`metadata`] | EXIF extraction and normalization into display strings |
//! | [`style`] | The immutable render options and the effective-value rule |
//! | [`color`] | Color parsing for frame and text colors |
//! | [`brand`] | Maker → brand resolution and the SVG logo table |
//! | [`imaging`] | Layout math, text and logo drawing, glass background, JPEG encoding |
//! | [`preview`] | Latest-wins background renderer for interactive editing |
//! | [`batch`] | Filesystem layer: discover, render and write photos in parallel |
//! | [`config`] | `lensframe.toml` loading, validation, and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Everything Embedded
//!
//! Fonts (DejaVu Sans, Sans Bold, Sans Mono Bold) and brand logos are
//! compiled into the binary. Text measurement and layout therefore never
//! depend on what the host has installed, which is what makes renders
//! reproducible across machines.
//!
//! ## Logos Recolored in Memory
//!
//! Logos are SVG with a `{{FILL}}` placeholder. A render substitutes the
//! text color and rasterizes the result with `resvg` at the exact pixel
//! height needed, so logos stay sharp at any photo size.
//!
//! ## Proportional Layout
//!
//! Every size in the bar (fonts, margins, logo, divider) is a fixed ratio of
//! the bar height, and the bar height is a percentage of the photo height.
//! A 1000 px phone shot and a 9000 px medium-format frame get the same look.

pub mod batch;
pub mod brand;
pub mod color;
pub mod config;
pub mod imaging;
pub mod metadata;
pub mod output;
pub mod preview;
pub mod style;

#[cfg(test)]
pub(crate) mod test_helpers;
