//! File-level rendering: one photo on disk, or a directory of them.
//!
//! The engine in [`imaging`](crate::imaging) never touches the filesystem.
//! This module is the layer that does: it reads source files, extracts
//! metadata, renders, and writes `<stem><suffix>.jpg` next to the source
//! (or into an output directory).
//!
//! ## Parallel Processing
//!
//! [`run_batch`] renders files in parallel using [rayon](https://docs.rs/rayon).
//! Each render owns its canvas; the compositor is shared by reference.
//! Progress is reported through an optional `mpsc` channel so the caller can
//! print while workers keep going.
//!
//! ## Discovery
//!
//! [`discover_images`] walks a directory tree with `walkdir`, keeping files
//! with a supported extension and skipping outputs of earlier runs (stems
//! that already end with the suffix).

use crate::imaging::{self, Compositor, RenderError, RenderedImage};
use crate::metadata::{Metadata, MetadataProvider, extract_or_default};
use crate::style::Style;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

/// Extensions the decoder is built with.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp"];

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("{path}: {source}")]
    Render { path: PathBuf, source: RenderError },
}

/// Picks the style for one photo from its metadata.
pub type StyleResolver<'a> = &'a (dyn Fn(&Metadata) -> Style + Sync);

/// How to render and where to write.
#[derive(Clone, Copy)]
pub struct RenderJob<'a> {
    pub compositor: &'a Compositor,
    pub provider: &'a dyn MetadataProvider,
    /// Called once per photo, so a style can follow what each photo carries
    /// (see [`Style::adapted_to`]).
    pub style: StyleResolver<'a>,
    pub suffix: &'a str,
    /// Write here instead of next to each source.
    pub output_dir: Option<&'a Path>,
}

/// Result of rendering one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Progress events emitted during a batch.
#[derive(Debug)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    Rendered {
        index: usize,
        file: RenderedFile,
    },
    Failed {
        index: usize,
        source: PathBuf,
        error: String,
    },
}

/// Totals of a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub rendered: usize,
    pub failed: usize,
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} rendered, {} failed", self.rendered, self.failed)
    }
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

/// Where the render of `source` goes: `<dir>/<stem><suffix>.jpg`.
pub fn output_path(source: &Path, suffix: &str, output_dir: Option<&Path>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{stem}{suffix}.jpg");
    match output_dir.or_else(|| source.parent()) {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Every supported image under `root`, sorted by path.
///
/// Files whose stem already ends with `suffix` are skipped so re-running a
/// batch does not frame its own outputs.
pub fn discover_images(root: &Path, suffix: &str) -> Result<Vec<PathBuf>, BatchError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !has_supported_extension(entry.path()) {
            continue;
        }
        let is_output = !suffix.is_empty()
            && entry
                .path()
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.ends_with(suffix));
        if is_output {
            log::debug!("Skipping earlier output {}", entry.path().display());
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

/// Decode `source` and read its metadata. Metadata failures fall back to
/// the blank record; decode failures are errors.
pub fn load_photo(
    provider: &dyn MetadataProvider,
    source: &Path,
) -> Result<(image::DynamicImage, Metadata), BatchError> {
    let bytes = std::fs::read(source).map_err(|e| BatchError::Io {
        path: source.to_path_buf(),
        source: e,
    })?;
    let image = imaging::decode(&bytes).map_err(|e| BatchError::Render {
        path: source.to_path_buf(),
        source: e,
    })?;
    Ok((image, extract_or_default(provider, &bytes)))
}

/// Write an encoded render, creating the parent directory if needed.
pub fn write_rendered(rendered: &RenderedImage, output: &Path) -> Result<(), BatchError> {
    let io_err = |e| BatchError::Io {
        path: output.to_path_buf(),
        source: e,
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(output, &rendered.bytes).map_err(io_err)
}

/// Render one file to its output path.
pub fn render_file(job: &RenderJob<'_>, source: &Path) -> Result<RenderedFile, BatchError> {
    let (image, metadata) = load_photo(job.provider, source)?;
    let style = (job.style)(&metadata);

    let rendered = job
        .compositor
        .render(&image, &metadata, &style)
        .map_err(|e| BatchError::Render {
            path: source.to_path_buf(),
            source: e,
        })?;
    let output = output_path(source, job.suffix, job.output_dir);
    write_rendered(&rendered, &output)?;
    log::info!("{} -> {}", source.display(), output.display());

    Ok(RenderedFile {
        source: source.to_path_buf(),
        output,
        width: rendered.width,
        height: rendered.height,
    })
}

/// Render every file in parallel. A failing file is reported and counted;
/// it never stops the rest of the batch.
pub fn run_batch(
    job: &RenderJob<'_>,
    files: &[PathBuf],
    events: Option<Sender<BatchEvent>>,
) -> BatchSummary {
    let send = |event: BatchEvent| {
        if let Some(tx) = &events {
            // printer gone is not a reason to stop rendering
            tx.send(event).ok();
        }
    };
    send(BatchEvent::Started { total: files.len() });

    let outcomes: Vec<bool> = files
        .par_iter()
        .enumerate()
        .map(|(i, source)| match render_file(job, source) {
            Ok(file) => {
                send(BatchEvent::Rendered {
                    index: i + 1,
                    file,
                });
                true
            }
            Err(e) => {
                log::warn!("{e}");
                send(BatchEvent::Failed {
                    index: i + 1,
                    source: source.clone(),
                    error: e.to_string(),
                });
                false
            }
        })
        .collect();

    let rendered = outcomes.iter().filter(|ok| **ok).count();
    BatchSummary {
        rendered,
        failed: outcomes.len() - rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tests::FixedProvider;
    use crate::test_helpers::*;
    use std::fs;
    use tempfile::TempDir;

    fn provider() -> FixedProvider {
        FixedProvider(Ok(sample_metadata()))
    }

    fn default_style(_: &Metadata) -> Style {
        Style::default()
    }

    fn job<'a>(compositor: &'a Compositor, provider: &'a FixedProvider) -> RenderJob<'a> {
        RenderJob {
            compositor,
            provider,
            style: &default_style,
            suffix: "-framed",
            output_dir: None,
        }
    }

    #[test]
    fn output_path_appends_suffix_next_to_source() {
        assert_eq!(
            output_path(Path::new("/photos/IMG_0001.JPG"), "-framed", None),
            PathBuf::from("/photos/IMG_0001-framed.jpg")
        );
    }

    #[test]
    fn output_path_uses_output_dir() {
        assert_eq!(
            output_path(Path::new("/photos/a.png"), "", Some(Path::new("/out"))),
            PathBuf::from("/out/a.jpg")
        );
    }

    #[test]
    fn discover_filters_extensions_and_previous_outputs() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        for name in ["b.jpg", "a.PNG", "notes.txt", "b-framed.jpg", "sub/c.tiff"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }
        let found: Vec<String> = discover_images(tmp.path(), "-framed")
            .unwrap()
            .iter()
            .map(|p| {
                p.strip_prefix(tmp.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(found, vec!["a.PNG", "b.jpg", "sub/c.tiff"]);
    }

    #[test]
    fn render_file_writes_jpeg() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("shot.jpg");
        fs::write(&source, jpeg_bytes(100, 80)).unwrap();

        let compositor = Compositor::new().unwrap();
        let provider = provider();
        let file = render_file(&job(&compositor, &provider), &source).unwrap();

        assert_eq!(file.output, tmp.path().join("shot-framed.jpg"));
        assert_eq!((file.width, file.height), (100, 88));
        let written = fs::read(&file.output).unwrap();
        assert_eq!(&written[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn style_is_resolved_from_each_photos_metadata() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("shot.jpg");
        fs::write(&source, jpeg_bytes(100, 80)).unwrap();

        let compositor = Compositor::new().unwrap();
        let provider = provider();
        let tall_bar_with_lens = |m: &Metadata| Style {
            padding: if m.lens.is_empty() { 5 } else { 25 },
            ..Style::default()
        };
        let job = RenderJob {
            style: &tall_bar_with_lens,
            ..job(&compositor, &provider)
        };
        let file = render_file(&job, &source).unwrap();
        assert_eq!(file.height, 100);
    }

    #[test]
    fn render_file_reports_undecodable_source() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        fs::write(&source, b"not a jpeg").unwrap();

        let compositor = Compositor::new().unwrap();
        let provider = provider();
        let result = render_file(&job(&compositor, &provider), &source);
        assert!(matches!(result, Err(BatchError::Render { .. })));
    }

    #[test]
    fn batch_counts_successes_and_failures() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("one.jpg"), jpeg_bytes(60, 40)).unwrap();
        fs::write(tmp.path().join("two.jpg"), jpeg_bytes(40, 60)).unwrap();
        fs::write(tmp.path().join("bad.jpg"), b"garbage").unwrap();

        let compositor = Compositor::new().unwrap();
        let provider = provider();
        let files = discover_images(tmp.path(), "-framed").unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        let summary = run_batch(&job(&compositor, &provider), &files, Some(tx));
        assert_eq!(
            summary,
            BatchSummary {
                rendered: 2,
                failed: 1
            }
        );

        let events: Vec<BatchEvent> = rx.iter().collect();
        assert!(matches!(events[0], BatchEvent::Started { total: 3 }));
        assert_eq!(events.len(), 4);
        assert!(tmp.path().join("one-framed.jpg").exists());
        assert!(!tmp.path().join("bad-framed.jpg").exists());
    }

    #[test]
    fn summary_display() {
        let summary = BatchSummary {
            rendered: 3,
            failed: 1,
        };
        assert_eq!(summary.to_string(), "3 rendered, 1 failed");
    }
}
