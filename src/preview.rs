//! Latest-wins preview rendering on a background thread.
//!
//! An editor re-renders on every slider tick, which is far more often than a
//! full-resolution render completes. The [`Previewer`] keeps a single pending
//! slot: submitting a style replaces whatever has not started yet, so the
//! worker never falls behind by more than one render and always finishes on
//! the newest style.
//!
//! ```text
//! submit(style) ──► [ pending slot ] ──► worker thread ──► mpsc ──► caller
//!                   (overwritten)         Compositor::render
//! ```
//!
//! Each submission gets a generation number. Results carry it back, so the
//! caller can discard anything older than what it already displays.

use crate::imaging::{Compositor, RenderError, RenderedImage};
use crate::metadata::Metadata;
use crate::style::Style;
use image::DynamicImage;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// One finished preview render.
#[derive(Debug)]
pub struct PreviewResult {
    /// Generation returned by the [`Previewer::submit`] that produced it.
    pub generation: u64,
    pub result: Result<RenderedImage, RenderError>,
}

#[derive(Default)]
struct Slot {
    pending: Option<(u64, Style)>,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        // Slot holds plain data; a panic elsewhere cannot leave it torn.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a preview worker bound to one photo.
///
/// Dropping the handle stops the worker once its current render finishes;
/// a request still waiting in the slot is discarded.
pub struct Previewer {
    shared: Arc<Shared>,
    generation: u64,
    worker: Option<JoinHandle<()>>,
}

impl Previewer {
    /// Start a worker for `image`. Results arrive on the returned receiver.
    pub fn spawn(
        compositor: Compositor,
        image: DynamicImage,
        metadata: Metadata,
    ) -> (Self, Receiver<PreviewResult>) {
        let shared = Arc::new(Shared::default());
        let (tx, rx) = mpsc::channel();
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("lensframe-preview".into())
            .spawn(move || run_worker(&worker_shared, &compositor, &image, &metadata, tx))
            .map_err(|e| log::error!("Failed to start preview worker: {e}"))
            .ok();

        let previewer = Self {
            shared,
            generation: 0,
            worker,
        };
        (previewer, rx)
    }

    /// Queue a render of `style`, replacing any request not yet started.
    /// Returns the generation the result will carry.
    pub fn submit(&mut self, style: Style) -> u64 {
        self.generation += 1;
        let mut slot = self.shared.lock();
        if let Some((superseded, _)) = slot.pending.replace((self.generation, style)) {
            log::debug!("Preview {superseded} superseded by {}", self.generation);
        }
        drop(slot);
        self.shared.ready.notify_one();
        self.generation
    }

    /// Generation of the most recent submission (0 before the first).
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for Previewer {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.ready.notify_one();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Preview worker panicked");
            }
        }
    }
}

fn run_worker(
    shared: &Shared,
    compositor: &Compositor,
    image: &DynamicImage,
    metadata: &Metadata,
    tx: Sender<PreviewResult>,
) {
    loop {
        let (generation, style) = {
            let mut slot = shared.lock();
            loop {
                if slot.shutdown {
                    return;
                }
                if let Some(request) = slot.pending.take() {
                    break request;
                }
                slot = shared
                    .ready
                    .wait(slot)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        log::debug!("Rendering preview {generation}");
        let result = compositor.render(image, metadata, &style);
        if tx.send(PreviewResult { generation, result }).is_err() {
            // receiver gone
            return;
        }
    }
}
