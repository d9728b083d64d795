//! Background image decoding.
//!
//! Decoding happens on a small worker pool so the UI thread never blocks on
//! disk or codecs.  Every result is tagged with the item generation it was
//! started for; the main loop drops results from an older item set.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use image::RgbaImage;
use tokio::sync::mpsc;

use crate::core::item::{ImageState, ItemVisual, LoopItem};

#[derive(Debug)]
pub enum ImageUpdate {
    Loaded {
        index: usize,
        path: PathBuf,
        image: Arc<RgbaImage>,
    },
    Failed {
        index: usize,
        path: PathBuf,
        error: String,
    },
}

impl ImageUpdate {
    pub fn index(&self) -> usize {
        match self {
            ImageUpdate::Loaded { index, .. } | ImageUpdate::Failed { index, .. } => *index,
        }
    }

    /// Load outcome in display cells.  A terminal cell shows two vertical
    /// pixels with half blocks, so the height is halved.
    pub fn outcome(&self) -> ImageState {
        match self {
            ImageUpdate::Loaded { image, .. } => cell_dims(image),
            ImageUpdate::Failed { .. } => ImageState::Failed,
        }
    }
}

pub fn cell_dims(image: &RgbaImage) -> ImageState {
    ImageState::Loaded {
        width: image.width(),
        height: image.height().div_ceil(2),
    }
}

struct DecodeJob {
    index: usize,
    path: PathBuf,
}

/// Handle on a running decode batch.
pub struct DecodeBatch {
    generation: u64,
    cancel: Arc<AtomicBool>,
}

impl DecodeBatch {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

/// Decode every image item of `items` in the background.
pub fn start_decoding(
    items: &[LoopItem],
    generation: u64,
    tx: &mpsc::UnboundedSender<(u64, ImageUpdate)>,
) -> DecodeBatch {
    let cancel = Arc::new(AtomicBool::new(false));

    let jobs: VecDeque<DecodeJob> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match &item.visual {
            ItemVisual::Image { src } => Some(DecodeJob {
                index,
                path: src.clone(),
            }),
            ItemVisual::Text(_) => None,
        })
        .collect();

    let job_count = jobs.len();
    let queue = Arc::new(Mutex::new(jobs));
    let max_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .max(1);
    let worker_count = max_threads.min(job_count);

    tracing::debug!(generation, images = job_count, workers = worker_count, "decoding logos");

    for _ in 0..worker_count {
        let queue = Arc::clone(&queue);
        let tx = tx.clone();
        let cancel = Arc::clone(&cancel);
        std::thread::spawn(move || loop {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            let job = {
                let Ok(mut q) = queue.lock() else {
                    break;
                };
                match q.pop_front() {
                    Some(job) => job,
                    None => break,
                }
            };
            let update = decode(job);
            if tx.send((generation, update)).is_err() {
                break; // receiver dropped
            }
        });
    }

    DecodeBatch { generation, cancel }
}

fn decode(job: DecodeJob) -> ImageUpdate {
    match image::open(&job.path) {
        Ok(img) => ImageUpdate::Loaded {
            index: job.index,
            path: job.path,
            image: Arc::new(img.to_rgba8()),
        },
        Err(e) => ImageUpdate::Failed {
            index: job.index,
            path: job.path,
            error: e.to_string(),
        },
    }
}
