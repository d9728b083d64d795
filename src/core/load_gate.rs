//! Image-load gate: hold the first measurement until every image settled.
//!
//! A load and an error count the same: the gate only cares that an image
//! will not change size any more.

use std::collections::HashSet;

/// Fires exactly once per arming, after every image has settled.
#[derive(Debug, Clone, Default)]
pub struct ImageLoadGate {
    /// Bumped on every arm so late notices from an old item set are dropped.
    generation: u64,
    expected: usize,
    settled: HashSet<usize>,
    fired: bool,
}

impl ImageLoadGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting on `image_count` images.  Returns `true` when the
    /// gate fires immediately (no images to wait for).
    pub fn arm(&mut self, image_count: usize) -> bool {
        self.generation = self.generation.wrapping_add(1);
        self.expected = image_count;
        self.settled.clear();
        self.fired = image_count == 0;
        self.fired
    }

    /// Re-arm only when the image count changed.  Returns `Some(fired_now)`
    /// when it re-armed.
    pub fn rearm_if_changed(&mut self, image_count: usize) -> Option<bool> {
        (image_count != self.expected).then(|| self.arm(image_count))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_open(&self) -> bool {
        self.fired
    }

    pub fn pending(&self) -> usize {
        self.expected.saturating_sub(self.settled.len())
    }

    /// Record that image `index` loaded or failed.  Returns `true` on the
    /// one call that completes the set.
    pub fn settle(&mut self, generation: u64, index: usize) -> bool {
        if generation != self.generation || self.fired || index >= self.expected {
            return false;
        }
        if !self.settled.insert(index) {
            return false;
        }
        if self.settled.len() == self.expected {
            self.fired = true;
            return true;
        }
        false
    }
}
