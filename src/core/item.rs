//! Loop items, render copies, and the per-sequence layout.
//!
//! The layout is the terminal-independent stand-in for "measure the first
//! rendered copy": it knows each item's extent along the axis and
//! therefore the extent of one full sequence.

use std::path::PathBuf;

use unicode_width::UnicodeWidthStr;

use super::loop_config::Axis;
use super::measure::Measurable;

/// Visual content of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemVisual {
    /// A raster image loaded from disk.
    Image { src: PathBuf },
    /// A text node rendered as-is.
    Text(String),
}

/// One entry in the loop.  Identity is its position in the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopItem {
    pub visual: ItemVisual,
    /// Alt / label text.  Shown in place of an image that failed to load.
    pub alt: String,
    /// Outbound link.
    pub href: Option<String>,
    pub title: Option<String>,
}

impl LoopItem {
    pub fn image(src: impl Into<PathBuf>, alt: impl Into<String>) -> Self {
        Self {
            visual: ItemVisual::Image { src: src.into() },
            alt: alt.into(),
            href: None,
            title: None,
        }
    }

    pub fn text(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            visual: ItemVisual::Text(label.clone()),
            alt: label,
            href: None,
            title: None,
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn is_image(&self) -> bool {
        matches!(self.visual, ItemVisual::Image { .. })
    }

    /// Text shown for the item when no image is drawn.
    pub fn label(&self) -> &str {
        match &self.visual {
            ItemVisual::Text(text) => text,
            ItemVisual::Image { .. } => &self.alt,
        }
    }
}

/// Count of image items, which is what the load gate waits on.
pub fn image_count(items: &[LoopItem]) -> usize {
    items.iter().filter(|i| i.is_image()).count()
}

// ───────────────────────────────────────── copies ────────────

/// One duplicate rendering of the whole sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderCopy {
    pub index: usize,
    /// Copy 0 is the one that gets measured.
    pub reference: bool,
}

pub fn render_copies(count: usize) -> Vec<RenderCopy> {
    (0..count)
        .map(|index| RenderCopy {
            index,
            reference: index == 0,
        })
        .collect()
}

// ───────────────────────────────────────── layout ────────────

/// Load state of an image item as seen by the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    Pending,
    Loaded { width: u32, height: u32 },
    Failed,
}

/// Item extents along the movement axis plus the cross-axis size.
///
/// Extent convention: a trailing gap follows **every** item, including the
/// last, so one sequence spans `Σ (extent_i + gap)` and copies tile
/// seamlessly.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceLayout {
    axis: Axis,
    gap: f64,
    item_size: f64,
    extents: Vec<f64>,
}

impl SequenceLayout {
    /// Lay out `items`.  `image_state(i)` reports the load state of item `i`.
    pub fn compute(
        items: &[LoopItem],
        axis: Axis,
        gap: f64,
        item_size: f64,
        image_state: impl Fn(usize) -> ImageState,
    ) -> Self {
        let gap = gap.max(0.0);
        let item_size = item_size.max(0.0);
        let extents = items
            .iter()
            .enumerate()
            .map(|(i, item)| item_extent(item, axis, item_size, image_state(i)))
            .collect();
        Self {
            axis,
            gap,
            item_size,
            extents,
        }
    }

    /// Layout with every item a fixed extent.
    #[cfg(test)]
    pub fn uniform(count: usize, axis: Axis, item_extent: f64, gap: f64) -> Self {
        Self {
            axis,
            gap: gap.max(0.0),
            item_size: item_extent.max(0.0),
            extents: vec![item_extent.max(0.0); count],
        }
    }

    pub fn extents(&self) -> &[f64] {
        &self.extents
    }

    /// Extent of one full sequence including trailing gaps.
    pub fn sequence_extent(&self) -> f64 {
        self.extents.iter().map(|e| e + self.gap).sum()
    }

    /// Start position of each item within one sequence.
    pub fn item_starts(&self) -> Vec<f64> {
        let mut pos = 0.0;
        self.extents
            .iter()
            .map(|e| {
                let start = pos;
                pos += e + self.gap;
                start
            })
            .collect()
    }

    /// Index of the item covering `pos` (sequence-local, wrapped by the
    /// caller).  Positions inside a gap hit nothing.
    pub fn item_at(&self, pos: f64) -> Option<usize> {
        if pos < 0.0 {
            return None;
        }
        let mut start = 0.0;
        for (i, extent) in self.extents.iter().enumerate() {
            if pos < start + extent {
                return (pos >= start).then_some(i);
            }
            start += extent + self.gap;
        }
        None
    }
}

impl Measurable for SequenceLayout {
    fn width(&self) -> f64 {
        match self.axis {
            Axis::Horizontal => self.sequence_extent(),
            Axis::Vertical => self.item_size,
        }
    }

    fn height(&self) -> f64 {
        match self.axis {
            Axis::Horizontal => self.item_size,
            Axis::Vertical => self.sequence_extent(),
        }
    }
}

/// Extent of a single item along `axis`.
fn item_extent(item: &LoopItem, axis: Axis, item_size: f64, state: ImageState) -> f64 {
    let text_extent = |text: &str| match axis {
        // Display columns (wide glyphs take two), one row for the cross axis.
        Axis::Horizontal => UnicodeWidthStr::width(text) as f64,
        Axis::Vertical => 1.0,
    };
    match (&item.visual, state) {
        (ItemVisual::Text(text), _) => text_extent(text),
        (ItemVisual::Image { .. }, ImageState::Pending) => 0.0,
        (ItemVisual::Image { .. }, ImageState::Failed) => text_extent(&item.alt),
        (ItemVisual::Image { .. }, ImageState::Loaded { width, height }) => {
            if width == 0 || height == 0 {
                return 0.0;
            }
            // Scale so the cross-axis size equals `item_size`.
            match axis {
                Axis::Horizontal => (item_size * width as f64 / height as f64).round(),
                Axis::Vertical => (item_size * height as f64 / width as f64).round(),
            }
        }
    }
}
