//! Central application state.
//!
//! All mutable state lives here so that the rest of the app can be pure
//! functions over `&AppState` (rendering) or `&mut AppState` (event handling).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use ratatui::layout::Rect;

use crate::config::AppConfig;
use crate::core::item::LoopItem;
use crate::core::logo_loop::LogoLoop;
use crate::core::loop_config::{Axis, HoverBehavior, MotionTuning};
use crate::core::manifest::ItemSource;
use crate::core::measure::ResizeTrigger;
use crate::core::motion::FrameQueue;
use crate::core::visibility::Span;
use crate::ui::layout::{AppLayout, BandSlot, PageLayout};
use crate::ui::marquee::FittedImages;
use crate::ui::smooth_scroll::SmoothScroll;

use super::image_runtime::ImageUpdate;

/// Page scroll damping per frame.
const SCROLL_DAMPING: f64 = 0.3;

/// One logo loop on the page with its own frame slot.
pub struct Band {
    pub logo: LogoLoop,
    pub frames: FrameQueue,
}

/// What the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hover {
    pub band: usize,
    pub item: Option<usize>,
}

/// Top-level application state.
pub struct AppState {
    pub config: AppConfig,
    /// Where settings changed from the keyboard are saved.
    pub config_path: PathBuf,
    /// Where items were loaded from; re-read on reload.
    pub source: ItemSource,
    pub bands: Vec<Band>,
    /// Bumped whenever the item set is replaced.  Tags decode results.
    pub items_generation: u64,
    /// Decoded logos keyed by path.
    pub images: HashMap<PathBuf, Arc<RgbaImage>>,
    /// Logos scaled to their tiles.
    pub fitted: FittedImages,
    /// Full terminal area.
    pub viewport: Rect,
    pub page: PageLayout,
    pub scroll: SmoothScroll,
    /// Terminal focus; unfocused bands stop animating.
    pub focused: bool,
    pub hover: Option<Hover>,
    /// Link of the item the user clicked, printed on exit.
    pub selected_href: Option<String>,
    /// An optional status message shown in the bottom bar.
    pub status_message: Option<String>,
    /// Controls the main event loop.
    pub should_quit: bool,
}

impl AppState {
    pub fn new(config: AppConfig, source: ItemSource, items: Vec<LoopItem>, viewport: Rect) -> Self {
        let mut state = Self {
            config_path: crate::config::config_path(),
            source,
            bands: Vec::new(),
            items_generation: 0,
            images: HashMap::new(),
            fitted: FittedImages::default(),
            viewport,
            page: PageLayout {
                slots: Vec::new(),
                page_height: 0,
            },
            scroll: SmoothScroll::new(SCROLL_DAMPING),
            focused: true,
            hover: None,
            selected_href: None,
            status_message: None,
            should_quit: false,
            config,
        };
        state.page = state.compute_page();
        state.bands = (0..state.config.bands)
            .map(|i| Band {
                logo: LogoLoop::new(
                    state.config.loop_config(i),
                    items.clone(),
                    state.tuning(),
                    state.slot(i).container(),
                ),
                frames: FrameQueue::new(),
            })
            .collect();
        state
    }

    pub fn tuning(&self) -> MotionTuning {
        MotionTuning {
            visibility_margin: f64::from(self.config.lookahead_rows),
            ..MotionTuning::default()
        }
    }

    pub fn page_area(&self) -> Rect {
        AppLayout::from_area(self.viewport).page_area
    }

    fn axis(&self) -> Axis {
        self.config.direction.axis()
    }

    fn compute_page(&self) -> PageLayout {
        PageLayout::compute(
            self.page_area(),
            self.config.bands,
            self.axis(),
            self.config.item_size,
            self.config.width,
        )
    }

    /// Slot of band `index`.  Bands that do not fit the page get an empty
    /// slot below it.
    pub fn slot(&self, index: usize) -> BandSlot {
        self.page.slots.get(index).copied().unwrap_or(BandSlot {
            x: 0,
            top: self.page.page_height,
            width: 0,
            height: 0,
        })
    }

    // ── lifecycle ───────────────────────────────────────────────

    /// Mount every band, measure against the current page and apply the
    /// initial visibility.
    pub fn mount(&mut self) {
        for band in &mut self.bands {
            band.logo.mount(true, &mut band.frames);
        }
        self.relayout();
    }

    pub fn unmount(&mut self) {
        for band in &mut self.bands {
            band.logo.unmount(&mut band.frames);
        }
    }

    /// Swap the item set on every band.  Returns the new generation so the
    /// caller can start decoding.
    pub fn replace_items(&mut self, items: Vec<LoopItem>) -> u64 {
        self.items_generation = self.items_generation.wrapping_add(1);
        self.images.clear();
        self.hover = None;
        for band in &mut self.bands {
            band.logo.replace_items(items.clone());
        }
        self.items_generation
    }

    // ── layout & visibility ─────────────────────────────────────

    /// The terminal was resized.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.viewport = Rect::new(0, 0, width, height);
        self.relayout();
    }

    /// Recompute the page and re-measure every band.
    pub fn relayout(&mut self) {
        self.page = self.compute_page();
        let page = self.page_area();
        for i in 0..self.bands.len() {
            let slot = self.slot(i);
            let band = &mut self.bands[i];
            if let Some(m) = band
                .logo
                .relayout(ResizeTrigger::Window, slot.container(), Some(slot.parent(page)))
            {
                tracing::debug!(
                    band = i,
                    copies = m.copies,
                    sequence = m.sequence_extent,
                    container = m.container_extent,
                    synced_height = ?m.synced_height,
                    "band measured"
                );
            }
        }
        let max = self.page.max_scroll(self.page_area());
        if self.scroll.target() > max {
            self.scroll.set_target(max);
        }
        self.update_visibility();
    }

    /// Re-test every band against the viewport.  An unfocused terminal
    /// counts as nothing being visible.
    pub fn update_visibility(&mut self) {
        let viewport = Span::new(0.0, f64::from(self.page_area().height));
        let scroll = self.scroll.position();
        let slots: Vec<BandSlot> = (0..self.bands.len()).map(|i| self.slot(i)).collect();
        for (i, (band, slot)) in self.bands.iter_mut().zip(slots).enumerate() {
            let change = if self.focused {
                band.logo
                    .observe_visibility(slot.span(scroll), viewport, &mut band.frames)
            } else {
                band.logo.force_visible(false, &mut band.frames)
            };
            if let Some(change) = change {
                tracing::debug!(band = i, ?change, "band visibility changed");
            }
        }
    }

    pub fn set_focus(&mut self, focused: bool) {
        self.focused = focused;
        self.update_visibility();
    }

    /// Scroll the page by `rows` (negative is up).
    pub fn scroll_by(&mut self, rows: i32) {
        let max = i32::from(self.page.max_scroll(self.page_area()));
        let target = (i32::from(self.scroll.target()) + rows).clamp(0, max);
        self.scroll.set_target(u16::try_from(target).unwrap_or(0));
    }

    // ── frames ──────────────────────────────────────────────────

    /// Anything waiting on the frame clock.
    pub fn wants_frame(&self) -> bool {
        self.scroll.is_animating() || self.bands.iter().any(|b| b.frames.is_pending())
    }

    /// Deliver one frame to every band that asked for one.
    pub fn frame(&mut self, timestamp: Duration) {
        if self.scroll.is_animating() {
            self.scroll.tick();
            self.update_visibility();
        }
        for band in &mut self.bands {
            if let Some(handle) = band.frames.take_due() {
                band.logo.frame(handle, timestamp, &mut band.frames);
            }
        }
    }

    // ── images ──────────────────────────────────────────────────

    /// Apply a decode result.  Results for an older item set are dropped.
    pub fn apply_image(&mut self, generation: u64, update: ImageUpdate) {
        if generation != self.items_generation {
            tracing::debug!(generation, current = self.items_generation, "dropping stale image");
            return;
        }
        let index = update.index();
        let outcome = update.outcome();
        match update {
            ImageUpdate::Loaded { path, image, .. } => {
                self.images.insert(path, image);
            }
            ImageUpdate::Failed { path, error, .. } => {
                tracing::warn!(path = %path.display(), %error, "logo failed to load, showing alt text");
            }
        }
        for band in &mut self.bands {
            let band_generation = band.logo.items_generation();
            band.logo.image_settled(band_generation, index, outcome);
        }
    }

    /// Bring the scaled tiles in line with the current layout.
    pub fn refresh_tiles(&mut self) {
        self.fitted
            .prepare(self.bands.iter().map(|b| &b.logo), &self.images);
    }

    // ── settings ────────────────────────────────────────────────

    pub fn set_speed(&mut self, speed: f64) {
        self.config.speed = speed.clamp(-1000.0, 1000.0);
        for band in &mut self.bands {
            band.logo.set_speed(self.config.speed);
        }
    }

    pub fn cycle_direction(&mut self) {
        self.config.direction = self.config.direction.cycled();
        for (i, band) in self.bands.iter_mut().enumerate() {
            band.logo.set_direction(self.config.loop_config(i).direction);
        }
        self.hover = None;
        self.relayout();
    }

    /// None → pause → slow (a quarter of the speed) → none.
    pub fn cycle_hover(&mut self) {
        self.config.hover = match self.config.hover {
            HoverBehavior::None => HoverBehavior::Pause,
            HoverBehavior::Pause => HoverBehavior::Slow((self.config.speed / 4.0).abs()),
            HoverBehavior::Slow(_) => HoverBehavior::None,
        };
        for band in &mut self.bands {
            band.logo.set_hover_behavior(self.config.hover);
        }
    }

    pub fn toggle_fade(&mut self) {
        self.config.fade.enabled = !self.config.fade.enabled;
        for band in &mut self.bands {
            band.logo.set_fade(self.config.fade);
        }
    }

    // ── pointer ─────────────────────────────────────────────────

    /// Pointer moved to a terminal cell.  Updates per-band hover (or the
    /// shared hover when bands are synced).
    pub fn pointer_at(&mut self, column: u16, row: u16) {
        let page = self.page_area();
        let scroll = self.scroll.position();
        self.hover = self
            .page
            .slot_at(page, scroll, column, row)
            .map(|band| Hover {
                band,
                item: self.item_under(band, column, row),
            });

        let hovered_band = self.hover.map(|h| h.band);
        let shared = self.config.sync_hover.then_some(hovered_band.is_some());
        for (i, band) in self.bands.iter_mut().enumerate() {
            band.logo.set_hovered(hovered_band == Some(i));
            band.logo.set_hover_override(shared);
        }
    }

    /// Item of band `index` under a terminal cell.
    fn item_under(&self, index: usize, column: u16, row: u16) -> Option<usize> {
        let slot = self.slot(index);
        let band = self.bands.get(index)?;
        let (x, y) = slot.screen_origin(self.page_area(), self.scroll.position());
        // Content starts inside the border.
        let main = match self.axis() {
            Axis::Horizontal => i32::from(column) - (x + 1),
            Axis::Vertical => i32::from(row) - (y + 1),
        };
        if main < 0 {
            return None;
        }
        // Cells show the sequence shifted by whole cells; sample the centre.
        let pos = f64::from(main) + 0.5 - band.logo.offset().fract();
        band.logo.item_at(pos.max(0.0))
    }

    /// Left click: remember a linked item and quit, or show its label.
    pub fn click(&mut self, column: u16, row: u16) {
        self.pointer_at(column, row);
        let Some(Hover {
            band,
            item: Some(item),
        }) = self.hover
        else {
            return;
        };
        let Some(item) = self.bands[band].logo.items().get(item) else {
            return;
        };
        match &item.href {
            Some(href) => {
                tracing::info!(%href, "item selected");
                self.selected_href = Some(href.clone());
                self.should_quit = true;
            }
            None => {
                self.status_message = Some(format!("{} (no link)", item.label()));
            }
        }
    }

    // ── text ────────────────────────────────────────────────────

    /// Title for band `index`: direction, speed and hover mode.
    pub fn band_title(&self, index: usize) -> String {
        let Some(band) = self.bands.get(index) else {
            return String::new();
        };
        let config = band.logo.config();
        let mut title = format!(
            " {} · {:.0}/s (now {:.0}) · hover {} ",
            config.direction.label(),
            config.speed,
            band.logo.velocity().abs(),
            config.hover.label()
        );
        if !band.logo.gate_open() {
            title.push_str(&format!("· loading {} logos ", band.logo.images_pending()));
        }
        title
    }

    /// Status bar text: a pending message, else the hovered item, else the
    /// key hint.
    pub fn status_text(&self) -> String {
        if let Some(msg) = &self.status_message {
            return msg.clone();
        }
        let hovered = self.hover.and_then(|h| {
            let item = self.bands.get(h.band)?.logo.items().get(h.item?)?;
            Some(item)
        });
        match hovered {
            Some(item) => {
                let mut text = item.title.clone().unwrap_or_else(|| item.label().to_string());
                if let Some(href) = &item.href {
                    text.push_str(&format!("  →  {href}  (click to open)"));
                }
                text
            }
            None => self.config.status_bar_hint(),
        }
    }
}
