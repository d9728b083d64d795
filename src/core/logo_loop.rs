//! The logo loop component. Ties items, measurement, load gating,
//! visibility and the animator together behind one owned value.
//!
//! The host drives it with plain method calls:
//!
//! 1. [`LogoLoop::mount`] once the container exists,
//! 2. [`LogoLoop::image_settled`] as images finish decoding,
//! 3. [`LogoLoop::relayout`] on resize notifications,
//! 4. [`LogoLoop::observe_visibility`] / [`LogoLoop::force_visible`],
//! 5. [`LogoLoop::frame`] for every frame the scheduler hands out,
//! 6. [`LogoLoop::unmount`] on teardown.

use std::time::Duration;

use super::item::{image_count, render_copies, ImageState, LoopItem, RenderCopy, SequenceLayout};
use super::load_gate::ImageLoadGate;
use super::loop_config::{Direction, FadeEdges, HoverBehavior, LoopConfig, MotionTuning};
use super::measure::{FixedSize, Measurable, Measurement, ResizeTrigger, ResizeWatcher};
use super::motion::{wrap_offset, FrameHandle, FrameInputs, FrameScheduler, LoopAnimator};
use super::velocity::{hover_velocity, target_velocity};
use super::visibility::{Span, VisibilityChange, VisibilityObserver};

pub struct LogoLoop {
    config: LoopConfig,
    tuning: MotionTuning,
    items: Vec<LoopItem>,
    /// Bumped on every item swap; tags image notices.
    items_generation: u64,
    image_states: Vec<ImageState>,
    layout: SequenceLayout,
    gate: ImageLoadGate,
    watcher: ResizeWatcher,
    container: FixedSize,
    parent: Option<FixedSize>,
    animator: LoopAnimator,
    visibility: VisibilityObserver,
    hovered: bool,
}

impl LogoLoop {
    pub fn new(
        config: LoopConfig,
        items: Vec<LoopItem>,
        tuning: MotionTuning,
        container: FixedSize,
    ) -> Self {
        let image_states = initial_states(&items);
        let layout = layout_for(&config, &items, &image_states);
        Self {
            watcher: ResizeWatcher::new(config.axis(), &container, tuning),
            animator: LoopAnimator::new(tuning),
            visibility: VisibilityObserver::new(tuning.visibility_margin),
            gate: ImageLoadGate::new(),
            config,
            tuning,
            items,
            items_generation: 0,
            image_states,
            layout,
            container,
            parent: None,
            hovered: false,
        }
    }

    // ── lifecycle ───────────────────────────────────────────────

    /// Arm the load gate and start (or stay stopped) depending on `visible`.
    pub fn mount(&mut self, visible: bool, scheduler: &mut dyn FrameScheduler) {
        let images = image_count(&self.items);
        tracing::debug!(
            items = self.items.len(),
            images,
            visible,
            resize_source = ?self.watcher.source(),
            "logo loop mounted"
        );
        if self.gate.arm(images) {
            self.remeasure();
        }
        self.visibility.force(visible);
        self.animator.mount(visible, scheduler);
    }

    pub fn unmount(&mut self, scheduler: &mut dyn FrameScheduler) {
        self.animator.unmount(scheduler);
        self.visibility.force(false);
    }

    /// Swap the item set.  The load gate re-arms when the image count
    /// changes; the layout is recomputed either way.
    pub fn replace_items(&mut self, items: Vec<LoopItem>) {
        self.items_generation = self.items_generation.wrapping_add(1);
        self.image_states = initial_states(&items);
        self.items = items;
        self.relayout_items();
        match self.gate.rearm_if_changed(image_count(&self.items)) {
            Some(false) => {}
            _ => {
                self.remeasure();
            }
        }
    }

    // ── images ──────────────────────────────────────────────────

    pub fn items_generation(&self) -> u64 {
        self.items_generation
    }

    /// An image item finished loading (`Loaded`) or failed (`Failed`).
    /// Returns `true` if the loop was re-measured as a result.
    pub fn image_settled(&mut self, generation: u64, index: usize, outcome: ImageState) -> bool {
        if generation != self.items_generation || outcome == ImageState::Pending {
            return false;
        }
        let Some(item) = self.items.get(index) else {
            return false;
        };
        if !item.is_image() {
            return false;
        }
        self.image_states[index] = outcome;
        self.relayout_items();

        let ordinal = self.items[..index].iter().filter(|i| i.is_image()).count();
        let gate_generation = self.gate.generation();
        if self.gate.settle(gate_generation, ordinal) {
            tracing::debug!(images = ordinal + 1, "image gate open");
        }
        self.remeasure().is_some()
    }

    pub fn image_state(&self, index: usize) -> ImageState {
        self.image_states
            .get(index)
            .copied()
            .unwrap_or(ImageState::Pending)
    }

    pub fn gate_open(&self) -> bool {
        self.gate.is_open()
    }

    /// Images the gate is still waiting on.
    pub fn images_pending(&self) -> usize {
        self.gate.pending()
    }

    // ── measurement ─────────────────────────────────────────────

    /// Handle a resize notification.  Returns the new measurement if the
    /// watcher accepted the trigger and the gate allowed measuring.
    pub fn relayout(
        &mut self,
        trigger: ResizeTrigger,
        container: FixedSize,
        parent: Option<FixedSize>,
    ) -> Option<Measurement> {
        if !self.watcher.accepts(trigger) {
            return None;
        }
        self.container = FixedSize {
            observed: self.container.observed,
            ..container
        };
        self.parent = parent;
        self.remeasure()
    }

    fn remeasure(&mut self) -> Option<Measurement> {
        if !self.gate.is_open() {
            return None;
        }
        let parent = self.parent;
        let m = self.watcher.measure(
            &mut self.container,
            &self.layout,
            parent.as_ref().map(|p| p as &dyn Measurable),
        );
        self.animator.set_sequence_extent(m.sequence_extent);
        Some(m)
    }

    fn relayout_items(&mut self) {
        self.layout = layout_for(&self.config, &self.items, &self.image_states);
    }

    /// Result of the last measurement pass, `None` until the gate opens.
    pub fn measurement(&self) -> Option<Measurement> {
        self.watcher.last()
    }

    /// Copies to render.  Never fewer than the configured minimum.
    pub fn copies(&self) -> Vec<RenderCopy> {
        let count = self
            .measurement()
            .map_or(self.tuning.min_copies, |m| m.copies);
        render_copies(count)
    }

    pub fn layout(&self) -> &SequenceLayout {
        &self.layout
    }

    // ── hover & visibility ──────────────────────────────────────

    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    pub fn set_hover_override(&mut self, hovered: Option<bool>) {
        self.config.hover_override = hovered;
    }

    /// Hover state used for speed selection.
    pub fn effective_hover(&self) -> bool {
        self.config.hover_override.unwrap_or(self.hovered)
    }

    /// Intersection test against the viewport, with the lookahead margin.
    pub fn observe_visibility(
        &mut self,
        target: Span,
        viewport: Span,
        scheduler: &mut dyn FrameScheduler,
    ) -> Option<VisibilityChange> {
        let change = self.visibility.observe(target, viewport);
        self.apply_visibility(change, scheduler);
        change
    }

    /// Override visibility (e.g. the host window lost focus).
    pub fn force_visible(
        &mut self,
        visible: bool,
        scheduler: &mut dyn FrameScheduler,
    ) -> Option<VisibilityChange> {
        let change = self.visibility.force(visible);
        self.apply_visibility(change, scheduler);
        change
    }

    fn apply_visibility(
        &mut self,
        change: Option<VisibilityChange>,
        scheduler: &mut dyn FrameScheduler,
    ) {
        match change {
            Some(VisibilityChange::Entered) => self.animator.set_visible(true, scheduler),
            Some(VisibilityChange::Left) => self.animator.set_visible(false, scheduler),
            None => {}
        }
    }

    // ── animation ───────────────────────────────────────────────

    /// Frame inputs sampled from the current configuration and hover state.
    pub fn frame_inputs(&self) -> FrameInputs {
        FrameInputs {
            base_velocity: target_velocity(self.config.speed, self.config.direction),
            hover_velocity: hover_velocity(self.config.hover, self.config.direction),
            hovered: self.effective_hover(),
        }
    }

    pub fn frame(
        &mut self,
        handle: FrameHandle,
        timestamp: Duration,
        scheduler: &mut dyn FrameScheduler,
    ) -> Option<f64> {
        let inputs = self.frame_inputs();
        self.animator.on_frame(handle, timestamp, &inputs, scheduler)
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.animator.is_running()
    }

    pub fn offset(&self) -> f64 {
        self.animator.motion().offset
    }

    pub fn velocity(&self) -> f64 {
        self.animator.motion().velocity
    }

    /// Translation along the axis, `None` until measured.
    pub fn translation(&self) -> Option<f64> {
        self.animator.translation()
    }

    /// Item under `pos`, measured from the container's leading edge.
    pub fn item_at(&self, pos: f64) -> Option<usize> {
        let extent = self.animator.sequence_extent();
        if extent <= 0.0 || pos < 0.0 {
            return None;
        }
        self.layout.item_at(wrap_offset(pos + self.offset(), extent))
    }

    // ── configuration ───────────────────────────────────────────

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn items(&self) -> &[LoopItem] {
        &self.items
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.config.speed = speed;
    }

    /// Change direction.  Switching axis re-lays out and re-measures; the
    /// velocity keeps easing from where it was.
    pub fn set_direction(&mut self, direction: Direction) {
        let axis_changed = direction.axis() != self.config.axis();
        self.config.direction = direction;
        if axis_changed {
            self.watcher.set_axis(direction.axis());
            self.relayout_items();
            self.remeasure();
        }
    }

    pub fn set_hover_behavior(&mut self, hover: HoverBehavior) {
        self.config.hover = hover;
    }

    pub fn set_fade(&mut self, fade: FadeEdges) {
        self.config.fade = fade;
    }
}

fn initial_states(items: &[LoopItem]) -> Vec<ImageState> {
    vec![ImageState::Pending; items.len()]
}

fn layout_for(config: &LoopConfig, items: &[LoopItem], states: &[ImageState]) -> SequenceLayout {
    SequenceLayout::compute(items, config.axis(), config.gap, config.item_size, |i| {
        states.get(i).copied().unwrap_or(ImageState::Pending)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::motion::FrameQueue;

    const FRAME: Duration = Duration::from_micros(16_667);

    fn logos(n: usize) -> Vec<LoopItem> {
        (0..n)
            .map(|i| LoopItem::image(format!("logo{i}.png"), format!("Logo {i}")))
            .collect()
    }

    fn five_logo_loop() -> LogoLoop {
        let config = LoopConfig {
            gap: 40.0,
            item_size: 100.0,
            ..LoopConfig::default()
        };
        LogoLoop::new(
            config,
            logos(5),
            MotionTuning::default(),
            FixedSize::new(1600.0, 100.0),
        )
    }

    fn pump(logo: &mut LogoLoop, frames: &mut FrameQueue, now: &mut Duration, n: usize) {
        for _ in 0..n {
            if let Some(handle) = frames.take_due() {
                logo.frame(handle, *now, frames);
            }
            *now += FRAME;
        }
    }

    #[test]
    fn end_to_end_five_logos_in_1600px() {
        let mut frames = FrameQueue::new();
        let mut logo = five_logo_loop();
        logo.mount(true, &mut frames);
        assert!(logo.measurement().is_none());

        let generation = logo.items_generation();
        for i in 0..5 {
            // 400×200 source scaled to 100px tall ⇒ 200px wide.
            let dims = ImageState::Loaded {
                width: 400,
                height: 200,
            };
            logo.image_settled(generation, i, dims);
        }

        let m = logo.measurement().expect("measured once all images settled");
        assert_eq!(m.sequence_extent, 1200.0);
        assert_eq!(m.copies, 4);
        assert_eq!(logo.copies().len(), 4);
    }

    #[test]
    fn measurement_waits_for_every_image() {
        let mut frames = FrameQueue::new();
        let mut logo = five_logo_loop();
        logo.mount(true, &mut frames);
        let generation = logo.items_generation();

        for i in 0..4 {
            assert!(!logo.image_settled(generation, i, ImageState::Failed));
            assert!(logo.measurement().is_none());
        }
        assert!(logo.image_settled(generation, 4, ImageState::Failed));
        // Failed images collapse to their alt text ("Logo n" = 6 cols).
        assert_eq!(logo.measurement().unwrap().sequence_extent, 5.0 * 46.0);
    }

    #[test]
    fn text_only_loop_measures_on_mount() {
        let mut frames = FrameQueue::new();
        let items = vec![LoopItem::text("Acme"), LoopItem::text("Bolt")];
        let mut logo = LogoLoop::new(
            LoopConfig {
                gap: 2.0,
                ..LoopConfig::default()
            },
            items,
            MotionTuning::default(),
            FixedSize::new(30.0, 3.0),
        );
        logo.mount(true, &mut frames);
        let m = logo.measurement().unwrap();
        assert_eq!(m.sequence_extent, 12.0);
        assert_eq!(m.copies, 5);
    }

    #[test]
    fn stale_image_notices_are_dropped() {
        let mut frames = FrameQueue::new();
        let mut logo = five_logo_loop();
        logo.mount(true, &mut frames);
        let old = logo.items_generation();
        logo.replace_items(logos(5));
        assert!(!logo.image_settled(old, 0, ImageState::Failed));
        assert_eq!(logo.image_state(0), ImageState::Pending);
    }

    #[test]
    fn shared_hover_override_wins() {
        let mut logo = five_logo_loop();
        logo.set_hovered(false);
        logo.set_hover_override(Some(true));
        assert!(logo.effective_hover());
        assert_eq!(logo.frame_inputs().target(), 0.0);
        logo.set_hover_override(None);
        assert!(!logo.effective_hover());
        assert_eq!(logo.frame_inputs().target(), 120.0);
    }

    #[test]
    fn scrolled_out_loop_stops_until_back() {
        let mut frames = FrameQueue::new();
        let items = vec![LoopItem::text("Acme Mechanical")];
        let mut logo = LogoLoop::new(
            LoopConfig::default(),
            items,
            MotionTuning {
                visibility_margin: 2.0,
                ..MotionTuning::default()
            },
            FixedSize::new(40.0, 3.0),
        );
        logo.mount(true, &mut frames);
        let mut now = Duration::ZERO;
        pump(&mut logo, &mut frames, &mut now, 60);

        let viewport = Span::new(0.0, 20.0);
        assert_eq!(
            logo.observe_visibility(Span::new(30.0, 3.0), viewport, &mut frames),
            Some(VisibilityChange::Left)
        );
        let frozen = logo.offset();
        pump(&mut logo, &mut frames, &mut now, 60);
        assert_eq!(logo.offset(), frozen);

        // Within the 2-row margin counts as visible.
        assert_eq!(
            logo.observe_visibility(Span::new(21.0, 3.0), viewport, &mut frames),
            Some(VisibilityChange::Entered)
        );
        pump(&mut logo, &mut frames, &mut now, 3);
        assert_ne!(logo.offset(), frozen);
    }

    #[test]
    fn hit_test_follows_offset() {
        let mut frames = FrameQueue::new();
        let items = vec![LoopItem::text("aaaa"), LoopItem::text("bbbb")];
        let mut logo = LogoLoop::new(
            LoopConfig {
                gap: 1.0,
                ..LoopConfig::default()
            },
            items,
            MotionTuning::default(),
            FixedSize::new(20.0, 1.0),
        );
        logo.mount(true, &mut frames);
        assert_eq!(logo.item_at(0.0), Some(0));
        assert_eq!(logo.item_at(4.0), None);
        assert_eq!(logo.item_at(5.0), Some(1));
        // Second copy starts at 10.
        assert_eq!(logo.item_at(11.0), Some(0));
    }

    #[test]
    fn axis_switch_remeasures_without_velocity_reset() {
        let mut frames = FrameQueue::new();
        let items = vec![LoopItem::text("Acme"), LoopItem::text("Bolt")];
        let mut logo = LogoLoop::new(
            LoopConfig {
                gap: 1.0,
                ..LoopConfig::default()
            },
            items,
            MotionTuning::default(),
            FixedSize::new(40.0, 12.0),
        );
        logo.mount(true, &mut frames);
        let mut now = Duration::ZERO;
        pump(&mut logo, &mut frames, &mut now, 30);
        let v = logo.velocity();

        logo.set_direction(Direction::Up);
        let m = logo.measurement().unwrap();
        // Two one-row text items plus trailing gaps.
        assert_eq!(m.sequence_extent, 4.0);
        assert_eq!(logo.velocity(), v);
        assert!(logo.offset() < 4.0);
    }

    #[test]
    fn window_resize_changes_copy_count() {
        let mut frames = FrameQueue::new();
        let items = vec![LoopItem::text("0123456789")];
        let mut logo = LogoLoop::new(
            LoopConfig {
                gap: 0.0,
                ..LoopConfig::default()
            },
            items,
            MotionTuning::default(),
            FixedSize::new(10.0, 1.0),
        );
        logo.mount(true, &mut frames);
        assert_eq!(logo.copies().len(), 3);

        assert!(logo
            .relayout(ResizeTrigger::Element, FixedSize::new(95.0, 1.0), None)
            .is_none());
        let m = logo
            .relayout(ResizeTrigger::Window, FixedSize::new(95.0, 1.0), None)
            .unwrap();
        assert_eq!(m.copies, 12);
    }

    #[test]
    fn unmount_cancels_pending_frame() {
        let mut frames = FrameQueue::new();
        let mut logo = five_logo_loop();
        logo.mount(true, &mut frames);
        assert!(frames.is_pending());
        logo.unmount(&mut frames);
        assert!(!frames.is_pending());
        assert!(!logo.is_running());
    }
}
