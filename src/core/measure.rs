//! Size measurement: sequence extent, copy count and the vertical height sync.
//!
//! The watcher never touches a widget directly.  Anything that can report
//! a size implements [`Measurable`]; the host feeds measurements in when
//! it learns that something was resized.

use super::loop_config::{Axis, MotionTuning};

/// Something with a size.
pub trait Measurable {
    fn width(&self) -> f64;
    fn height(&self) -> f64;

    /// Whether this element reports its own resizes.  When `false` the
    /// watcher falls back to window-level resize notifications.
    fn observes_resize(&self) -> bool {
        false
    }

    /// Size along `axis`.
    fn extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.width(),
            Axis::Vertical => self.height(),
        }
    }
}

/// A fixed size, used for terminal regions and in tests.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FixedSize {
    pub width: f64,
    pub height: f64,
    pub observed: bool,
}

impl FixedSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            observed: false,
        }
    }
}

impl Measurable for FixedSize {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn observes_resize(&self) -> bool {
        self.observed
    }
}

/// Upper bound on rendered copies.  A sequence too short to cover the
/// container within this many copies leaves the far end uncovered.
pub const MAX_COPIES: usize = 4096;

/// Copies needed so the container is always covered whatever the offset.
///
/// Returns `tuning.min_copies` while the sequence is unmeasured.
pub fn copies_needed(container_extent: f64, sequence_extent: f64, tuning: &MotionTuning) -> usize {
    if sequence_extent.is_nan() || sequence_extent <= 0.0 || !container_extent.is_finite() {
        return tuning.min_copies;
    }
    let ceiling = MAX_COPIES.max(tuning.min_copies);
    let cover = (container_extent.max(0.0) / sequence_extent)
        .ceil()
        .min(ceiling as f64) as usize;
    cover
        .saturating_add(tuning.headroom)
        .clamp(tuning.min_copies, ceiling)
}

/// Vertical loops scroll inside an explicit height taken from the parent.
/// One-shot: the container adopts the parent's height on this pass only.
pub fn adopt_parent_extent(container: &mut FixedSize, parent: &dyn Measurable) {
    container.height = parent.height().max(0.0);
}

/// Where resize notifications come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeSource {
    /// The container and reference copy report their own size changes.
    Observer,
    /// Only window-level resizes are available.
    WindowFallback,
}

/// A resize notification delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeTrigger {
    /// The container or the reference copy changed size.
    Element,
    /// The whole window changed size.
    Window,
}

/// Result of one measurement pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub sequence_extent: f64,
    pub container_extent: f64,
    pub copies: usize,
    /// Height the container was synced to (vertical loops only).
    pub synced_height: Option<f64>,
}

/// Derives the sequence extent and copy count on every size change.
#[derive(Debug, Clone)]
pub struct ResizeWatcher {
    axis: Axis,
    source: ResizeSource,
    tuning: MotionTuning,
    last: Option<Measurement>,
}

impl ResizeWatcher {
    /// Pick the notification source from what `container` supports.
    pub fn new(axis: Axis, container: &dyn Measurable, tuning: MotionTuning) -> Self {
        let source = if container.observes_resize() {
            ResizeSource::Observer
        } else {
            ResizeSource::WindowFallback
        };
        Self {
            axis,
            source,
            tuning,
            last: None,
        }
    }

    pub fn source(&self) -> ResizeSource {
        self.source
    }

    pub fn set_axis(&mut self, axis: Axis) {
        self.axis = axis;
    }

    pub fn last(&self) -> Option<Measurement> {
        self.last
    }

    /// Whether `trigger` should cause a measurement pass.
    pub fn accepts(&self, trigger: ResizeTrigger) -> bool {
        match self.source {
            ResizeSource::Observer => trigger == ResizeTrigger::Element,
            ResizeSource::WindowFallback => trigger == ResizeTrigger::Window,
        }
    }

    /// Measure the reference copy against the container.
    ///
    /// On the vertical axis the container first adopts `parent`'s height.
    pub fn measure(
        &mut self,
        container: &mut FixedSize,
        reference: &dyn Measurable,
        parent: Option<&dyn Measurable>,
    ) -> Measurement {
        let mut synced_height = None;
        if self.axis == Axis::Vertical {
            if let Some(parent) = parent {
                adopt_parent_extent(container, parent);
                synced_height = Some(container.height);
            }
        }

        let container_extent = container.extent(self.axis).max(0.0);
        let sequence_extent = reference.extent(self.axis).max(0.0);
        let measurement = Measurement {
            sequence_extent,
            container_extent,
            copies: copies_needed(container_extent, sequence_extent, &self.tuning),
            synced_height,
        };

        if self.last.map(|m| m.sequence_extent) != Some(sequence_extent) {
            tracing::debug!(
                sequence_extent,
                container_extent,
                copies = measurement.copies,
                "sequence re-measured"
            );
        }
        self.last = Some(measurement);
        measurement
    }
}
