//! Visibility observer: reports when the loop enters or leaves the viewport.

/// A one-dimensional range `[start, start + len)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub start: f64,
    pub len: f64,
}

impl Span {
    pub fn new(start: f64, len: f64) -> Self {
        Self {
            start,
            len: len.max(0.0),
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.len
    }

    /// Grow by `margin` on both sides.
    pub fn expanded(&self, margin: f64) -> Self {
        let margin = margin.max(0.0);
        Self::new(self.start - margin, self.len + 2.0 * margin)
    }

    pub fn intersects(&self, other: &Span) -> bool {
        self.len > 0.0 && other.len > 0.0 && self.start < other.end() && other.start < self.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityChange {
    Entered,
    Left,
}

/// Edge-triggered intersection test with a lookahead margin, so the loop is
/// already running by the time it scrolls into view.
#[derive(Debug, Clone)]
pub struct VisibilityObserver {
    margin: f64,
    visible: Option<bool>,
}

impl VisibilityObserver {
    pub fn new(margin: f64) -> Self {
        Self {
            margin,
            visible: None,
        }
    }

    /// Test `target` against `viewport`.  The first call always reports a
    /// change; later calls only report transitions.
    pub fn observe(&mut self, target: Span, viewport: Span) -> Option<VisibilityChange> {
        let now = target.expanded(self.margin).intersects(&viewport);
        self.force(now)
    }

    /// Set visibility directly (e.g. the host window lost focus).
    pub fn force(&mut self, visible: bool) -> Option<VisibilityChange> {
        if self.visible == Some(visible) {
            return None;
        }
        self.visible = Some(visible);
        Some(if visible {
            VisibilityChange::Entered
        } else {
            VisibilityChange::Left
        })
    }
}
