//! Layout helpers: split the terminal into the band page and status bar,
//! and place bands on the (possibly taller than the screen) page.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::core::loop_config::{Axis, LoopWidth};
use crate::core::measure::FixedSize;
use crate::core::visibility::Span;

/// Primary screen layout with the band page and a bottom status bar.
pub struct AppLayout {
    pub page_area: Rect,
    pub status_area: Rect,
}

impl AppLayout {
    /// Compute the layout from the full terminal area.
    pub fn from_area(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // band page
                Constraint::Length(1), // status bar
            ])
            .split(area);

        Self {
            page_area: chunks[0],
            status_area: chunks[1],
        }
    }
}

/// Blank rows above the first band and between bands.
const BAND_SPACING: u16 = 1;
/// Block border on each side of a band.
const BORDER: u16 = 1;

/// One band's frame in page coordinates.  `top` is measured from the top
/// of the page before scrolling; `x` from the left of the page area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandSlot {
    pub x: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
}

impl BandSlot {
    /// Size of the band's content box (inside the border).
    pub fn inner_size(&self) -> (u16, u16) {
        (
            self.width.saturating_sub(2 * BORDER),
            self.height.saturating_sub(2 * BORDER),
        )
    }

    /// Container measured by the loop.
    pub fn container(&self) -> FixedSize {
        let (w, h) = self.inner_size();
        FixedSize::new(f64::from(w), f64::from(h))
    }

    /// The band's parent: the page's content height at the band's width.
    /// Vertical loops take their height from it.
    pub fn parent(&self, page: Rect) -> FixedSize {
        let (w, _) = self.inner_size();
        FixedSize::new(f64::from(w), f64::from(page.height.saturating_sub(2 * BORDER)))
    }

    /// Vertical span relative to the top of the viewport.
    pub fn span(&self, scroll: u16) -> Span {
        Span::new(
            f64::from(self.top) - f64::from(scroll),
            f64::from(self.height),
        )
    }

    /// Full on-screen rect if the slot were not clipped, as signed
    /// coordinates (x, y, w, h).
    pub fn screen_origin(&self, page: Rect, scroll: u16) -> (i32, i32) {
        (
            i32::from(page.x) + i32::from(self.x),
            i32::from(page.y) + i32::from(self.top) - i32::from(scroll),
        )
    }

    /// The part of the slot that is on screen, if any.
    pub fn visible_rect(&self, page: Rect, scroll: u16) -> Option<Rect> {
        let (x, y) = self.screen_origin(page, scroll);
        let top = y.max(i32::from(page.y));
        let bottom = (y + i32::from(self.height)).min(i32::from(page.bottom()));
        if bottom <= top || self.width == 0 {
            return None;
        }
        Some(Rect::new(
            u16::try_from(x).ok()?,
            u16::try_from(top).ok()?,
            self.width.min(page.width.saturating_sub(self.x)),
            u16::try_from(bottom - top).ok()?,
        ))
    }
}

/// All band slots plus the total page height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub slots: Vec<BandSlot>,
    pub page_height: u16,
}

impl PageLayout {
    /// Horizontal bands stack down the page and may overflow it (the page
    /// scrolls).  Vertical bands stand side by side and fill the page height.
    pub fn compute(page: Rect, bands: usize, axis: Axis, item_size: u16, width: LoopWidth) -> Self {
        let bands = u16::try_from(bands).unwrap_or(u16::MAX);
        let thickness = item_size.saturating_add(2 * BORDER);
        match axis {
            Axis::Horizontal => {
                let resolved = width.resolve(f64::from(page.width)).round();
                let band_width = if resolved.is_finite() && resolved > 0.0 {
                    (resolved as u16).min(page.width)
                } else {
                    page.width
                };
                let x = (page.width - band_width) / 2;
                let slots = (0..bands)
                    .map(|i| BandSlot {
                        x,
                        top: BAND_SPACING + i * (thickness + BAND_SPACING),
                        width: band_width,
                        height: thickness,
                    })
                    .collect();
                Self {
                    slots,
                    page_height: BAND_SPACING.saturating_add(
                        bands.saturating_mul(thickness.saturating_add(BAND_SPACING)),
                    ),
                }
            }
            Axis::Vertical => {
                let slots = (0..bands)
                    .map(|i| BandSlot {
                        x: BAND_SPACING + i * (thickness + BAND_SPACING),
                        top: 0,
                        width: thickness,
                        height: page.height,
                    })
                    .filter(|slot| slot.x < page.width)
                    .collect();
                Self {
                    slots,
                    page_height: page.height,
                }
            }
        }
    }

    /// Largest scroll offset that still shows the end of the page.
    pub fn max_scroll(&self, page: Rect) -> u16 {
        self.page_height.saturating_sub(page.height)
    }

    /// Slot whose on-screen rect contains the given cell.
    pub fn slot_at(&self, page: Rect, scroll: u16, column: u16, row: u16) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.visible_rect(page, scroll).is_some_and(|r| {
                column >= r.x && column < r.right() && row >= r.y && row < r.bottom()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: Rect = Rect {
        x: 0,
        y: 0,
        width: 80,
        height: 20,
    };

    #[test]
    fn horizontal_bands_stack_and_overflow() {
        let layout = PageLayout::compute(PAGE, 4, Axis::Horizontal, 4, LoopWidth::default());
        assert_eq!(layout.slots.len(), 4);
        assert_eq!(layout.slots[0].top, 1);
        assert_eq!(layout.slots[1].top, 8);
        assert_eq!(layout.page_height, 29);
        assert_eq!(layout.max_scroll(PAGE), 9);
        assert_eq!(layout.slots[0].container(), FixedSize::new(78.0, 4.0));
    }

    #[test]
    fn percent_width_centres_band() {
        let layout = PageLayout::compute(PAGE, 1, Axis::Horizontal, 4, LoopWidth::Percent(50.0));
        assert_eq!(layout.slots[0].width, 40);
        assert_eq!(layout.slots[0].x, 20);
    }

    #[test]
    fn parent_spans_the_page_height() {
        let layout = PageLayout::compute(PAGE, 2, Axis::Horizontal, 4, LoopWidth::default());
        let slot = layout.slots[0];
        assert_eq!(slot.parent(PAGE).height, f64::from(PAGE.height - 2));
        assert_eq!(slot.parent(PAGE).width, slot.container().width);
        assert!(slot.parent(PAGE).height > slot.container().height);
    }

    #[test]
    fn vertical_bands_fill_height() {
        let layout = PageLayout::compute(PAGE, 2, Axis::Vertical, 6, LoopWidth::default());
        assert_eq!(layout.slots[1].x, 10);
        assert_eq!(layout.slots[1].height, 20);
        assert_eq!(layout.max_scroll(PAGE), 0);
    }

    #[test]
    fn scrolled_slot_is_clipped() {
        let layout = PageLayout::compute(PAGE, 4, Axis::Horizontal, 4, LoopWidth::default());
        let slot = layout.slots[0];
        assert_eq!(slot.visible_rect(PAGE, 3), Some(Rect::new(0, 0, 80, 4)));
        assert_eq!(slot.visible_rect(PAGE, 7), None);
        assert_eq!(slot.span(3), Span::new(-2.0, 6.0));
        assert_eq!(layout.slot_at(PAGE, 0, 10, 9), Some(1));
        assert_eq!(layout.slot_at(PAGE, 0, 10, 7), None);
    }
}
