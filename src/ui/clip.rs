//! Render a widget that is partly scrolled out of its viewport.
//!
//! Widgets draw themselves into the area they are given, so a band whose
//! top border is above the page would be squashed.  Instead it is drawn at
//! full size off screen and only the visible cells are copied over.

use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect};
use ratatui::widgets::Widget;

/// Draw `widget` as if its top-left corner were at `origin` (which may be
/// off screen) with the given size, keeping only cells inside `clip`.
pub fn render_clipped<W: Widget>(
    widget: W,
    origin: (i32, i32),
    size: (u16, u16),
    clip: Rect,
    buf: &mut Buffer,
) {
    let (width, height) = size;
    if width == 0 || height == 0 {
        return;
    }
    let local = Rect::new(0, 0, width, height);
    let mut scratch = Buffer::empty(local);
    widget.render(local, &mut scratch);

    for y in 0..height {
        let screen_y = origin.1 + i32::from(y);
        let Some(screen_y) = within(screen_y, clip.y, clip.bottom()) else {
            continue;
        };
        for x in 0..width {
            let screen_x = origin.0 + i32::from(x);
            let Some(screen_x) = within(screen_x, clip.x, clip.right()) else {
                continue;
            };
            if let (Some(src), Some(dst)) = (
                scratch.cell(Position::new(x, y)),
                buf.cell_mut(Position::new(screen_x, screen_y)),
            ) {
                *dst = src.clone();
            }
        }
    }
}

fn within(v: i32, start: u16, end: u16) -> Option<u16> {
    let v = u16::try_from(v).ok()?;
    (v >= start && v < end).then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::widgets::{Block, Borders};

    #[test]
    fn clips_rows_above_the_viewport() {
        let clip = Rect::new(0, 0, 6, 4);
        let mut buf = Buffer::empty(clip);
        let block = Block::default().borders(Borders::ALL);
        render_clipped(block, (0, -1), (6, 3), clip, &mut buf);

        // Top border scrolled away; side borders and bottom remain.
        assert_eq!(buf[(0, 0)].symbol(), "│");
        assert_eq!(buf[(0, 1)].symbol(), "└");
        assert_eq!(buf[(0, 2)].symbol(), " ");
    }

    #[test]
    fn fully_outside_draws_nothing() {
        let clip = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(clip);
        let block = Block::default().borders(Borders::ALL);
        render_clipped(block, (0, 5), (4, 2), clip, &mut buf);
        assert_eq!(buf, Buffer::empty(clip));
    }
}
