//! Band widget: draws every render copy of a logo loop, shifted by the
//! current offset, with half-block images, text labels and faded edges.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;
use image::RgbaImage;
use ratatui::buffer::{Buffer, Cell};
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Widget};
use unicode_width::UnicodeWidthChar;

use crate::core::item::{ImageState, ItemVisual};
use crate::core::logo_loop::LogoLoop;
use crate::core::loop_config::{Axis, FadeEdges};

use super::theme::Theme;

/// Pixels with less alpha than this are treated as transparent.
const ALPHA_CUTOFF: u8 = 128;
/// Upper bound on the fade width, in cells.
const MAX_FADE: u16 = 8;

// ───────────────────────────────────────── fitted images ─────

/// Decoded images scaled to their tile size, so frames never resample.
#[derive(Default)]
pub struct FittedImages {
    map: HashMap<(PathBuf, u16, u16), Arc<RgbaImage>>,
}

impl FittedImages {
    pub fn get(&self, path: &Path, cols: u16, rows: u16) -> Option<&RgbaImage> {
        self.map.get(&(path.to_path_buf(), cols, rows)).map(Arc::as_ref)
    }

    /// Scale every loaded image of `logos` to its current tile and drop
    /// tiles no longer in use.
    pub fn prepare<'a>(
        &mut self,
        logos: impl IntoIterator<Item = &'a LogoLoop>,
        sources: &HashMap<PathBuf, Arc<RgbaImage>>,
    ) {
        let mut next = HashMap::new();
        for logo in logos {
            for (index, item) in logo.items().iter().enumerate() {
                let ItemVisual::Image { src } = &item.visual else {
                    continue;
                };
                if !matches!(logo.image_state(index), ImageState::Loaded { .. }) {
                    continue;
                }
                let Some((cols, rows)) = tile_size(logo, index) else {
                    continue;
                };
                let key = (src.clone(), cols, rows);
                if next.contains_key(&key) {
                    continue;
                }
                let fitted = match self.map.remove(&key) {
                    Some(fitted) => fitted,
                    None => match sources.get(src) {
                        Some(source) => Arc::new(fit(source, cols, rows)),
                        None => continue,
                    },
                };
                next.insert(key, fitted);
            }
        }
        self.map = next;
    }
}

/// Tile of item `index` in cells: (columns, rows).
fn tile_size(logo: &LogoLoop, index: usize) -> Option<(u16, u16)> {
    let extent = *logo.layout().extents().get(index)?;
    let extent = u16::try_from(extent.round() as i64).ok()?;
    let cross = u16::try_from(logo.config().item_size.round() as i64).ok()?;
    let (cols, rows) = match logo.config().axis() {
        Axis::Horizontal => (extent, cross),
        Axis::Vertical => (cross, extent),
    };
    (cols > 0 && rows > 0).then_some((cols, rows))
}

/// Resample to one pixel per column and two per row.
fn fit(source: &RgbaImage, cols: u16, rows: u16) -> RgbaImage {
    image::imageops::resize(
        source,
        u32::from(cols),
        u32::from(rows) * 2,
        FilterType::Triangle,
    )
}

// ───────────────────────────────────────── widget ────────────

pub struct MarqueeWidget<'a> {
    logo: &'a LogoLoop,
    images: &'a FittedImages,
    hovered_item: Option<usize>,
    block: Option<Block<'a>>,
}

impl<'a> MarqueeWidget<'a> {
    pub fn new(logo: &'a LogoLoop, images: &'a FittedImages) -> Self {
        Self {
            logo,
            images,
            hovered_item: None,
            block: None,
        }
    }

    pub fn hovered_item(mut self, index: Option<usize>) -> Self {
        self.hovered_item = index;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for MarqueeWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match self.block.as_ref() {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let config = self.logo.config();
        let axis = config.axis();
        let canvas = Canvas { inner, axis };
        let layout = self.logo.layout();
        let sequence = layout.sequence_extent();
        let starts = layout.item_starts();
        let shift = self.logo.translation().map_or(0, |t| (-t).floor() as i64);

        if sequence > 0.0 {
            for copy in self.logo.copies() {
                let base = copy.index as f64 * sequence;
                for (index, (&start, &extent)) in starts.iter().zip(layout.extents()).enumerate() {
                    let start = (base + start).round() as i64 - shift;
                    let len = extent.round() as i64;
                    if len <= 0 || start >= canvas.main_len() || start + len <= 0 {
                        continue;
                    }
                    self.draw_item(&canvas, index, start, buf);
                }
            }
        }

        if config.fade.enabled {
            canvas.fade_edges(config.fade, buf);
        }
    }
}

impl MarqueeWidget<'_> {
    fn draw_item(&self, canvas: &Canvas, index: usize, start: i64, buf: &mut Buffer) {
        let Some(item) = self.logo.items().get(index) else {
            return;
        };
        if let ItemVisual::Image { src } = &item.visual {
            if let Some((cols, rows)) = tile_size(self.logo, index) {
                if let Some(img) = self.images.get(src, cols, rows) {
                    canvas.draw_halfblocks(img, start, buf);
                    return;
                }
            }
        }

        let style = if self.hovered_item == Some(index) {
            Theme::hovered_item_style()
        } else if item.href.is_some() {
            Theme::link_style()
        } else {
            Theme::item_style()
        };
        canvas.draw_label(item.label(), start, style, buf);
    }
}

/// The band's content box addressed by (main, cross) coordinates along
/// the loop's axis.
struct Canvas {
    inner: Rect,
    axis: Axis,
}

impl Canvas {
    fn main_len(&self) -> i64 {
        i64::from(match self.axis {
            Axis::Horizontal => self.inner.width,
            Axis::Vertical => self.inner.height,
        })
    }

    fn cross_len(&self) -> u16 {
        match self.axis {
            Axis::Horizontal => self.inner.height,
            Axis::Vertical => self.inner.width,
        }
    }

    fn cell<'b>(&self, buf: &'b mut Buffer, main: i64, cross: u16) -> Option<&'b mut Cell> {
        if main < 0 || main >= self.main_len() || cross >= self.cross_len() {
            return None;
        }
        let main = u16::try_from(main).ok()?;
        let pos = match self.axis {
            Axis::Horizontal => Position::new(self.inner.x + main, self.inner.y + cross),
            Axis::Vertical => Position::new(self.inner.x + cross, self.inner.y + main),
        };
        buf.cell_mut(pos)
    }

    /// Draw a fitted image whose leading edge sits at `start`.  Each cell
    /// shows two vertical pixels: the upper as foreground of '▀', the
    /// lower as background.
    fn draw_halfblocks(&self, img: &RgbaImage, start: i64, buf: &mut Buffer) {
        let cols = img.width();
        let rows = img.height() / 2;
        let cross_pad = |tile_cross: u32| {
            u16::try_from(u32::from(self.cross_len()).saturating_sub(tile_cross) / 2).unwrap_or(0)
        };

        for row in 0..rows {
            for col in 0..cols {
                let (main, cross) = match self.axis {
                    Axis::Horizontal => (start + i64::from(col), row),
                    Axis::Vertical => (start + i64::from(row), col),
                };
                let cross = match u16::try_from(cross) {
                    Ok(c) => c,
                    Err(_) => continue,
                };
                let cross = cross
                    + match self.axis {
                        Axis::Horizontal => cross_pad(rows),
                        Axis::Vertical => cross_pad(cols),
                    };
                let top = img.get_pixel(col, row * 2);
                let bottom = img.get_pixel(col, row * 2 + 1);
                let Some(cell) = self.cell(buf, main, cross) else {
                    continue;
                };
                let rgb = |p: &image::Rgba<u8>| Color::Rgb(p[0], p[1], p[2]);
                match (top[3] >= ALPHA_CUTOFF, bottom[3] >= ALPHA_CUTOFF) {
                    (true, true) => {
                        cell.set_char('▀').set_fg(rgb(top)).set_bg(rgb(bottom));
                    }
                    (true, false) => {
                        cell.set_char('▀').set_fg(rgb(top)).set_bg(Color::Reset);
                    }
                    (false, true) => {
                        cell.set_char('▄').set_fg(rgb(bottom)).set_bg(Color::Reset);
                    }
                    (false, false) => {}
                }
            }
        }
    }

    /// Draw a text label.  Horizontal labels run along the band on its
    /// middle row; vertical ones occupy one row, centred and truncated.
    fn draw_label(&self, label: &str, start: i64, style: Style, buf: &mut Buffer) {
        match self.axis {
            Axis::Horizontal => {
                let row = self.cross_len() / 2;
                let mut main = start;
                for (ch, width) in glyphs(label) {
                    if let Some(cell) = self.cell(buf, main, row) {
                        cell.set_char(ch).set_style(style);
                    }
                    // Cells covered by a wide glyph are blanked.
                    for hidden in 1..width {
                        if let Some(cell) = self.cell(buf, main + hidden as i64, row) {
                            cell.reset();
                        }
                    }
                    main += width as i64;
                }
            }
            Axis::Vertical => {
                let width = usize::from(self.cross_len());
                let mut used = 0;
                let fitting: Vec<(char, usize)> = glyphs(label)
                    .take_while(|&(_, w)| {
                        used += w;
                        used <= width
                    })
                    .collect();
                let used: usize = fitting.iter().map(|&(_, w)| w).sum();
                let mut cross = u16::try_from((width - used) / 2).unwrap_or(0);
                for (ch, w) in fitting {
                    if let Some(cell) = self.cell(buf, start, cross) {
                        cell.set_char(ch).set_style(style);
                    }
                    for hidden in 1..w {
                        let hidden = cross.saturating_add(u16::try_from(hidden).unwrap_or(u16::MAX));
                        if let Some(cell) = self.cell(buf, start, hidden) {
                            cell.reset();
                        }
                    }
                    cross = cross.saturating_add(u16::try_from(w).unwrap_or(u16::MAX));
                }
            }
        }
    }

    /// Blend both ends of the band toward the fade colour.
    fn fade_edges(&self, fade: FadeEdges, buf: &mut Buffer) {
        let main_len = self.main_len();
        let fade_len = fade_width(main_len);
        if fade_len == 0 {
            return;
        }
        for step in 0..fade_len {
            let t = fade_strength(step, fade_len);
            for main in [i64::from(step), main_len - 1 - i64::from(step)] {
                for cross in 0..self.cross_len() {
                    if let Some(cell) = self.cell(buf, main, cross) {
                        let fg = blend(cell.fg, fade.color, t);
                        let bg = blend(cell.bg, fade.color, t);
                        cell.set_fg(fg).set_bg(bg);
                    }
                }
            }
        }
    }
}

/// Fade width for a band `main_len` cells long: an eighth of it, capped.
fn fade_width(main_len: i64) -> u16 {
    u16::try_from(main_len / 8).unwrap_or(MAX_FADE).min(MAX_FADE)
}

/// Strength of the fade `step` cells in from the edge, 1 at the edge.
fn fade_strength(step: u16, fade_len: u16) -> f64 {
    1.0 - f64::from(step) / f64::from(fade_len)
}

/// Mix an RGB colour toward `target`; other colours pass through.
fn blend(color: Color, target: (u8, u8, u8), t: f64) -> Color {
    let Color::Rgb(r, g, b) = color else {
        return color;
    };
    let t = t.clamp(0.0, 1.0);
    let mix = |from: u8, to: u8| (f64::from(from) + (f64::from(to) - f64::from(from)) * t).round() as u8;
    Color::Rgb(mix(r, target.0), mix(g, target.1), mix(b, target.2))
}

/// Printable characters of `label` with their display widths.  Zero-width
/// characters are dropped.
fn glyphs(label: &str) -> impl Iterator<Item = (char, usize)> + '_ {
    label
        .chars()
        .filter_map(|ch| UnicodeWidthChar::width(ch).filter(|&w| w > 0).map(|w| (ch, w)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::LoopItem;
    use crate::core::loop_config::{Direction, LoopConfig, MotionTuning};
    use crate::core::measure::FixedSize;
    use crate::core::motion::FrameQueue;
    use std::time::Duration;

    fn text_loop(width: f64, fade: bool) -> (LogoLoop, FrameQueue) {
        let mut frames = FrameQueue::new();
        let config = LoopConfig {
            gap: 1.0,
            item_size: 1.0,
            fade: FadeEdges {
                enabled: fade,
                color: (0, 0, 0),
            },
            ..LoopConfig::default()
        };
        let items = vec![LoopItem::text("AB"), LoopItem::text("CD")];
        let mut logo = LogoLoop::new(
            config,
            items,
            MotionTuning::default(),
            FixedSize::new(width, 1.0),
        );
        logo.mount(true, &mut frames);
        (logo, frames)
    }

    fn row(buf: &Buffer, area: Rect) -> String {
        (area.x..area.right())
            .map(|x| buf[(x, area.y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn bordered_band_draws_inside_its_block() {
        let (logo, _) = text_loop(12.0, false);
        let images = FittedImages::default();
        let area = Rect::new(0, 0, 14, 3);
        let mut buf = Buffer::empty(area);
        MarqueeWidget::new(&logo, &images)
            .hovered_item(Some(1))
            .block(Block::default().borders(ratatui::widgets::Borders::ALL))
            .render(area, &mut buf);
        assert_eq!(buf[(0, 0)].symbol(), "┌");
        assert_eq!(row(&buf, Rect::new(1, 1, 12, 1)), "AB CD AB CD ");
        assert_eq!(buf[(13, 1)].symbol(), "│");
    }

    #[test]
    fn copies_tile_the_band() {
        let (logo, _) = text_loop(12.0, false);
        let images = FittedImages::default();
        let area = Rect::new(0, 0, 12, 1);
        let mut buf = Buffer::empty(area);
        MarqueeWidget::new(&logo, &images).render(area, &mut buf);
        assert_eq!(row(&buf, area), "AB CD AB CD ");
    }

    #[test]
    fn offset_shifts_content() {
        let (mut logo, mut frames) = text_loop(12.0, false);
        let mut now = Duration::ZERO;
        for _ in 0..20 {
            if let Some(handle) = frames.take_due() {
                logo.frame(handle, now, &mut frames);
            }
            now += Duration::from_millis(16);
        }
        let shift = logo.offset().floor() as usize;

        let images = FittedImages::default();
        let area = Rect::new(0, 0, 12, 1);
        let mut buf = Buffer::empty(area);
        MarqueeWidget::new(&logo, &images).render(area, &mut buf);
        let pattern = "AB CD ".repeat(4);
        assert_eq!(row(&buf, area), pattern[shift..shift + 12]);
    }

    #[test]
    fn vertical_labels_stack() {
        let mut frames = FrameQueue::new();
        let config = LoopConfig {
            direction: Direction::Up,
            gap: 1.0,
            item_size: 4.0,
            fade: FadeEdges::default(),
            ..LoopConfig::default()
        };
        let items = vec![LoopItem::text("Acme"), LoopItem::text("Bo")];
        let mut logo = LogoLoop::new(config, items, MotionTuning::default(), FixedSize::new(4.0, 6.0));
        logo.mount(true, &mut frames);

        let images = FittedImages::default();
        let area = Rect::new(0, 0, 4, 6);
        let mut buf = Buffer::empty(area);
        MarqueeWidget::new(&logo, &images).render(area, &mut buf);
        assert_eq!(row(&buf, Rect::new(0, 0, 4, 1)), "Acme");
        assert_eq!(row(&buf, Rect::new(0, 2, 4, 1)), " Bo ");
        assert_eq!(row(&buf, Rect::new(0, 4, 4, 1)), "Acme");
    }

    #[test]
    fn wide_labels_do_not_overlap() {
        let mut frames = FrameQueue::new();
        let config = LoopConfig {
            speed: 0.0,
            gap: 1.0,
            item_size: 1.0,
            fade: FadeEdges::default(),
            ..LoopConfig::default()
        };
        let items = vec![LoopItem::text("漢字"), LoopItem::text("A")];
        let mut logo = LogoLoop::new(config, items, MotionTuning::default(), FixedSize::new(12.0, 1.0));
        logo.mount(true, &mut frames);

        let images = FittedImages::default();
        let area = Rect::new(0, 0, 12, 1);
        let mut buf = Buffer::empty(area);
        MarqueeWidget::new(&logo, &images).render(area, &mut buf);
        assert_eq!(buf[(0, 0)].symbol(), "漢");
        assert_eq!(buf[(2, 0)].symbol(), "字");
        assert_eq!(buf[(5, 0)].symbol(), "A");
        assert_eq!(buf[(7, 0)].symbol(), "漢");
    }

    #[test]
    fn edges_fade_toward_colour() {
        let (logo, _) = text_loop(16.0, true);
        let images = FittedImages::default();
        let area = Rect::new(0, 0, 16, 1);
        let mut buf = Buffer::empty(area);
        MarqueeWidget::new(&logo, &images).render(area, &mut buf);
        // Two-cell fade: the edge cell is fully faded, the middle untouched.
        assert_eq!(buf[(0, 0)].fg, Color::Rgb(0, 0, 0));
        assert_eq!(buf[(15, 0)].fg, Color::Rgb(0, 0, 0));
        assert_eq!(buf[(3, 0)].fg, Color::Rgb(220, 220, 220));
    }

    #[test]
    fn blend_mixes_rgb_only() {
        assert_eq!(blend(Color::Rgb(200, 100, 0), (0, 0, 0), 0.5), Color::Rgb(100, 50, 0));
        assert_eq!(blend(Color::Reset, (0, 0, 0), 0.5), Color::Reset);
        assert_eq!(fade_width(200), MAX_FADE);
        assert_eq!(fade_width(7), 0);
    }

    #[test]
    fn images_draw_as_half_blocks() {
        let mut frames = FrameQueue::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        let config = LoopConfig {
            gap: 0.0,
            item_size: 2.0,
            fade: FadeEdges::default(),
            ..LoopConfig::default()
        };
        let items = vec![LoopItem::image(&path, "Red")];
        let mut logo = LogoLoop::new(config, items, MotionTuning::default(), FixedSize::new(8.0, 2.0));
        logo.mount(true, &mut frames);

        // 6×4 px reported as 6×2 cells ⇒ 6 columns at 2 rows.
        let source = RgbaImage::from_pixel(6, 4, image::Rgba([255, 0, 0, 255]));
        let generation = logo.items_generation();
        logo.image_settled(generation, 0, ImageState::Loaded { width: 6, height: 2 });
        let mut sources = HashMap::new();
        sources.insert(path.clone(), Arc::new(source));

        let mut images = FittedImages::default();
        images.prepare([&logo], &sources);
        assert!(images.get(&path, 6, 2).is_some());
        assert!(images.get(&path, 6, 3).is_none());

        let area = Rect::new(0, 0, 8, 2);
        let mut buf = Buffer::empty(area);
        MarqueeWidget::new(&logo, &images).render(area, &mut buf);
        assert_eq!(buf[(0, 0)].symbol(), "▀");
        assert_eq!(buf[(0, 1)].fg, Color::Rgb(255, 0, 0));
        assert_eq!(buf[(7, 0)].symbol(), "▀");
    }
}
