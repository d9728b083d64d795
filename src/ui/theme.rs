//! Colour palette and text styles used across the UI.

use ratatui::style::{Color, Modifier, Style};

/// Central theme: change colours here and they propagate everywhere.
pub struct Theme;

impl Theme {
    // ── bands ──────────────────────────────────────────────────
    /// Text items.  RGB so edge fades can blend it.
    pub fn item_style() -> Style {
        Style::default()
            .fg(Color::Rgb(220, 220, 220))
            .add_modifier(Modifier::BOLD)
    }

    /// Text item with a link.
    pub fn link_style() -> Style {
        Style::default()
            .fg(Color::Rgb(110, 190, 255))
            .add_modifier(Modifier::BOLD)
    }

    pub fn hovered_item_style() -> Style {
        Style::default()
            .fg(Color::Rgb(255, 220, 120))
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    }

    // ── chrome ─────────────────────────────────────────────────
    pub fn border_style() -> Style {
        Style::default().fg(Color::Gray)
    }

    pub fn hovered_border_style() -> Style {
        Style::default().fg(Color::Cyan)
    }

    pub fn title_style() -> Style {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    }

    pub fn status_bar_style() -> Style {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    }
}
