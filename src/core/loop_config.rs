//! Loop configuration: direction, hover behaviour, sizing and motion tuning.
//!
//! Everything here is plain data.  A `LoopConfig` is handed to a
//! [`LogoLoop`](super::logo_loop::LogoLoop) at construction; the animation
//! constants live in [`MotionTuning`] instead of module-level globals so
//! tests can inject their own.

use std::fmt;
use std::str::FromStr;

// ───────────────────────────────────────── direction ─────────

/// Which way the content travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Left,
    Right,
    Up,
    Down,
}

/// Movement axis derived from a [`Direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Direction {
    pub const ALL: &[Direction] = &[
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    pub fn axis(self) -> Axis {
        match self {
            Direction::Up | Direction::Down => Axis::Vertical,
            Direction::Left | Direction::Right => Axis::Horizontal,
        }
    }

    /// Same axis, opposite travel.
    pub fn reversed(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Next value in [`Direction::ALL`], wrapping.
    pub fn cycled(self) -> Self {
        let idx = Self::ALL.iter().position(|d| *d == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Lenient parse: anything unrecognised is treated as `Left`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(format!("'{other}' is not a direction (left|right|up|down)")),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ───────────────────────────────────────── hover ─────────────

/// What happens to the speed while the pointer is over the loop.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum HoverBehavior {
    /// Hovering has no effect.
    None,
    /// Ease down to a standstill.
    #[default]
    Pause,
    /// Ease to this speed (same sign rules as the base speed).
    Slow(f64),
}

impl HoverBehavior {
    /// Combine the two caller-facing knobs.  An explicit hover speed wins
    /// over the boolean pause flag.
    pub fn resolve(pause_on_hover: bool, hover_speed: Option<f64>) -> Self {
        match hover_speed {
            Some(speed) => HoverBehavior::Slow(speed),
            None if pause_on_hover => HoverBehavior::Pause,
            None => HoverBehavior::None,
        }
    }

    /// The speed to ease toward while hovered, if hovering changes anything.
    pub fn hover_speed(self) -> Option<f64> {
        match self {
            HoverBehavior::None => None,
            HoverBehavior::Pause => Some(0.0),
            HoverBehavior::Slow(speed) => Some(speed),
        }
    }

    pub fn label(self) -> String {
        match self {
            HoverBehavior::None => "none".into(),
            HoverBehavior::Pause => "pause".into(),
            HoverBehavior::Slow(speed) => format!("slow:{speed}"),
        }
    }

    /// Parse `none`, `pause` or `slow:<speed>`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "none" | "off" => Some(HoverBehavior::None),
            "pause" => Some(HoverBehavior::Pause),
            _ => {
                let speed = s.strip_prefix("slow:")?.trim().parse::<f64>().ok()?;
                speed.is_finite().then_some(HoverBehavior::Slow(speed))
            }
        }
    }
}

// ───────────────────────────────────────── sizing ────────────

/// Total width of the loop region along the horizontal axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopWidth {
    Px(f64),
    Percent(f64),
}

impl Default for LoopWidth {
    fn default() -> Self {
        LoopWidth::Percent(100.0)
    }
}

impl LoopWidth {
    /// Resolve against the parent's width.  Never exceeds the parent.
    pub fn resolve(self, parent: f64) -> f64 {
        let parent = parent.max(0.0);
        match self {
            LoopWidth::Px(px) => px.clamp(0.0, parent),
            LoopWidth::Percent(pct) => parent * pct.clamp(0.0, 100.0) / 100.0,
        }
    }

    /// Parse `"80%"` or `"640"`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(pct) = s.strip_suffix('%') {
            let v = pct.trim().parse::<f64>().ok()?;
            return (v.is_finite() && v >= 0.0).then_some(LoopWidth::Percent(v));
        }
        let v = s.trim_end_matches("px").trim().parse::<f64>().ok()?;
        (v.is_finite() && v >= 0.0).then_some(LoopWidth::Px(v))
    }
}

impl fmt::Display for LoopWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopWidth::Px(px) => write!(f, "{px}"),
            LoopWidth::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

/// Edge fade overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeEdges {
    pub enabled: bool,
    /// Colour the edges fade into.
    pub color: (u8, u8, u8),
}

impl Default for FadeEdges {
    fn default() -> Self {
        Self {
            enabled: false,
            color: (0, 0, 0),
        }
    }
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex_color(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

pub fn format_hex_color((r, g, b): (u8, u8, u8)) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

// ───────────────────────────────────────── config ────────────

/// Caller-supplied configuration for one loop instance.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    /// Signed speed; magnitude is px/s, a negative value inverts `direction`.
    pub speed: f64,
    pub direction: Direction,
    /// Space after every item (px).
    pub gap: f64,
    /// Item height for horizontal loops, item width for vertical ones (px).
    pub item_size: f64,
    pub width: LoopWidth,
    pub hover: HoverBehavior,
    pub fade: FadeEdges,
    /// When set, replaces the internally tracked hover state.  Used to keep
    /// several loops moving in lockstep.
    pub hover_override: Option<bool>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            speed: 120.0,
            direction: Direction::Left,
            gap: 32.0,
            item_size: 28.0,
            width: LoopWidth::default(),
            hover: HoverBehavior::Pause,
            fade: FadeEdges::default(),
            hover_override: None,
        }
    }
}

impl LoopConfig {
    pub fn axis(&self) -> Axis {
        self.direction.axis()
    }
}

/// Animation constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionTuning {
    /// Easing time constant in seconds.
    pub tau: f64,
    /// Upper bound on the per-frame elapsed time in seconds.
    pub max_elapsed: f64,
    /// Copies rendered beyond what the container strictly needs.
    pub headroom: usize,
    /// Lower bound on the number of rendered copies.
    pub min_copies: usize,
    /// Lookahead margin for the visibility observer (px).
    pub visibility_margin: f64,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            tau: 0.25,
            max_elapsed: 1.0 / 30.0,
            headroom: 2,
            min_copies: 2,
            visibility_margin: 200.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_direction_falls_back_to_left() {
        assert_eq!(Direction::parse_lenient("sideways"), Direction::Left);
        assert_eq!(Direction::parse_lenient(" UP "), Direction::Up);
    }

    #[test]
    fn axis_follows_direction() {
        assert_eq!(Direction::Left.axis(), Axis::Horizontal);
        assert_eq!(Direction::Right.axis(), Axis::Horizontal);
        assert_eq!(Direction::Up.axis(), Axis::Vertical);
        assert_eq!(Direction::Down.axis(), Axis::Vertical);
    }

    #[test]
    fn explicit_hover_speed_beats_pause_flag() {
        assert_eq!(HoverBehavior::resolve(true, Some(30.0)), HoverBehavior::Slow(30.0));
        assert_eq!(HoverBehavior::resolve(true, None), HoverBehavior::Pause);
        assert_eq!(HoverBehavior::resolve(false, None), HoverBehavior::None);
    }

    #[test]
    fn hover_parse() {
        assert_eq!(HoverBehavior::parse("pause"), Some(HoverBehavior::Pause));
        assert_eq!(HoverBehavior::parse("slow:15"), Some(HoverBehavior::Slow(15.0)));
        assert_eq!(HoverBehavior::parse("slow:abc"), None);
        assert_eq!(HoverBehavior::parse("none"), Some(HoverBehavior::None));
    }

    #[test]
    fn width_resolution() {
        assert_eq!(LoopWidth::Percent(50.0).resolve(200.0), 100.0);
        assert_eq!(LoopWidth::Px(80.0).resolve(200.0), 80.0);
        assert_eq!(LoopWidth::Px(500.0).resolve(200.0), 200.0);
        assert_eq!(LoopWidth::parse("75%"), Some(LoopWidth::Percent(75.0)));
        assert_eq!(LoopWidth::parse("640px"), Some(LoopWidth::Px(640.0)));
        assert_eq!(LoopWidth::parse("-3"), None);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#0a1B2c"), Some((10, 27, 44)));
        assert_eq!(parse_hex_color("fff"), None);
        assert_eq!(format_hex_color((10, 27, 44)), "#0a1b2c");
    }
}
