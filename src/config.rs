//! User configuration: loop settings, keybindings and persistence.
//!
//! Settings are stored as a simple key-value text file at
//! `$XDG_CONFIG_HOME/logo-loop/config.toml` (default `~/.config/logo-loop/config.toml`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::loop_config::{
    format_hex_color, parse_hex_color, Direction, FadeEdges, HoverBehavior, LoopConfig, LoopWidth,
};

// ───────────────────────────────────────── actions ───────────

/// All configurable user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    SpeedUp,
    SpeedDown,
    Reverse,
    CycleDirection,
    CycleHover,
    ToggleFade,
    ScrollPageUp,
    ScrollPageDown,
    Reload,
    Quit,
}

impl Action {
    /// Ordered list of all actions (used when saving).
    pub const ALL: &[Action] = &[
        Action::SpeedUp,
        Action::SpeedDown,
        Action::Reverse,
        Action::CycleDirection,
        Action::CycleHover,
        Action::ToggleFade,
        Action::ScrollPageUp,
        Action::ScrollPageDown,
        Action::Reload,
        Action::Quit,
    ];

    fn config_key(self) -> &'static str {
        match self {
            Action::SpeedUp => "speed_up",
            Action::SpeedDown => "speed_down",
            Action::Reverse => "reverse",
            Action::CycleDirection => "cycle_direction",
            Action::CycleHover => "cycle_hover",
            Action::ToggleFade => "toggle_fade",
            Action::ScrollPageUp => "scroll_up",
            Action::ScrollPageDown => "scroll_down",
            Action::Reload => "reload",
            Action::Quit => "quit",
        }
    }

    fn from_config_key(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.config_key() == s)
    }
}

// ───────────────────────────────────────── key bind ──────────

/// A single key binding: key code + modifier combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyBind {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

/// Only these modifiers take part in matching.
fn modifier_mask() -> KeyModifiers {
    KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SHIFT
}

impl KeyBind {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub fn matches(&self, event: KeyEvent) -> bool {
        let mask = modifier_mask();
        self.code == event.code && (self.modifiers & mask) == (event.modifiers & mask)
    }

    /// Short label for the status bar (e.g. `"+"`, `"Ctrl+c"`, `"PgUp"`).
    pub fn display(&self) -> String {
        self.render(true)
    }

    fn to_config_string(&self) -> String {
        self.render(false)
    }

    fn render(&self, short: bool) -> String {
        let mut s = String::new();
        for (flag, name) in [
            (KeyModifiers::CONTROL, "Ctrl+"),
            (KeyModifiers::ALT, "Alt+"),
            (KeyModifiers::SHIFT, "Shift+"),
        ] {
            if self.modifiers.contains(flag) {
                s.push_str(name);
            }
        }
        let key = match self.code {
            KeyCode::Char(' ') => "Space".to_string(),
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Up => "Up".into(),
            KeyCode::Down => "Down".into(),
            KeyCode::Left => "Left".into(),
            KeyCode::Right => "Right".into(),
            KeyCode::Enter => "Enter".into(),
            KeyCode::Esc => "Esc".into(),
            KeyCode::Tab => "Tab".into(),
            KeyCode::PageUp if short => "PgUp".into(),
            KeyCode::PageDown if short => "PgDn".into(),
            KeyCode::PageUp => "PageUp".into(),
            KeyCode::PageDown => "PageDown".into(),
            KeyCode::Home => "Home".into(),
            KeyCode::End => "End".into(),
            KeyCode::F(n) => format!("F{n}"),
            other => format!("{other:?}"),
        };
        s.push_str(&key);
        s
    }

    /// Parse a key string like `"Ctrl+c"`, `"Shift+Right"`, `"+"`, `"PageUp"`.
    fn parse(s: &str) -> Option<Self> {
        let mut modifiers = KeyModifiers::NONE;
        let mut rest = s.trim();
        // Peel modifiers off the front so a bare "+" still parses as a key.
        loop {
            let lower = rest.to_lowercase();
            let (flag, len) = if lower.starts_with("ctrl+") {
                (KeyModifiers::CONTROL, 5)
            } else if lower.starts_with("alt+") {
                (KeyModifiers::ALT, 4)
            } else if lower.starts_with("shift+") {
                (KeyModifiers::SHIFT, 6)
            } else {
                break;
            };
            modifiers |= flag;
            rest = &rest[len..];
        }

        let code = match rest.to_lowercase().as_str() {
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "enter" | "return" => KeyCode::Enter,
            "esc" | "escape" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "pageup" | "pgup" => KeyCode::PageUp,
            "pagedown" | "pgdn" => KeyCode::PageDown,
            "space" => KeyCode::Char(' '),
            k if k.starts_with('f') && k.len() > 1 => KeyCode::F(k[1..].parse().ok()?),
            _ if rest.chars().count() == 1 => KeyCode::Char(rest.chars().next()?),
            _ => return None,
        };

        Some(KeyBind { code, modifiers })
    }
}

// ───────────────────────────────────────── config ────────────

/// Application configuration: loop defaults, host settings, keybindings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bindings: HashMap<Action, Vec<KeyBind>>,
    /// Speed in columns (or rows) per second; negative reverses.
    pub speed: f64,
    pub direction: Direction,
    /// Cells after every item.
    pub gap: u16,
    /// Item height in rows (horizontal) or width in columns (vertical).
    pub item_size: u16,
    pub width: LoopWidth,
    pub hover: HoverBehavior,
    pub fade: FadeEdges,
    /// Hovering one band slows every band.
    pub sync_hover: bool,
    /// Number of stacked bands; directions alternate.
    pub bands: usize,
    /// Frames per second of the animation clock.
    pub fps: u16,
    /// Rows of lookahead before a band counts as visible.
    pub lookahead_rows: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bindings: Self::default_bindings(),
            speed: 24.0,
            direction: Direction::Left,
            gap: 4,
            item_size: 4,
            width: LoopWidth::default(),
            hover: HoverBehavior::Pause,
            fade: FadeEdges {
                enabled: true,
                color: (0, 0, 0),
            },
            sync_hover: false,
            bands: 1,
            fps: 60,
            lookahead_rows: 2,
        }
    }
}

impl AppConfig {
    pub fn default_bindings() -> HashMap<Action, Vec<KeyBind>> {
        use Action::*;
        use KeyCode::*;
        let n = KeyModifiers::NONE;
        let mut m = HashMap::new();

        m.insert(SpeedUp, vec![KeyBind::new(Char('+'), n), KeyBind::new(Up, n)]);
        m.insert(SpeedDown, vec![KeyBind::new(Char('-'), n), KeyBind::new(Down, n)]);
        m.insert(Reverse, vec![KeyBind::new(Char('r'), n)]);
        m.insert(CycleDirection, vec![KeyBind::new(Char('d'), n)]);
        m.insert(CycleHover, vec![KeyBind::new(Char('h'), n)]);
        m.insert(ToggleFade, vec![KeyBind::new(Char('f'), n)]);
        m.insert(ScrollPageUp, vec![KeyBind::new(PageUp, n), KeyBind::new(Char('k'), n)]);
        m.insert(ScrollPageDown, vec![KeyBind::new(PageDown, n), KeyBind::new(Char('j'), n)]);
        m.insert(Reload, vec![KeyBind::new(F(5), n), KeyBind::new(Char('l'), n)]);
        m.insert(Quit, vec![KeyBind::new(Char('q'), n), KeyBind::new(Esc, n)]);

        m
    }

    /// Find the action bound to a key event.  The binding with the most
    /// modifiers wins when several match.
    pub fn match_key(&self, event: KeyEvent) -> Option<Action> {
        self.bindings
            .iter()
            .flat_map(|(&action, binds)| binds.iter().map(move |b| (action, b)))
            .filter(|(_, bind)| bind.matches(event))
            .max_by_key(|(_, bind)| bind.modifiers.bits().count_ones())
            .map(|(action, _)| action)
    }

    fn short_binding(&self, action: Action) -> String {
        match self.bindings.get(&action) {
            Some(binds) if !binds.is_empty() => binds[0].display(),
            _ => "?".into(),
        }
    }

    pub fn status_bar_hint(&self) -> String {
        format!(
            "{}/{}: speed | {}: reverse | {}: direction | {}: hover | {}: fade | {}: reload | {}: quit",
            self.short_binding(Action::SpeedUp),
            self.short_binding(Action::SpeedDown),
            self.short_binding(Action::Reverse),
            self.short_binding(Action::CycleDirection),
            self.short_binding(Action::CycleHover),
            self.short_binding(Action::ToggleFade),
            self.short_binding(Action::Reload),
            self.short_binding(Action::Quit),
        )
    }

    /// Loop configuration for band `index`.  Odd bands run the other way.
    pub fn loop_config(&self, index: usize) -> LoopConfig {
        let direction = if index % 2 == 1 {
            self.direction.reversed()
        } else {
            self.direction
        };
        LoopConfig {
            speed: self.speed,
            direction,
            gap: f64::from(self.gap),
            item_size: f64::from(self.item_size),
            width: self.width,
            hover: self.hover,
            fade: self.fade,
            hover_override: None,
        }
    }

    // ── persistence ─────────────────────────────────────────────

    /// Load config from disk, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    /// Load config from `path`; a missing or unreadable file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse_config(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
                Self::default()
            }
        }
    }

    /// Write the config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        std::fs::write(path, self.serialise())
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }

    fn parse_config(s: &str) -> Self {
        let mut config = Self::default();
        let mut pause_on_hover: Option<bool> = None;
        let mut hover_speed: Option<f64> = None;

        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches('"');

            // Split hover knobs, resolved together once every line is read.
            match key {
                "pause_on_hover" => {
                    match value.parse::<bool>() {
                        Ok(v) => pause_on_hover = Some(v),
                        Err(_) => tracing::warn!(key, value, "ignoring malformed config value"),
                    }
                    continue;
                }
                "hover_speed" => {
                    match value.parse::<f64>() {
                        Ok(v) if v.is_finite() => hover_speed = Some(v.clamp(-1000.0, 1000.0)),
                        _ => tracing::warn!(key, value, "ignoring malformed config value"),
                    }
                    continue;
                }
                _ => {}
            }

            if config.apply_setting(key, value) {
                continue;
            }

            let Some(action) = Action::from_config_key(key) else {
                tracing::debug!(key, "unknown config key");
                continue;
            };
            let parsed: Vec<KeyBind> = value.split(',').filter_map(KeyBind::parse).collect();
            if !parsed.is_empty() {
                config.bindings.insert(action, parsed);
            }
        }

        if pause_on_hover.is_some() || hover_speed.is_some() {
            config.hover = HoverBehavior::resolve(pause_on_hover.unwrap_or(true), hover_speed);
        }
        config
    }

    /// Apply one loop/host setting.  Returns `false` if `key` is not a
    /// setting (it may still be a key binding).
    fn apply_setting(&mut self, key: &str, value: &str) -> bool {
        let applied = match key {
            "speed" => match value.parse::<f64>() {
                Ok(v) if v.is_finite() => {
                    self.speed = v.clamp(-1000.0, 1000.0);
                    true
                }
                _ => false,
            },
            // Unknown directions fall back to left rather than keeping the default.
            "direction" => {
                self.direction = Direction::parse_lenient(value);
                value.parse::<Direction>().is_ok()
            }
            "gap" => value.parse::<u16>().map(|v| self.gap = v.min(200)).is_ok(),
            "item_size" => value
                .parse::<u16>()
                .map(|v| self.item_size = v.clamp(1, 64))
                .is_ok(),
            "width" => LoopWidth::parse(value).map(|w| self.width = w).is_some(),
            "hover" => HoverBehavior::parse(value).map(|h| self.hover = h).is_some(),
            "fade_edges" => {
                self.fade.enabled = value == "true";
                true
            }
            "fade_color" => parse_hex_color(value).map(|c| self.fade.color = c).is_some(),
            "sync_hover" => {
                self.sync_hover = value == "true";
                true
            }
            "bands" => value.parse::<usize>().map(|v| self.bands = v.clamp(1, 8)).is_ok(),
            "fps" => value.parse::<u16>().map(|v| self.fps = v.clamp(10, 240)).is_ok(),
            "lookahead_rows" => value
                .parse::<u16>()
                .map(|v| self.lookahead_rows = v)
                .is_ok(),
            _ => return false,
        };
        if !applied {
            tracing::warn!(key, value, "ignoring malformed config value");
        }
        true
    }

    fn serialise(&self) -> String {
        let mut lines = vec![
            "# logo-loop configuration".to_string(),
            String::new(),
            "# Loop".to_string(),
            format!("speed = {}", self.speed),
            format!("direction = {}", self.direction),
            format!("gap = {}", self.gap),
            format!("item_size = {}", self.item_size),
            format!("width = {}", self.width),
            format!("hover = {}", self.hover.label()),
            format!("fade_edges = {}", self.fade.enabled),
            format!("fade_color = {}", format_hex_color(self.fade.color)),
            String::new(),
            "# Display".to_string(),
            format!("sync_hover = {}", self.sync_hover),
            format!("bands = {}", self.bands),
            format!("fps = {}", self.fps),
            format!("lookahead_rows = {}", self.lookahead_rows),
            String::new(),
            "# Key bindings".to_string(),
            "# Format: action = Key1, Key2, ...".to_string(),
            "# Modifiers: Ctrl+, Alt+, Shift+ (prefix)".to_string(),
            String::new(),
        ];

        for &action in Action::ALL {
            if let Some(binds) = self.bindings.get(&action) {
                let keys: Vec<String> = binds.iter().map(|b| b.to_config_string()).collect();
                lines.push(format!("{} = {}", action.config_key(), keys.join(", ")));
            }
        }
        lines.push(String::new());
        lines.join("\n")
    }
}

/// Return the config file path (`$XDG_CONFIG_HOME/logo-loop/config.toml`).
pub fn config_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
    config_dir.join("logo-loop").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn settings_round_trip_through_text() {
        let mut config = AppConfig::default();
        config.speed = -40.5;
        config.direction = Direction::Up;
        config.hover = HoverBehavior::Slow(6.0);
        config.width = LoopWidth::Px(80.0);
        config.fade.color = (16, 32, 48);
        config.bands = 3;
        config
            .bindings
            .insert(Action::Reverse, vec![KeyBind::new(KeyCode::Char('x'), KeyModifiers::CONTROL)]);

        let parsed = AppConfig::parse_config(&config.serialise());
        assert_eq!(parsed.speed, -40.5);
        assert_eq!(parsed.direction, Direction::Up);
        assert_eq!(parsed.hover, HoverBehavior::Slow(6.0));
        assert_eq!(parsed.width, LoopWidth::Px(80.0));
        assert_eq!(parsed.fade.color, (16, 32, 48));
        assert_eq!(parsed.bands, 3);
        assert_eq!(
            parsed.match_key(key(KeyCode::Char('x'), KeyModifiers::CONTROL)),
            Some(Action::Reverse)
        );
        assert_eq!(
            parsed.match_key(key(KeyCode::PageDown, KeyModifiers::NONE)),
            Some(Action::ScrollPageDown)
        );
    }

    #[test]
    fn split_hover_keys_prefer_explicit_speed() {
        let parsed = AppConfig::parse_config("pause_on_hover = true\nhover_speed = -12\n");
        assert_eq!(parsed.hover, HoverBehavior::Slow(-12.0));

        let parsed = AppConfig::parse_config("pause_on_hover = false\n");
        assert_eq!(parsed.hover, HoverBehavior::None);

        // The split keys override a combined `hover` line.
        let parsed = AppConfig::parse_config("hover_speed = 5\nhover = none\n");
        assert_eq!(parsed.hover, HoverBehavior::Slow(5.0));
    }

    #[test]
    fn malformed_values_keep_defaults() {
        let parsed =
            AppConfig::parse_config("direction = up\ndirection = sideways\nspeed = fast\nbands = 99\nhover = wobble\n");
        assert_eq!(parsed.direction, Direction::Left);
        let defaults = AppConfig::default();
        assert_eq!(parsed.speed, defaults.speed);
        assert_eq!(parsed.bands, 8);
        assert_eq!(parsed.hover, defaults.hover);
    }

    #[test]
    fn plus_key_parses_with_and_without_modifiers() {
        assert_eq!(
            KeyBind::parse("+"),
            Some(KeyBind::new(KeyCode::Char('+'), KeyModifiers::NONE))
        );
        assert_eq!(
            KeyBind::parse("Ctrl++"),
            Some(KeyBind::new(KeyCode::Char('+'), KeyModifiers::CONTROL))
        );
        assert_eq!(KeyBind::parse("Hyper+q"), None);
    }

    #[test]
    fn odd_bands_run_reversed() {
        let config = AppConfig::default();
        assert_eq!(config.loop_config(0).direction, Direction::Left);
        assert_eq!(config.loop_config(1).direction, Direction::Right);
        assert_eq!(config.loop_config(2).direction, Direction::Left);
    }

    #[test]
    fn more_modifiers_win() {
        let mut config = AppConfig::default();
        config
            .bindings
            .insert(Action::Quit, vec![KeyBind::new(KeyCode::Char('r'), KeyModifiers::ALT)]);
        assert_eq!(
            config.match_key(key(KeyCode::Char('r'), KeyModifiers::ALT)),
            Some(Action::Quit)
        );
        assert_eq!(
            config.match_key(key(KeyCode::Char('r'), KeyModifiers::NONE)),
            Some(Action::Reverse)
        );
    }
}
