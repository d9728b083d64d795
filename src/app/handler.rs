//! Input handling: maps key/mouse events to state mutations.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::config::Action;

use super::state::AppState;

/// Rows scrolled per mouse wheel notch.
const WHEEL_ROWS: i32 = 3;

/// What the main loop must do after an event beyond redrawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    None,
    /// Re-read the item source and restart decoding.
    Reload,
}

/// Process a key event.
pub fn handle_key(state: &mut AppState, key: KeyEvent) -> Followup {
    // Ctrl+c always quits.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        state.should_quit = true;
        return Followup::None;
    }

    let Some(action) = state.config.match_key(key) else {
        return Followup::None;
    };
    state.status_message = None;

    match action {
        Action::SpeedUp => state.set_speed(state.config.speed + speed_step(state.config.speed)),
        Action::SpeedDown => state.set_speed(state.config.speed - speed_step(state.config.speed)),
        // Negative speed runs the other way; the eased velocity carries
        // the loop smoothly through zero.
        Action::Reverse => state.set_speed(-state.config.speed),
        Action::CycleDirection => state.cycle_direction(),
        Action::CycleHover => state.cycle_hover(),
        Action::ToggleFade => state.toggle_fade(),
        Action::ScrollPageUp => state.scroll_by(-half_page(state)),
        Action::ScrollPageDown => state.scroll_by(half_page(state)),
        Action::Reload => return Followup::Reload,
        Action::Quit => {
            state.should_quit = true;
            return Followup::None;
        }
    }

    if matches!(
        action,
        Action::SpeedUp
            | Action::SpeedDown
            | Action::Reverse
            | Action::CycleDirection
            | Action::CycleHover
            | Action::ToggleFade
    ) {
        persist(state);
    }
    Followup::None
}

/// Process a mouse event: hover tracking, wheel scrolling, and clicks.
pub fn handle_mouse(state: &mut AppState, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) => {
            state.pointer_at(mouse.column, mouse.row);
        }
        MouseEventKind::Down(MouseButton::Left) => {
            state.status_message = None;
            state.click(mouse.column, mouse.row);
        }
        MouseEventKind::ScrollUp => {
            state.scroll_by(-WHEEL_ROWS);
            state.pointer_at(mouse.column, mouse.row);
        }
        MouseEventKind::ScrollDown => {
            state.scroll_by(WHEEL_ROWS);
            state.pointer_at(mouse.column, mouse.row);
        }
        _ => {}
    }
}

/// A quarter of the current speed, at least 4 cells per second.
fn speed_step(speed: f64) -> f64 {
    (speed.abs() / 4.0).max(4.0).round()
}

fn half_page(state: &AppState) -> i32 {
    i32::from(state.page_area().height / 2).max(1)
}

fn persist(state: &mut AppState) {
    if let Err(e) = state.config.save_to(&state.config_path) {
        tracing::warn!(error = %e, "failed to save config");
        state.status_message = Some(format!("Could not save settings: {e}"));
    }
}
