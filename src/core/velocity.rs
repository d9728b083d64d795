//! Velocity model: signed speed + direction → velocity along the axis.
//!
//! Positive velocity grows the offset, which moves content toward the start
//! of the axis: `left` on the horizontal axis, `up` on the vertical one.

use super::loop_config::{Direction, HoverBehavior};

/// Base target velocity for `speed` travelling in `direction`.
///
/// The direction sets the base sign and a negative speed flips it.
pub fn target_velocity(speed: f64, direction: Direction) -> f64 {
    let magnitude = speed.abs();
    let direction_sign = match direction {
        Direction::Left | Direction::Up => 1.0,
        Direction::Right | Direction::Down => -1.0,
    };
    let speed_sign = if speed < 0.0 { -1.0 } else { 1.0 };
    magnitude * direction_sign * speed_sign
}

/// Velocity to ease toward while hovered, or `None` when hovering is a no-op.
pub fn hover_velocity(behavior: HoverBehavior, direction: Direction) -> Option<f64> {
    behavior
        .hover_speed()
        .map(|speed| target_velocity(speed, direction))
}
