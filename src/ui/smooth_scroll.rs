//! Page scroll with exponential ease-out.
//!
//! When the scroll target changes, the displayed position starts where it
//! was and the remaining displacement decays toward zero each frame, so
//! bands slide a few rows per frame instead of jumping.

/// Row-offset smooth scroll animator.
#[derive(Debug, Clone)]
pub struct SmoothScroll {
    /// Displayed position minus target.  Negative while catching up on a
    /// downward scroll.
    row_offset: f64,
    target: u16,
    /// Damping: `offset *= (1 - speed)` each tick.
    speed: f64,
}

impl SmoothScroll {
    pub fn new(speed: f64) -> Self {
        Self {
            row_offset: 0.0,
            target: 0,
            speed: speed.clamp(0.05, 0.95),
        }
    }

    pub fn target(&self) -> u16 {
        self.target
    }

    /// Move the target.  The displayed position keeps its current value and
    /// eases toward the new target.
    pub fn set_target(&mut self, target: u16) {
        if target != self.target {
            let delta = f64::from(target) - f64::from(self.target);
            self.row_offset -= delta;
            self.target = target;
        }
    }

    /// Decay the offset toward zero.  Call once per frame.
    pub fn tick(&mut self) {
        self.row_offset *= 1.0 - self.speed;
        if self.row_offset.abs() < 0.4 {
            self.row_offset = 0.0;
        }
    }

    /// Row currently shown at the top of the page.
    pub fn position(&self) -> u16 {
        (f64::from(self.target) + self.row_offset)
            .round()
            .clamp(0.0, f64::from(u16::MAX)) as u16
    }

    pub fn is_animating(&self) -> bool {
        self.row_offset != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eases_toward_target() {
        let mut scroll = SmoothScroll::new(0.5);
        scroll.set_target(8);
        assert_eq!(scroll.position(), 0);
        assert!(scroll.is_animating());

        scroll.tick();
        assert_eq!(scroll.position(), 4);
        let mut ticks = 1;
        while scroll.is_animating() {
            scroll.tick();
            ticks += 1;
        }
        assert_eq!(scroll.position(), 8);
        assert!(ticks < 10);
    }

    #[test]
    fn retarget_mid_flight_keeps_position() {
        let mut scroll = SmoothScroll::new(0.5);
        scroll.set_target(8);
        scroll.tick();
        let shown = scroll.position();
        scroll.set_target(2);
        assert_eq!(scroll.position(), shown);
    }
}
