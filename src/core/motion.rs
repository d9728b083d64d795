//! Animation loop: eased velocity integrated into a wrapping offset.
//!
//! The loop is cooperative: each frame does its update and then asks the
//! [`FrameScheduler`] for the next one.  Stopping means cancelling the
//! pending request and forgetting the last timestamp, so a resumed loop
//! starts from a fresh timing baseline instead of replaying the pause.
//!
//! ```text
//!   mount(visible) ──► Running ──set_visible(false)──► Stopped
//!                         ▲                              │
//!                         └──────set_visible(true)───────┘
//! ```

use std::time::Duration;

use super::loop_config::MotionTuning;

// ───────────────────────────────────────── scheduling ────────

/// Identifies one requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Per-frame callback scheduling, e.g. a display's vsync or a timer.
pub trait FrameScheduler {
    /// Ask for one frame.  The host later delivers it to
    /// [`LoopAnimator::on_frame`] with the returned handle.
    fn request_frame(&mut self) -> FrameHandle;
    /// Withdraw a request.  Cancelling a delivered or unknown handle is a no-op.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Single-slot scheduler: holds at most one outstanding request and hands
/// it out when the host's clock ticks.
#[derive(Debug, Default)]
pub struct FrameQueue {
    next_id: u64,
    pending: Option<FrameHandle>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the outstanding request, if any.
    pub fn take_due(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_id = self.next_id.wrapping_add(1);
        let handle = FrameHandle(self.next_id);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}

// ───────────────────────────────────────── state ─────────────

/// Mutable motion state owned by one loop instance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionState {
    /// Always within `[0, sequence_extent)` once the sequence is measured.
    pub offset: f64,
    /// Current eased velocity (px/s).
    pub velocity: f64,
    /// Velocity the last frame eased toward.
    pub target: f64,
    pub last_timestamp: Option<Duration>,
    pub visible: bool,
}

/// Inputs sampled at the start of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameInputs {
    /// Target velocity when not hovered.
    pub base_velocity: f64,
    /// Target velocity while hovered; `None` means hovering changes nothing.
    pub hover_velocity: Option<f64>,
    pub hovered: bool,
}

impl FrameInputs {
    pub fn target(&self) -> f64 {
        match (self.hovered, self.hover_velocity) {
            (true, Some(v)) => v,
            _ => self.base_velocity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running { pending: FrameHandle },
    Stopped,
}

/// Wrap `x` into `[0, m)`.  Correct for negative `x`; `m` must be positive.
pub fn wrap_offset(x: f64, m: f64) -> f64 {
    let r = ((x % m) + m) % m;
    // `(x % m) + m` can round up to exactly `m` for tiny negative `x`.
    if r >= m || r.is_nan() {
        0.0
    } else {
        r
    }
}

/// Ease `velocity` toward `target` over `elapsed` seconds.
pub fn ease_velocity(velocity: f64, target: f64, elapsed: f64, tau: f64) -> f64 {
    let factor = if tau > 0.0 {
        1.0 - (-elapsed / tau).exp()
    } else {
        1.0
    };
    velocity + (target - velocity) * factor
}

// ───────────────────────────────────────── animator ──────────

#[derive(Debug, Clone)]
pub struct LoopAnimator {
    tuning: MotionTuning,
    motion: MotionState,
    state: LoopState,
    sequence_extent: f64,
}

impl LoopAnimator {
    pub fn new(tuning: MotionTuning) -> Self {
        Self {
            tuning,
            motion: MotionState::default(),
            state: LoopState::Stopped,
            sequence_extent: 0.0,
        }
    }

    pub fn motion(&self) -> &MotionState {
        &self.motion
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running { .. })
    }

    pub fn sequence_extent(&self) -> f64 {
        self.sequence_extent
    }

    /// Translation to apply along the axis, or `None` while unmeasured.
    pub fn translation(&self) -> Option<f64> {
        (self.sequence_extent > 0.0).then_some(-self.motion.offset)
    }

    /// Start in the running state if `visible`, stopped otherwise.
    pub fn mount(&mut self, visible: bool, scheduler: &mut dyn FrameScheduler) {
        self.motion.visible = visible;
        if visible {
            self.start(scheduler);
        } else {
            self.stop(scheduler);
        }
    }

    /// Visibility transition from the observer.
    pub fn set_visible(&mut self, visible: bool, scheduler: &mut dyn FrameScheduler) {
        self.motion.visible = visible;
        match (visible, self.is_running()) {
            (true, false) => {
                tracing::debug!("loop resumed");
                self.start(scheduler);
            }
            (false, true) => {
                tracing::debug!(offset = self.motion.offset, "loop paused");
                self.stop(scheduler);
            }
            _ => {}
        }
    }

    /// Cancel everything.  The animator can be mounted again afterwards.
    pub fn unmount(&mut self, scheduler: &mut dyn FrameScheduler) {
        self.stop(scheduler);
        self.motion.visible = false;
    }

    /// Adopt a new wrap modulus.  The offset is re-wrapped in place and the
    /// velocity is left alone so motion continues without a jump.
    pub fn set_sequence_extent(&mut self, extent: f64) {
        if extent.is_finite() && extent > 0.0 {
            self.motion.offset = wrap_offset(self.motion.offset, extent);
            self.sequence_extent = extent;
        } else {
            self.motion.offset = 0.0;
            self.sequence_extent = 0.0;
        }
    }

    /// Run one frame.  Frames for a handle other than the pending one are
    /// ignored (cancelled or already delivered).  Returns the translation
    /// to apply, or `None` if nothing should be drawn differently.
    pub fn on_frame(
        &mut self,
        handle: FrameHandle,
        timestamp: Duration,
        inputs: &FrameInputs,
        scheduler: &mut dyn FrameScheduler,
    ) -> Option<f64> {
        let LoopState::Running { pending } = self.state else {
            return None;
        };
        if pending != handle {
            return None;
        }

        let elapsed = match self.motion.last_timestamp {
            Some(prev) => timestamp
                .saturating_sub(prev)
                .as_secs_f64()
                .min(self.tuning.max_elapsed),
            None => 0.0,
        };
        self.motion.last_timestamp = Some(timestamp);

        let target = inputs.target();
        self.motion.target = target;
        self.motion.velocity = ease_velocity(self.motion.velocity, target, elapsed, self.tuning.tau);

        let translation = if self.sequence_extent > 0.0 {
            let advanced = self.motion.offset + self.motion.velocity * elapsed;
            self.motion.offset = wrap_offset(advanced, self.sequence_extent);
            Some(-self.motion.offset)
        } else {
            None
        };

        self.state = LoopState::Running {
            pending: scheduler.request_frame(),
        };
        translation
    }

    fn start(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.is_running() {
            return;
        }
        self.motion.last_timestamp = None;
        self.state = LoopState::Running {
            pending: scheduler.request_frame(),
        };
    }

    fn stop(&mut self, scheduler: &mut dyn FrameScheduler) {
        if let LoopState::Running { pending } = self.state {
            scheduler.cancel_frame(pending);
        }
        self.state = LoopState::Stopped;
        self.motion.last_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FRAME: Duration = Duration::from_micros(16_667);

    fn inputs(base: f64) -> FrameInputs {
        FrameInputs {
            base_velocity: base,
            hover_velocity: Some(0.0),
            hovered: false,
        }
    }

    /// Deliver `n` frames starting at `*now`, advancing the clock by `step`.
    fn run_frames(
        animator: &mut LoopAnimator,
        frames: &mut FrameQueue,
        now: &mut Duration,
        step: Duration,
        n: usize,
        input: &FrameInputs,
    ) {
        for _ in 0..n {
            if let Some(handle) = frames.take_due() {
                animator.on_frame(handle, *now, input, frames);
            }
            *now += step;
        }
    }

    #[test]
    fn easing_converges_within_two_seconds() {
        let mut frames = FrameQueue::new();
        let mut animator = LoopAnimator::new(MotionTuning::default());
        animator.set_sequence_extent(1200.0);
        animator.mount(true, &mut frames);

        let mut now = Duration::ZERO;
        // One extra frame: the first establishes the timing baseline.
        run_frames(&mut animator, &mut frames, &mut now, FRAME, 121, &inputs(120.0));

        let v = animator.motion().velocity;
        assert!((v - 120.0).abs() <= 1.2, "velocity {v}");
    }

    #[test]
    fn velocity_changes_are_gradual() {
        let mut frames = FrameQueue::new();
        let mut animator = LoopAnimator::new(MotionTuning::default());
        animator.set_sequence_extent(500.0);
        animator.mount(true, &mut frames);

        let mut now = Duration::ZERO;
        run_frames(&mut animator, &mut frames, &mut now, FRAME, 2, &inputs(120.0));
        let v = animator.motion().velocity;
        assert!(v > 0.0 && v < 120.0 * 0.1, "one frame moved velocity to {v}");
    }

    #[test]
    fn hover_eases_toward_override() {
        let mut frames = FrameQueue::new();
        let mut animator = LoopAnimator::new(MotionTuning::default());
        animator.set_sequence_extent(500.0);
        animator.mount(true, &mut frames);

        let mut now = Duration::ZERO;
        run_frames(&mut animator, &mut frames, &mut now, FRAME, 200, &inputs(120.0));
        let hovered = FrameInputs {
            hovered: true,
            ..inputs(120.0)
        };
        run_frames(&mut animator, &mut frames, &mut now, FRAME, 200, &hovered);
        assert!(animator.motion().velocity.abs() < 1.0);
        assert_eq!(animator.motion().target, 0.0);
    }

    #[test]
    fn elapsed_is_clamped() {
        let mut frames = FrameQueue::new();
        let mut animator = LoopAnimator::new(MotionTuning::default());
        animator.set_sequence_extent(10_000.0);
        animator.mount(true, &mut frames);

        let mut now = Duration::ZERO;
        run_frames(&mut animator, &mut frames, &mut now, FRAME, 300, &inputs(120.0));
        let before = animator.motion().offset;
        let v = animator.motion().velocity;

        // A 5 second stall between frames counts as 1/30 s.
        now += Duration::from_secs(5);
        run_frames(&mut animator, &mut frames, &mut now, FRAME, 1, &inputs(120.0));
        let moved = animator.motion().offset - before;
        assert!(moved <= v / 30.0 + 0.5, "moved {moved}");
    }

    #[test]
    fn pause_freezes_offset_and_resume_ignores_pause_length() {
        let mut frames = FrameQueue::new();
        let mut animator = LoopAnimator::new(MotionTuning::default());
        animator.set_sequence_extent(5_000.0);
        animator.mount(true, &mut frames);

        let mut now = Duration::ZERO;
        run_frames(&mut animator, &mut frames, &mut now, FRAME, 120, &inputs(120.0));

        animator.set_visible(false, &mut frames);
        assert!(!animator.is_running());
        assert!(!frames.is_pending());
        assert_eq!(animator.motion().last_timestamp, None);

        let frozen = animator.motion().offset;
        // Nothing is scheduled, and a stale handle is rejected.
        run_frames(&mut animator, &mut frames, &mut now, FRAME, 60, &inputs(120.0));
        assert!(animator
            .on_frame(FrameHandle(1), now, &inputs(120.0), &mut frames)
            .is_none());
        assert_eq!(animator.motion().offset, frozen);

        now += Duration::from_secs(3);
        animator.set_visible(true, &mut frames);
        let v = animator.motion().velocity;
        run_frames(&mut animator, &mut frames, &mut now, FRAME, 2, &inputs(120.0));
        let advanced = animator.motion().offset - frozen;
        let one_frame = v * FRAME.as_secs_f64();
        assert!(advanced > 0.0);
        assert!((advanced - one_frame).abs() < one_frame * 0.05, "advanced {advanced}");
    }

    #[test]
    fn unmeasured_loop_keeps_running_without_moving() {
        let mut frames = FrameQueue::new();
        let mut animator = LoopAnimator::new(MotionTuning::default());
        animator.mount(true, &mut frames);

        let handle = frames.take_due().unwrap();
        assert_eq!(
            animator.on_frame(handle, Duration::ZERO, &inputs(120.0), &mut frames),
            None
        );
        assert!(frames.is_pending());
        assert_eq!(animator.motion().offset, 0.0);
        assert_eq!(animator.translation(), None);
    }

    #[test]
    fn starts_stopped_when_hidden() {
        let mut frames = FrameQueue::new();
        let mut animator = LoopAnimator::new(MotionTuning::default());
        animator.mount(false, &mut frames);
        assert!(!animator.is_running());
        assert!(!frames.is_pending());
    }

    #[test]
    fn shrinking_extent_rewraps_without_touching_velocity() {
        let mut frames = FrameQueue::new();
        let mut animator = LoopAnimator::new(MotionTuning::default());
        animator.set_sequence_extent(1000.0);
        animator.mount(true, &mut frames);

        let mut now = Duration::ZERO;
        run_frames(&mut animator, &mut frames, &mut now, FRAME, 400, &inputs(300.0));
        let v = animator.motion().velocity;

        animator.set_sequence_extent(7.0);
        let offset = animator.motion().offset;
        assert!((0.0..7.0).contains(&offset), "offset {offset}");
        assert_eq!(animator.motion().velocity, v);
    }

    #[test]
    fn translation_is_negated_offset() {
        let mut frames = FrameQueue::new();
        let mut animator = LoopAnimator::new(MotionTuning::default());
        animator.set_sequence_extent(100.0);
        animator.mount(true, &mut frames);
        let mut now = Duration::ZERO;
        run_frames(&mut animator, &mut frames, &mut now, FRAME, 30, &inputs(50.0));
        assert_eq!(animator.translation(), Some(-animator.motion().offset));
    }

    #[test]
    fn wrap_handles_negative_values() {
        assert_eq!(wrap_offset(-10.0, 100.0), 90.0);
        assert_eq!(wrap_offset(250.0, 100.0), 50.0);
        assert_eq!(wrap_offset(-1e-18, 100.0), 0.0);
    }

    proptest! {
        #[test]
        fn offset_stays_in_range(
            speed in -2_000.0f64..2_000.0,
            extent in 1.0f64..3_000.0,
            shrink_to in 0.5f64..3_000.0,
            steps in proptest::collection::vec(0u64..200, 1..120),
        ) {
            let mut frames = FrameQueue::new();
            let mut animator = LoopAnimator::new(MotionTuning::default());
            animator.set_sequence_extent(extent);
            animator.mount(true, &mut frames);
            let input = inputs(speed);

            let mut now = Duration::ZERO;
            for (i, ms) in steps.iter().enumerate() {
                now += Duration::from_millis(*ms);
                if let Some(handle) = frames.take_due() {
                    animator.on_frame(handle, now, &input, &mut frames);
                }
                if i == steps.len() / 2 {
                    animator.set_sequence_extent(shrink_to);
                }
                let m = animator.sequence_extent();
                let offset = animator.motion().offset;
                prop_assert!(offset >= 0.0 && offset < m, "offset {} extent {}", offset, m);
            }
        }
    }
}
