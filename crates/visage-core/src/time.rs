use std::time::{Duration, Instant};

/// Logical engine frame rate. Every state transition in the playback engine
/// is driven by ticks at this rate.
pub const ENGINE_FPS: f64 = 24.0;

/// Fixed-rate tick gate with carry-over remainder.
///
/// A caller polls `should_step` as fast as it likes (a render loop, a timer
/// at a higher frequency); the clock answers true once per logical frame,
/// measured against wall-clock elapsed time. The remainder of the elapsed
/// time past a frame boundary is carried over instead of discarded, so ticks
/// self-correct after a janky poll rather than drifting.
#[derive(Debug)]
pub struct TickClock {
    frame_duration: Duration,
    last: Instant,
}

impl TickClock {
    /// Create a clock ticking at `fps`, anchored at `now`.
    pub fn new(fps: f64, now: Instant) -> Self {
        let fps = if fps > 0.0 { fps } else { ENGINE_FPS };
        Self {
            frame_duration: Duration::from_secs_f64(1.0 / fps),
            last: now,
        }
    }

    /// Create a clock at the engine's standard rate, anchored at `now`.
    pub fn engine_rate(now: Instant) -> Self {
        Self::new(ENGINE_FPS, now)
    }

    /// Duration of one logical frame.
    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Returns true when at least one frame duration has elapsed since the
    /// last accepted tick. The sub-frame remainder is kept: the anchor moves
    /// to `now - (elapsed % frame_duration)`.
    pub fn should_step(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last);
        if elapsed < self.frame_duration {
            return false;
        }
        let frame_nanos = self.frame_duration.as_nanos();
        let remainder = Duration::from_nanos((elapsed.as_nanos() % frame_nanos) as u64);
        self.last = now - remainder;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_step_before_frame_elapsed() {
        let start = Instant::now();
        let mut clock = TickClock::new(24.0, start);
        assert!(!clock.should_step(start + Duration::from_millis(10)));
    }

    #[test]
    fn test_step_after_frame_elapsed() {
        let start = Instant::now();
        let mut clock = TickClock::new(24.0, start);
        assert!(clock.should_step(start + Duration::from_millis(42)));
    }

    #[test]
    fn test_remainder_carries_over() {
        let start = Instant::now();
        // 10 fps => 100ms frames, for round numbers.
        let mut clock = TickClock::new(10.0, start);

        // 130ms elapsed: one tick, 30ms remainder carried.
        assert!(clock.should_step(start + Duration::from_millis(130)));
        // 70ms later the carried 30ms completes the next frame.
        assert!(clock.should_step(start + Duration::from_millis(200)));
        // Nothing owed right after.
        assert!(!clock.should_step(start + Duration::from_millis(210)));
    }

    #[test]
    fn test_jank_does_not_queue_multiple_ticks() {
        let start = Instant::now();
        let mut clock = TickClock::new(10.0, start);

        // A 350ms stall yields a single tick (frames are dropped, not
        // replayed), with the 50ms remainder kept.
        assert!(clock.should_step(start + Duration::from_millis(350)));
        assert!(!clock.should_step(start + Duration::from_millis(360)));
        assert!(clock.should_step(start + Duration::from_millis(400)));
    }

    #[test]
    fn test_invalid_fps_falls_back_to_engine_rate() {
        let start = Instant::now();
        let clock = TickClock::new(0.0, start);
        let expected = Duration::from_secs_f64(1.0 / ENGINE_FPS);
        assert_eq!(clock.frame_duration(), expected);
    }
}
