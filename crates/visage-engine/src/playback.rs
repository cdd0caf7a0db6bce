use visage_core::AgentDisplayConfig;
use visage_wire::BaseKind;

/// Idle sub-range window used to visually acknowledge a just-sent user
/// message: bouncing is restricted to these base frames until an overlay
/// starts playing.
pub const USER_INPUT_WINDOW_MIN: usize = 0;
pub const USER_INPUT_WINDOW_MAX: usize = 24;

/// Cursor speed while outside the user-input window. Fixed at 2x; product
/// has not confirmed whether this should be configurable.
pub const INPUT_CATCHUP_SPEED: usize = 2;

/// Coarse playback mode of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Idle,
    Talking,
    Transition,
}

impl std::fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackMode::Idle => write!(f, "idle"),
            PlaybackMode::Talking => write!(f, "talking"),
            PlaybackMode::Transition => write!(f, "transition"),
        }
    }
}

/// Direction of the global base-frame cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDirection {
    Forward,
    Reverse,
}

impl FrameDirection {
    pub fn delta(self) -> isize {
        match self {
            FrameDirection::Forward => 1,
            FrameDirection::Reverse => -1,
        }
    }
}

/// Which of the two transition sequences was chosen for the talking → idle
/// hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Transition1,
    Transition2,
}

impl TransitionKind {
    pub fn base_kind(self) -> BaseKind {
        match self {
            TransitionKind::Transition1 => BaseKind::Transition1,
            TransitionKind::Transition2 => BaseKind::Transition2,
        }
    }
}

/// The global playback state: one per active video session, reset whenever
/// the active agent changes.
#[derive(Debug)]
pub struct PlaybackState {
    /// Current position in whichever frame sequence is active.
    pub frame_index: usize,
    pub direction: FrameDirection,
    pub mode: PlaybackMode,
    /// Transition point and sequence chosen once overlays drain; None until
    /// the seek starts, cleared when the transition (or its fallback to
    /// idle) completes.
    pub chosen_transition: Option<(usize, TransitionKind)>,
    /// Overlay playback finished; the cursor is walking toward a transition
    /// point.
    pub should_return_to_frame: bool,
    /// At-most-one-set-in-flight guard.
    pub is_set_playing: bool,
    /// Idle bouncing is restricted to the user-input window.
    pub user_input_active: bool,
    /// The idle completion notification already fired this idle cycle.
    pub idle_completion_fired: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            frame_index: 0,
            direction: FrameDirection::Forward,
            mode: PlaybackMode::Idle,
            chosen_transition: None,
            should_return_to_frame: false,
            is_set_playing: false,
            user_input_active: false,
            idle_completion_fired: false,
        }
    }

    /// Back to initial idle/frame-0 state (agent switch).
    pub fn reset(&mut self) {
        *self = PlaybackState::new();
    }

    /// One idle tick: bounce between the sequence bounds, or the user-input
    /// window when armed, at catch-up speed while outside the window.
    pub fn step_idle(&mut self, frames_count: usize) {
        if frames_count == 0 {
            return;
        }
        let mut min = 0;
        let mut max = frames_count - 1;
        let mut speed = 1;
        if self.user_input_active {
            min = USER_INPUT_WINDOW_MIN;
            max = USER_INPUT_WINDOW_MAX;
            if self.frame_index < min || self.frame_index > max {
                speed = INPUT_CATCHUP_SPEED;
            }
        }
        self.bounce(min, max, speed);
    }

    /// One non-idle, non-transition tick: bounce over the full sequence.
    pub fn step_full(&mut self, frames_count: usize) {
        if frames_count == 0 {
            return;
        }
        self.bounce(0, frames_count - 1, 1);
    }

    /// Ping-pong step over `[min, max]`: reverse immediately upon touching
    /// either bound, no dwell frame. A cursor outside the range is pulled
    /// back toward it without overshooting.
    fn bounce(&mut self, min: usize, max: usize, speed: usize) {
        let min_i = min as isize;
        let max_i = max as isize;
        let cur = self.frame_index as isize;
        let step = speed as isize;

        let next = if cur < min_i {
            self.direction = FrameDirection::Forward;
            (cur + step).min(min_i)
        } else if cur > max_i {
            self.direction = FrameDirection::Reverse;
            (cur - step).max(max_i)
        } else {
            let mut next = cur + self.direction.delta() * step;
            if next >= max_i {
                next = max_i;
                self.direction = FrameDirection::Reverse;
            } else if next <= min_i {
                next = min_i;
                self.direction = FrameDirection::Forward;
            }
            next
        };

        self.frame_index = next.max(0) as usize;
    }
}

/// Pick the transition point nearest to the cursor. On a tie the first
/// configured point wins (non-strict comparison).
pub fn nearest_transition_point(
    current: usize,
    config: &AgentDisplayConfig,
) -> (usize, TransitionKind) {
    let dist1 = current.abs_diff(config.transition_point_1);
    let dist2 = current.abs_diff(config.transition_point_2);
    if dist1 <= dist2 {
        (config.transition_point_1, TransitionKind::Transition1)
    } else {
        (config.transition_point_2, TransitionKind::Transition2)
    }
}
