use visage_wire::{AnimationSet, OverlayFrame, OverlayMode};

use crate::playback::FrameDirection;

/// Internal frame ordinal at which the opening chunk of a speech turn fires
/// its audio-start signal. Later chunks fire on their first frame; only the
/// first chunk absorbs the animation lead-in. Not generalized to variable
/// lead-in lengths.
pub const FIRST_CHUNK_AUDIO_LEAD_IN: usize = 3;

/// One overlay animation derived from a section of an animation set.
#[derive(Debug, Clone)]
pub struct OverlayAnimation {
    /// Direction requirement for the start trigger.
    pub mode: OverlayMode,
    /// Ordered overlay frames; the first frame's sprite number is the start
    /// trigger against the global cursor.
    pub frames: Vec<OverlayFrame>,
    pub section_index: usize,
    pub chunk_index: u32,
    pub set_id: u64,
    /// Draw origin for fallback sprite-sheet drawing.
    pub zone_top_left: Option<[i32; 2]>,
}

/// Private playback state of one overlay animation. Created together with
/// its animation, destroyed together when the overlay is pruned.
#[derive(Debug, Clone, Default)]
pub struct OverlayState {
    pub playing: bool,
    pub current_drawing_frame: usize,
    pub done: bool,
    pub audio_started: bool,
}

/// An overlay animation paired with its playback state.
#[derive(Debug, Clone)]
pub struct ActiveOverlay {
    pub anim: OverlayAnimation,
    pub state: OverlayState,
}

impl ActiveOverlay {
    /// The overlay's direction requirement matches the global direction.
    pub fn direction_matches(&self, direction: FrameDirection) -> bool {
        match self.anim.mode {
            OverlayMode::Forward => direction == FrameDirection::Forward,
            OverlayMode::Reverse => direction == FrameDirection::Reverse,
        }
    }

    /// Start condition: not yet playing, direction matches, and the global
    /// cursor sits exactly on the first frame's target base frame.
    pub fn should_start(&self, cursor: usize, direction: FrameDirection) -> bool {
        if self.state.done || self.state.playing {
            return false;
        }
        self.direction_matches(direction)
            && self.anim.frames.first().map(|f| f.sprite_frame) == Some(cursor)
    }

    /// Audio-start condition for the frame about to be drawn: once per
    /// overlay, at the lead-in frame for the opening chunk of a turn,
    /// immediately for later chunks.
    pub fn audio_due(&self) -> bool {
        if self.state.audio_started {
            return false;
        }
        if self.anim.chunk_index == 0 {
            self.state.current_drawing_frame == FIRST_CHUNK_AUDIO_LEAD_IN
        } else {
            self.state.current_drawing_frame == 0
        }
    }
}

/// Build the active overlay list for a dequeued set: one overlay per
/// section, each with a fresh playback state. The overlay's direction
/// requirement comes from its first frame (already resolved against the
/// target default during validation).
pub fn build_overlays(set: &AnimationSet, set_id: u64) -> Vec<ActiveOverlay> {
    set.target
        .sections
        .iter()
        .enumerate()
        .filter(|(_, section)| !section.frames.is_empty())
        .map(|(section_index, section)| ActiveOverlay {
            anim: OverlayAnimation {
                mode: section.frames[0].mode,
                frames: section.frames.clone(),
                section_index,
                chunk_index: set.chunk_index,
                set_id,
                zone_top_left: set.target.zone_top_left,
            },
            state: OverlayState::default(),
        })
        .collect()
}
