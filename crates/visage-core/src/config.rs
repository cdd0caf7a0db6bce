use serde::{Deserialize, Serialize};

/// Default draw position of the overlay patch on the canvas.
pub const DEFAULT_POS_X: i32 = 150;
pub const DEFAULT_POS_Y: i32 = 30;
/// Default overlay patch size.
pub const DEFAULT_OVERLAY_WIDTH: u32 = 200;
pub const DEFAULT_OVERLAY_HEIGHT: u32 = 200;
/// Default base-frame indices where the talking loop may hand off into a
/// transition sequence.
pub const DEFAULT_TRANSITION_POINT_1: usize = 53;
pub const DEFAULT_TRANSITION_POINT_2: usize = 83;

/// Per-agent display geometry and transition configuration.
///
/// Every field is optional on the wire; absent fields fall back to these
/// defaults rather than surfacing an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDisplayConfig {
    /// X position where overlay frames are drawn.
    pub pos_x: i32,
    /// Y position where overlay frames are drawn.
    pub pos_y: i32,
    /// Overlay patch width in pixels.
    pub width: u32,
    /// Overlay patch height in pixels.
    pub height: u32,
    /// First candidate transition frame.
    pub transition_point_1: usize,
    /// Second candidate transition frame.
    pub transition_point_2: usize,
}

impl Default for AgentDisplayConfig {
    fn default() -> Self {
        Self {
            pos_x: DEFAULT_POS_X,
            pos_y: DEFAULT_POS_Y,
            width: DEFAULT_OVERLAY_WIDTH,
            height: DEFAULT_OVERLAY_HEIGHT,
            transition_point_1: DEFAULT_TRANSITION_POINT_1,
            transition_point_2: DEFAULT_TRANSITION_POINT_2,
        }
    }
}
