use serde::{Deserialize, Serialize};
use visage_core::AgentDisplayConfig;

use crate::model::BaseKind;

/// One speech chunk's animation payload as it arrives from the socket.
///
/// `dataArray` is expected to carry exactly one target; the first element is
/// the active one and the rest are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSetPayload {
    pub data_array: Vec<AnimationTargetPayload>,
    pub chunk_index: u32,
    #[serde(default)]
    pub unique_set_id: Option<u64>,
}

/// The animation target inside a set payload: overlay sections plus the
/// default playback mode and the fallback sprite draw origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationTargetPayload {
    pub sections: Vec<Vec<OverlayFrameSpec>>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub zone_top_left: Option<[i32; 2]>,
}

/// One overlay frame reference within a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayFrameSpec {
    /// The base-frame index at which this overlay frame is shown.
    pub matched_sprite_frame_number: usize,
    /// Ordinal of this frame within its section; part of the cache key.
    pub frame_index: usize,
    #[serde(default)]
    pub matched_filename: Option<String>,
    #[serde(default)]
    pub sheet_filename: Option<String>,
    /// Sprite-sheet source rect `[sx, sy, sw, sh]` for fallback drawing.
    #[serde(default)]
    pub coordinates: Option<[u32; 4]>,
    /// Per-frame mode override; falls back to the target's mode.
    #[serde(default)]
    pub mode: Option<String>,
}

/// One streamed base frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseFramePayload {
    pub animation_type: BaseKind,
    /// Base64 image data, optionally a full `data:image/...` URI.
    pub frame_data: String,
}

/// One streamed overlay frame image. The cache key is formed together with
/// the chunk index the surrounding message carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayImagePayload {
    pub section_index: usize,
    pub matched_sprite_frame_number: usize,
    pub frame_index: usize,
    /// Base64 image data, optionally a full `data:image/...` URI.
    pub image_data: String,
}

/// Agent display configuration as delivered by the session layer.
/// Every field is optional; see [`AgentConfigPayload::resolve`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfigPayload {
    #[serde(default)]
    pub pos_x: Option<i32>,
    #[serde(default)]
    pub pos_y: Option<i32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub transition_point_1: Option<usize>,
    #[serde(default)]
    pub transition_point_2: Option<usize>,
}

impl AgentConfigPayload {
    /// Fill absent fields with the engine defaults. A non-positive size is
    /// treated as absent.
    pub fn resolve(&self) -> AgentDisplayConfig {
        let defaults = AgentDisplayConfig::default();
        AgentDisplayConfig {
            pos_x: self.pos_x.unwrap_or(defaults.pos_x),
            pos_y: self.pos_y.unwrap_or(defaults.pos_y),
            width: self.width.filter(|w| *w > 0).unwrap_or(defaults.width),
            height: self.height.filter(|h| *h > 0).unwrap_or(defaults.height),
            transition_point_1: self.transition_point_1.unwrap_or(defaults.transition_point_1),
            transition_point_2: self.transition_point_2.unwrap_or(defaults.transition_point_2),
        }
    }
}
