use serde::{Deserialize, Serialize};

/// The four base frame sequences the avatar cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseKind {
    Idle,
    Talking,
    Transition1,
    Transition2,
}

impl BaseKind {
    /// Stable index for array-backed storage.
    pub fn index(self) -> usize {
        match self {
            BaseKind::Idle => 0,
            BaseKind::Talking => 1,
            BaseKind::Transition1 => 2,
            BaseKind::Transition2 => 3,
        }
    }

    pub const ALL: [BaseKind; 4] = [
        BaseKind::Idle,
        BaseKind::Talking,
        BaseKind::Transition1,
        BaseKind::Transition2,
    ];
}

impl std::fmt::Display for BaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BaseKind::Idle => write!(f, "idle"),
            BaseKind::Talking => write!(f, "talking"),
            BaseKind::Transition1 => write!(f, "transition1"),
            BaseKind::Transition2 => write!(f, "transition2"),
        }
    }
}

/// Overlay playback direction requirement.
///
/// A forward overlay may only start while the global cursor moves forward;
/// a reverse overlay only while it moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    Forward,
    Reverse,
}

impl OverlayMode {
    /// Parse the wire string, case-insensitively. Unknown strings are None.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "forward" => Some(OverlayMode::Forward),
            "reverse" => Some(OverlayMode::Reverse),
            _ => None,
        }
    }
}

/// One validated overlay frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayFrame {
    /// The base-frame index at which this overlay frame is shown.
    pub sprite_frame: usize,
    /// Ordinal within the section; part of the overlay-image cache key.
    pub frame_index: usize,
    pub matched_filename: Option<String>,
    pub sheet_filename: Option<String>,
    /// Sprite-sheet source rect for fallback drawing.
    pub coordinates: Option<[u32; 4]>,
    /// Per-frame mode; already resolved against the target default.
    pub mode: OverlayMode,
}

/// One validated overlay section: a non-empty ordered frame list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySection {
    pub frames: Vec<OverlayFrame>,
}

/// The validated active target of an animation set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationTarget {
    /// Non-empty sections; empty sections from the wire are filtered out.
    pub sections: Vec<OverlaySection>,
    /// Draw origin override for fallback sprite-sheet drawing.
    pub zone_top_left: Option<[i32; 2]>,
}

/// One validated animation set, ready to enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationSet {
    pub target: AnimationTarget,
    /// Ordinal position within a logical speech turn; 0 = first chunk.
    pub chunk_index: u32,
    /// Caller-forced set identifier, if any. When absent the queue assigns
    /// one from its monotonic counter.
    pub forced_set_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_kind_indices_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for kind in BaseKind::ALL {
            assert!(seen.insert(kind.index()));
        }
    }

    #[test]
    fn test_base_kind_serde_names() {
        assert_eq!(serde_json::to_string(&BaseKind::Transition1).unwrap(), "\"transition1\"");
        let kind: BaseKind = serde_json::from_str("\"idle\"").unwrap();
        assert_eq!(kind, BaseKind::Idle);
    }

    #[test]
    fn test_overlay_mode_parse_case_insensitive() {
        assert_eq!(OverlayMode::parse("Forward"), Some(OverlayMode::Forward));
        assert_eq!(OverlayMode::parse("REVERSE"), Some(OverlayMode::Reverse));
        assert_eq!(OverlayMode::parse("sideways"), None);
    }
}
