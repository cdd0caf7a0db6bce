use crate::payload::OverlayImagePayload;

/// Cache key for one streamed overlay frame image.
///
/// Images stream in independently of the animation sets that reference them;
/// this composite key lets a lookup race ahead of or behind playback.
/// The display form matches the wire protocol's string key,
/// `chunk-section-spriteFrame-frameIndex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayKey {
    pub chunk_index: u32,
    pub section_index: usize,
    pub sprite_frame: usize,
    pub frame_index: usize,
}

impl OverlayKey {
    pub fn new(chunk_index: u32, section_index: usize, sprite_frame: usize, frame_index: usize) -> Self {
        Self {
            chunk_index,
            section_index,
            sprite_frame,
            frame_index,
        }
    }

    /// Key for an incoming overlay image payload, given the chunk index the
    /// surrounding message carries.
    pub fn for_payload(chunk_index: u32, payload: &OverlayImagePayload) -> Self {
        Self {
            chunk_index,
            section_index: payload.section_index,
            sprite_frame: payload.matched_sprite_frame_number,
            frame_index: payload.frame_index,
        }
    }
}

impl std::fmt::Display for OverlayKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.chunk_index, self.section_index, self.sprite_frame, self.frame_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_wire_format() {
        let key = OverlayKey::new(0, 1, 53, 2);
        assert_eq!(key.to_string(), "0-1-53-2");
    }

    #[test]
    fn test_for_payload() {
        let payload = OverlayImagePayload {
            section_index: 3,
            matched_sprite_frame_number: 7,
            frame_index: 4,
            image_data: String::new(),
        };
        let key = OverlayKey::for_payload(2, &payload);
        assert_eq!(key, OverlayKey::new(2, 3, 7, 4));
    }
}
