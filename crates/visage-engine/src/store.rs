use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use visage_core::FrameBuffer;
use visage_wire::{BaseKind, OverlayKey};

/// An immutable, shareable frame sequence. Replacement swaps the outer `Arc`
/// wholesale, so a tick that already selected a sequence keeps reading a
/// consistent snapshot while new frames land.
pub type FrameSequence = Arc<Vec<Arc<FrameBuffer>>>;

/// Alternative file extensions tried when a sprite sheet is looked up under
/// a name that is not registered exactly.
const SHEET_EXTENSIONS: [&str; 2] = ["webp", "png"];

/// Holds the four base frame sequences, the streamed overlay-image cache,
/// and the sprite sheets for fallback drawing.
///
/// All contents are populated incrementally by the session layer and
/// discarded wholesale when the active agent changes.
#[derive(Debug, Default)]
pub struct FrameStore {
    sequences: [FrameSequence; 4],
    overlay_images: HashMap<OverlayKey, Arc<FrameBuffer>>,
    sprite_sheets: HashMap<String, Arc<FrameBuffer>>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a sequence wholesale. No partial merge.
    pub fn set_frames(&mut self, kind: BaseKind, frames: Vec<FrameBuffer>) {
        let frames: Vec<Arc<FrameBuffer>> = frames.into_iter().map(Arc::new).collect();
        debug!(%kind, count = frames.len(), "replaced frame sequence");
        self.sequences[kind.index()] = Arc::new(frames);
    }

    /// Append one streamed frame to a sequence. Existing readers keep their
    /// snapshot; the store publishes a new sequence with the frame added.
    pub fn append_frame(&mut self, kind: BaseKind, frame: FrameBuffer) {
        let seq = &mut self.sequences[kind.index()];
        let mut frames: Vec<Arc<FrameBuffer>> = seq.as_ref().clone();
        frames.push(Arc::new(frame));
        *seq = Arc::new(frames);
    }

    /// Snapshot of the current sequence for a kind. A missing sequence is
    /// an empty one, never an error.
    pub fn sequence(&self, kind: BaseKind) -> FrameSequence {
        self.sequences[kind.index()].clone()
    }

    /// Number of frames currently in a sequence.
    pub fn len(&self, kind: BaseKind) -> usize {
        self.sequences[kind.index()].len()
    }

    /// True when every sequence is empty.
    pub fn is_empty(&self) -> bool {
        BaseKind::ALL.iter().all(|kind| self.len(*kind) == 0)
    }

    /// Insert an overlay frame image. A later insert for the same key
    /// overwrites — a correction, not an error.
    pub fn cache_overlay_image(&mut self, key: OverlayKey, image: FrameBuffer) {
        debug!(%key, "cached overlay image");
        self.overlay_images.insert(key, Arc::new(image));
    }

    /// Look up an overlay frame image. Absent and still-loading are the same
    /// answer: the caller skips drawing for this tick.
    pub fn overlay_image(&self, key: &OverlayKey) -> Option<Arc<FrameBuffer>> {
        self.overlay_images.get(key).cloned()
    }

    /// Register a sprite sheet for fallback drawing.
    pub fn register_sprite_sheet(&mut self, filename: impl Into<String>, image: FrameBuffer) {
        let filename = filename.into();
        debug!(%filename, "registered sprite sheet");
        self.sprite_sheets.insert(filename, Arc::new(image));
    }

    /// Look up a sprite sheet, retrying known extensions when the exact
    /// name is not registered.
    pub fn sprite_sheet(&self, filename: &str) -> Option<Arc<FrameBuffer>> {
        if let Some(sheet) = self.sprite_sheets.get(filename) {
            return Some(sheet.clone());
        }
        let base = filename
            .rsplit_once('.')
            .map(|(base, _)| base)
            .unwrap_or(filename);
        for ext in SHEET_EXTENSIONS {
            let candidate = format!("{base}.{ext}");
            if let Some(sheet) = self.sprite_sheets.get(&candidate) {
                debug!(requested = %filename, found = %candidate, "sprite sheet found under alternative extension");
                return Some(sheet.clone());
            }
        }
        None
    }

    /// Discard everything. Used when the active agent switches; no partial
    /// agent state may survive.
    pub fn clear(&mut self) {
        self.sequences = Default::default();
        self.overlay_images.clear();
        self.sprite_sheets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visage_core::PixelFormat;

    fn frame() -> FrameBuffer {
        FrameBuffer::new(2, 2, PixelFormat::Rgba8)
    }

    #[test]
    fn test_missing_sequence_is_empty() {
        let store = FrameStore::new();
        assert_eq!(store.len(BaseKind::Idle), 0);
        assert!(store.sequence(BaseKind::Transition2).is_empty());
    }

    #[test]
    fn test_set_frames_replaces_wholesale() {
        let mut store = FrameStore::new();
        store.set_frames(BaseKind::Idle, vec![frame(), frame(), frame()]);
        assert_eq!(store.len(BaseKind::Idle), 3);
        store.set_frames(BaseKind::Idle, vec![frame()]);
        assert_eq!(store.len(BaseKind::Idle), 1);
    }

    #[test]
    fn test_append_does_not_disturb_existing_snapshot() {
        let mut store = FrameStore::new();
        store.set_frames(BaseKind::Talking, vec![frame()]);
        let snapshot = store.sequence(BaseKind::Talking);
        store.append_frame(BaseKind::Talking, frame());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(BaseKind::Talking), 2);
    }

    #[test]
    fn test_overlay_cache_insert_overwrites() {
        let mut store = FrameStore::new();
        let key = OverlayKey::new(0, 0, 5, 1);
        store.cache_overlay_image(key, FrameBuffer::solid(1, 1, [1, 1, 1, 255]));
        store.cache_overlay_image(key, FrameBuffer::solid(1, 1, [9, 9, 9, 255]));
        let image = store.overlay_image(&key).unwrap();
        assert_eq!(image.get_pixel(0, 0), Some([9, 9, 9, 255]));
    }

    #[test]
    fn test_overlay_cache_absent_is_none() {
        let store = FrameStore::new();
        assert!(store.overlay_image(&OverlayKey::new(0, 0, 0, 0)).is_none());
    }

    #[test]
    fn test_sprite_sheet_extension_fallback() {
        let mut store = FrameStore::new();
        store.register_sprite_sheet("sheet_01.png", frame());
        assert!(store.sprite_sheet("sheet_01.png").is_some());
        assert!(store.sprite_sheet("sheet_01.webp").is_some());
        assert!(store.sprite_sheet("sheet_01").is_some());
        assert!(store.sprite_sheet("sheet_02.png").is_none());
    }

    #[test]
    fn test_clear_discards_everything() {
        let mut store = FrameStore::new();
        store.set_frames(BaseKind::Idle, vec![frame()]);
        store.cache_overlay_image(OverlayKey::new(0, 0, 1, 0), frame());
        store.register_sprite_sheet("sheet.webp", frame());
        store.clear();
        assert!(store.is_empty());
        assert!(store.overlay_image(&OverlayKey::new(0, 0, 1, 0)).is_none());
        assert!(store.sprite_sheet("sheet.webp").is_none());
    }
}
