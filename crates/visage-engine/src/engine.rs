use std::cmp::Ordering;

use tracing::{debug, warn};
use visage_core::{AgentDisplayConfig, FrameBuffer, PixelFormat};
use visage_wire::{
    validate_animation_set, AnimationSet, AnimationSetPayload, BaseKind, OverlayFrame, OverlayKey,
};

use crate::overlay::{build_overlays, ActiveOverlay, OverlayAnimation};
use crate::playback::{
    nearest_transition_point, FrameDirection, PlaybackMode, PlaybackState, TransitionKind,
};
use crate::queue::AnimationQueue;
use crate::store::FrameStore;

/// Side effects the engine emits during a tick, delivered to the session
/// layer instead of invoked as callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// An overlay reached its audio-start point: playback of the chunk's
    /// audio should begin now.
    AudioStart { set_id: u64, chunk_index: u32 },
    /// The engine is idle with nothing queued and nothing playing. Fires at
    /// most once per idle cycle.
    IdleAnimationComplete,
}

/// The result of one logical tick: the composited frame plus any events.
#[derive(Debug)]
pub struct TickOutput {
    pub frame: FrameBuffer,
    pub events: Vec<EngineEvent>,
}

/// The talking-head playback engine.
///
/// Owns the frame store, the animation queue, the active overlay list, and
/// the global playback state. One instance per video session; reset via
/// [`AvatarEngine::set_agent`] when the active agent changes.
#[derive(Debug)]
pub struct AvatarEngine {
    canvas_width: u32,
    canvas_height: u32,
    config: AgentDisplayConfig,
    store: FrameStore,
    queue: AnimationQueue,
    playback: PlaybackState,
    overlays: Vec<ActiveOverlay>,
    assets_loaded: bool,
    /// Draw overlays from sprite sheets instead of streamed images.
    draw_overlay_sprites: bool,
}

impl AvatarEngine {
    /// Create an engine with the default agent configuration.
    pub fn new(canvas_width: u32, canvas_height: u32) -> Self {
        Self::with_config(canvas_width, canvas_height, AgentDisplayConfig::default())
    }

    pub fn with_config(canvas_width: u32, canvas_height: u32, config: AgentDisplayConfig) -> Self {
        Self {
            canvas_width,
            canvas_height,
            config,
            store: FrameStore::new(),
            queue: AnimationQueue::new(),
            playback: PlaybackState::new(),
            overlays: Vec::new(),
            assets_loaded: false,
            draw_overlay_sprites: false,
        }
    }

    /// Switch the active agent: atomically discard all frames, caches,
    /// queued and active sets, and reset playback to idle/frame-0. The
    /// loader must re-signal asset readiness for the new agent.
    pub fn set_agent(&mut self, config: AgentDisplayConfig) {
        debug!("agent switch: discarding session state");
        self.config = config;
        self.store.clear();
        self.queue.clear();
        self.overlays.clear();
        self.playback.reset();
        self.assets_loaded = false;
    }

    /// Signal that the loader has enough assets for playback. Turning this
    /// on attempts a dequeue immediately if nothing is in flight.
    pub fn set_assets_loaded(&mut self, loaded: bool) {
        self.assets_loaded = loaded;
        if loaded && !self.playback.is_set_playing {
            self.process_next_animation_set();
        }
    }

    /// Submit an incoming animation set payload from the socket. Malformed
    /// payloads are dropped with a diagnostic and never reach the queue.
    pub fn submit_animation_payload(&mut self, payload: &AnimationSetPayload) -> Option<u64> {
        match validate_animation_set(payload) {
            Ok(set) => Some(self.submit_animation_set(set)),
            Err(err) => {
                warn!(%err, "discarding malformed animation set");
                self.note_discarded_set();
                None
            }
        }
    }

    /// Enqueue a validated animation set, returning its assigned id. When
    /// the engine is confirmed idle with assets loaded and no set in
    /// flight, the set starts on this call rather than waiting for a tick.
    pub fn submit_animation_set(&mut self, set: AnimationSet) -> u64 {
        let chunk_index = set.chunk_index;
        let set_id = self.queue.enqueue(set);
        debug!(
            set_id,
            chunk_index,
            queued = self.queue.len(),
            "enqueued animation set"
        );
        if self.assets_loaded
            && !self.playback.is_set_playing
            && self.playback.mode == PlaybackMode::Idle
        {
            self.process_next_animation_set();
        }
        set_id
    }

    /// Replace a base frame sequence wholesale.
    pub fn replace_frame_sequence(&mut self, kind: BaseKind, frames: Vec<FrameBuffer>) {
        self.store.set_frames(kind, frames);
    }

    /// Append one streamed base frame.
    pub fn append_base_frame(&mut self, kind: BaseKind, frame: FrameBuffer) {
        self.store.append_frame(kind, frame);
    }

    /// Cache one streamed overlay frame image.
    pub fn register_overlay_image(&mut self, key: OverlayKey, image: FrameBuffer) {
        self.store.cache_overlay_image(key, image);
    }

    /// Register a sprite sheet for fallback drawing.
    pub fn register_sprite_sheet(&mut self, filename: impl Into<String>, image: FrameBuffer) {
        self.store.register_sprite_sheet(filename, image);
    }

    /// Arm the idle user-input window: bouncing narrows to the window and
    /// catches up at double speed until an overlay starts.
    pub fn mark_user_input_sent(&mut self) {
        debug!(
            frame = self.playback.frame_index,
            mode = %self.playback.mode,
            "user input sent; arming idle window"
        );
        self.playback.user_input_active = true;
    }

    /// Enable/disable fallback sprite-sheet drawing of overlays.
    pub fn set_draw_overlay_sprites(&mut self, enabled: bool) {
        self.draw_overlay_sprites = enabled;
    }

    // Introspection used by the session layer and tests.

    pub fn mode(&self) -> PlaybackMode {
        self.playback.mode
    }

    pub fn frame_cursor(&self) -> usize {
        self.playback.frame_index
    }

    pub fn direction(&self) -> FrameDirection {
        self.playback.direction
    }

    pub fn queued_sets(&self) -> usize {
        self.queue.len()
    }

    pub fn active_overlays(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_set_playing(&self) -> bool {
        self.playback.is_set_playing
    }

    pub fn is_user_input_active(&self) -> bool {
        self.playback.user_input_active
    }

    pub fn is_assets_loaded(&self) -> bool {
        self.assets_loaded
    }

    pub fn config(&self) -> &AgentDisplayConfig {
        &self.config
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    /// Advance the engine by one logical frame and composite the output.
    pub fn tick(&mut self) -> TickOutput {
        let mut events = Vec::new();

        // 1) Choose the base sequence for this tick. The choice is a
        // snapshot: a concurrent replacement lands on the next tick.
        let kind = self.active_base_kind();
        let sequence = self.store.sequence(kind);
        let frames_count = sequence.len();

        // 2) Draw the base frame, scaled onto the canvas.
        let mut frame = FrameBuffer::new(self.canvas_width, self.canvas_height, PixelFormat::Rgba8);
        if let Some(base) = sequence.get(self.playback.frame_index) {
            let scaled = base.resized(self.canvas_width, self.canvas_height);
            frame.composite_over(&scaled, 0, 0);
        }

        // 3) Start, draw, and advance overlays.
        self.drive_overlays(&mut frame, &mut events);

        // 4) Prune completed overlays; finish the set when it drains.
        self.prune_overlays();

        // 5) Ping-pong / transition stepping.
        self.step_modes(frames_count, &mut events);

        TickOutput { frame, events }
    }

    /// The frame sequence the current mode reads from. Talking falls back
    /// to the idle sequence when no talking frames have streamed in yet.
    fn active_base_kind(&self) -> BaseKind {
        match self.playback.mode {
            PlaybackMode::Talking if self.store.len(BaseKind::Talking) > 0 => BaseKind::Talking,
            PlaybackMode::Transition => match self.playback.chosen_transition {
                Some((_, kind)) => kind.base_kind(),
                None => BaseKind::Idle,
            },
            _ => BaseKind::Idle,
        }
    }

    fn drive_overlays(&mut self, frame: &mut FrameBuffer, events: &mut Vec<EngineEvent>) {
        let cursor = self.playback.frame_index;
        let direction = self.playback.direction;

        for active in self.overlays.iter_mut() {
            if active.state.done {
                continue;
            }

            if active.should_start(cursor, direction) {
                active.state.playing = true;
                active.state.current_drawing_frame = 0;
                debug!(
                    chunk = active.anim.chunk_index,
                    section = active.anim.section_index,
                    "overlay start"
                );
                self.playback.mode = PlaybackMode::Talking;
                if self.playback.user_input_active {
                    self.playback.user_input_active = false;
                    debug!("leaving user-input window: overlay started");
                }
            }

            if active.state.playing {
                let idx = active.state.current_drawing_frame;
                if let Some(spec) = active.anim.frames.get(idx) {
                    draw_overlay_frame(
                        &self.store,
                        &self.config,
                        self.draw_overlay_sprites,
                        frame,
                        &active.anim,
                        spec,
                    );

                    if active.audio_due() {
                        active.state.audio_started = true;
                        events.push(EngineEvent::AudioStart {
                            set_id: active.anim.set_id,
                            chunk_index: active.anim.chunk_index,
                        });
                    }

                    active.state.current_drawing_frame += 1;
                    if active.state.current_drawing_frame >= active.anim.frames.len() {
                        active.state.playing = false;
                        active.state.done = true;
                        debug!(
                            chunk = active.anim.chunk_index,
                            section = active.anim.section_index,
                            "overlay complete"
                        );
                    }
                }
            }
        }
    }

    fn prune_overlays(&mut self) {
        let before = self.overlays.len();
        self.overlays.retain(|overlay| !overlay.state.done);
        if self.overlays.len() != before {
            debug!(remaining = self.overlays.len(), "pruned completed overlays");
        }

        if self.overlays.is_empty() && self.playback.is_set_playing {
            debug!("all overlays done for current set");
            self.playback.is_set_playing = false;
            if !self.queue.is_empty() {
                self.process_next_animation_set();
            } else {
                self.playback.should_return_to_frame = true;
            }
        }
    }

    fn step_modes(&mut self, frames_count: usize, events: &mut Vec<EngineEvent>) {
        match self.playback.mode {
            PlaybackMode::Talking if self.playback.should_return_to_frame => {
                if self.playback.chosen_transition.is_none() {
                    let chosen = nearest_transition_point(self.playback.frame_index, &self.config);
                    debug!(point = chosen.0, kind = ?chosen.1, "overlays drained; seeking transition point");
                    self.playback.chosen_transition = Some(chosen);
                }
                if let Some((point, kind)) = self.playback.chosen_transition {
                    self.seek_transition_point(point, kind);
                }
            }
            PlaybackMode::Transition => self.step_transition(),
            PlaybackMode::Idle => {
                self.playback.step_idle(frames_count);
                if self.queue.is_empty()
                    && self.overlays.is_empty()
                    && !self.playback.idle_completion_fired
                {
                    self.playback.idle_completion_fired = true;
                    debug!("idle with no pending animations");
                    events.push(EngineEvent::IdleAnimationComplete);
                }
            }
            PlaybackMode::Talking => self.playback.step_full(frames_count),
        }
    }

    /// Walk the cursor one frame per tick toward the chosen transition
    /// point; on arrival switch into the transition sequence (or straight
    /// to idle when that sequence has no frames).
    fn seek_transition_point(&mut self, point: usize, kind: TransitionKind) {
        match self.playback.frame_index.cmp(&point) {
            Ordering::Greater => self.playback.frame_index -= 1,
            Ordering::Less => self.playback.frame_index += 1,
            Ordering::Equal => {
                self.playback.should_return_to_frame = false;
                if self.store.len(kind.base_kind()) > 0 {
                    debug!(kind = ?kind, "reached transition point");
                    self.playback.mode = PlaybackMode::Transition;
                    self.playback.frame_index = 0;
                    self.playback.direction = FrameDirection::Forward;
                } else {
                    debug!(kind = ?kind, "transition sequence empty; back to idle");
                    self.playback.mode = PlaybackMode::Idle;
                    self.playback.frame_index = 0;
                    self.playback.chosen_transition = None;
                }
                if !self.queue.is_empty() {
                    self.process_next_animation_set();
                }
            }
        }
    }

    fn step_transition(&mut self) {
        let kind = self
            .playback
            .chosen_transition
            .map(|(_, kind)| kind.base_kind())
            .unwrap_or(BaseKind::Transition1);
        let count = self.store.len(kind);
        if self.playback.frame_index + 1 < count {
            self.playback.frame_index += 1;
        } else {
            debug!("transition complete; idle at frame 0");
            self.playback.mode = PlaybackMode::Idle;
            self.playback.frame_index = 0;
            self.playback.direction = FrameDirection::Forward;
            self.playback.chosen_transition = None;
            if !self.queue.is_empty() {
                self.process_next_animation_set();
            }
        }
    }

    /// Dequeue the head set and replace the active overlay list wholesale.
    /// Invoked only when no set is in flight.
    fn process_next_animation_set(&mut self) {
        if !self.assets_loaded {
            debug!("not dequeuing: assets not loaded");
            return;
        }
        if self.playback.is_set_playing {
            return;
        }
        let Some(queued) = self.queue.pop() else {
            return;
        };
        self.playback.is_set_playing = true;

        let set = queued.set;
        let set_id = queued.set_id;
        debug!(set_id, chunk = set.chunk_index, "dequeued animation set");

        // A fresh speech turn arriving while the previous one is still
        // finishing: realign the base cursor to a known origin.
        if self.playback.mode == PlaybackMode::Talking && set.chunk_index == 0 {
            debug!("fresh chunk while talking; jumping cursor to frame 0");
            self.playback.frame_index = 0;
        }

        let overlays = build_overlays(&set, set_id);
        if overlays.is_empty() {
            warn!(set_id, "animation set has no playable sections; discarded");
            self.playback.is_set_playing = false;
            self.note_discarded_set();
            return;
        }

        self.overlays = overlays;
        self.playback.idle_completion_fired = false;
    }

    /// After dropping a set: with nothing queued, nothing playing, and the
    /// drawing loop not mid-transition, settle back into idle.
    fn note_discarded_set(&mut self) {
        if self.queue.is_empty()
            && !self.playback.is_set_playing
            && self.overlays.is_empty()
            && self.playback.mode != PlaybackMode::Transition
        {
            self.playback.mode = PlaybackMode::Idle;
        }
    }
}

/// Draw one overlay frame onto the canvas. Streamed-image mode looks the
/// frame up in the cache and silently skips when it has not arrived yet;
/// sprite mode crops the sheet by the frame's coordinates.
fn draw_overlay_frame(
    store: &FrameStore,
    config: &AgentDisplayConfig,
    draw_sprites: bool,
    frame: &mut FrameBuffer,
    anim: &OverlayAnimation,
    spec: &OverlayFrame,
) {
    if !draw_sprites {
        let key = OverlayKey::new(
            anim.chunk_index,
            anim.section_index,
            spec.sprite_frame,
            spec.frame_index,
        );
        match store.overlay_image(&key) {
            Some(image) => frame.composite_feathered(&image, config.pos_x, config.pos_y),
            None => debug!(%key, "overlay image not ready; skipping draw"),
        }
        return;
    }

    if let (Some(sheet_name), Some([sx, sy, sw, sh])) =
        (spec.sheet_filename.as_deref(), spec.coordinates)
    {
        if let Some(sheet) = store.sprite_sheet(sheet_name) {
            let sprite = sheet.cropped(sx, sy, sw, sh);
            // A missing zone pushes the sprite off-canvas rather than
            // guessing a draw origin.
            let [dx, dy] = anim.zone_top_left.unwrap_or([9999, 9999]);
            frame.composite_feathered(&sprite, dx, dy);
        } else {
            debug!(sheet = %sheet_name, "sprite sheet not found; skipping draw");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visage_core::PixelFormat;
    use visage_wire::{AnimationTarget, AnimationTargetPayload, OverlayMode, OverlaySection};

    fn frames(n: usize) -> Vec<FrameBuffer> {
        (0..n)
            .map(|_| FrameBuffer::new(4, 4, PixelFormat::Rgba8))
            .collect()
    }

    fn set_targeting(sprite_frames: &[usize], chunk_index: u32) -> AnimationSet {
        let frames = sprite_frames
            .iter()
            .enumerate()
            .map(|(frame_index, sprite_frame)| OverlayFrame {
                sprite_frame: *sprite_frame,
                frame_index,
                matched_filename: None,
                sheet_filename: None,
                coordinates: None,
                mode: OverlayMode::Forward,
            })
            .collect();
        AnimationSet {
            target: AnimationTarget {
                sections: vec![OverlaySection { frames }],
                zone_top_left: None,
            },
            chunk_index,
            forced_set_id: None,
        }
    }

    fn ready_engine(idle_frames: usize) -> AvatarEngine {
        let mut engine = AvatarEngine::new(64, 64);
        engine.replace_frame_sequence(BaseKind::Idle, frames(idle_frames));
        engine.set_assets_loaded(true);
        engine
    }

    #[test]
    fn test_submit_starts_immediately_when_idle() {
        let mut engine = ready_engine(5);
        engine.submit_animation_set(set_targeting(&[0, 1], 0));
        assert!(engine.is_set_playing());
        assert_eq!(engine.active_overlays(), 1);
        assert_eq!(engine.queued_sets(), 0);
    }

    #[test]
    fn test_submit_queues_until_assets_loaded() {
        let mut engine = AvatarEngine::new(64, 64);
        engine.replace_frame_sequence(BaseKind::Idle, frames(5));
        engine.submit_animation_set(set_targeting(&[0], 0));
        assert!(!engine.is_set_playing());
        assert_eq!(engine.queued_sets(), 1);

        engine.set_assets_loaded(true);
        assert!(engine.is_set_playing());
        assert_eq!(engine.queued_sets(), 0);
    }

    #[test]
    fn test_malformed_payload_is_dropped() {
        let mut engine = ready_engine(5);
        let payload = AnimationSetPayload {
            data_array: vec![AnimationTargetPayload {
                sections: vec![],
                mode: None,
                zone_top_left: None,
            }],
            chunk_index: 0,
            unique_set_id: None,
        };
        assert!(engine.submit_animation_payload(&payload).is_none());
        assert_eq!(engine.queued_sets(), 0);
        assert!(!engine.is_set_playing());
        assert_eq!(engine.mode(), PlaybackMode::Idle);
    }

    #[test]
    fn test_agent_switch_resets_session() {
        let mut engine = ready_engine(5);
        engine.submit_animation_set(set_targeting(&[0, 1], 0));
        engine.tick();
        assert!(engine.is_set_playing());

        engine.set_agent(AgentDisplayConfig::default());
        assert!(!engine.is_set_playing());
        assert!(!engine.is_assets_loaded());
        assert_eq!(engine.active_overlays(), 0);
        assert_eq!(engine.queued_sets(), 0);
        assert_eq!(engine.mode(), PlaybackMode::Idle);
        assert_eq!(engine.frame_cursor(), 0);
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_tick_output_matches_canvas_size() {
        let mut engine = ready_engine(3);
        let out = engine.tick();
        assert_eq!(out.frame.width, 64);
        assert_eq!(out.frame.height, 64);
    }

    #[test]
    fn test_idle_completion_fires_once() {
        let mut engine = ready_engine(4);
        let mut completions = 0;
        for _ in 0..10 {
            let out = engine.tick();
            completions += out
                .events
                .iter()
                .filter(|e| **e == EngineEvent::IdleAnimationComplete)
                .count();
        }
        assert_eq!(completions, 1);
    }
}
