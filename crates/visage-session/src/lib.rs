//! # visage-session
//!
//! Single-threaded cooperative runtime for one avatar engine. The engine is
//! owned by a tokio task; producers talk to it exclusively through a command
//! channel, and composited frames and engine events flow back on an event
//! channel. No engine state is shared across threads.
//!
//! Frames are delivered non-blocking: when the consumer lags, frames are
//! dropped rather than stalling the tick loop. Control events (audio start,
//! idle completion) are never dropped.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use visage_core::{FrameBuffer, TickClock, VisageError, VisageResult, ENGINE_FPS};
use visage_engine::{AvatarEngine, EngineEvent};
use visage_wire::{
    decode_image_data, AgentConfigPayload, AnimationSetPayload, BaseFramePayload,
    OverlayImagePayload, OverlayKey,
};

const COMMAND_CHANNEL_CAPACITY: usize = 256;
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Everything a producer may ask of the session.
#[derive(Debug)]
pub enum SessionCommand {
    /// One speech chunk's animation set, straight off the socket.
    SubmitAnimationSet(AnimationSetPayload),
    /// One streamed base frame, appended to its sequence.
    AppendBaseFrame(BaseFramePayload),
    /// One streamed overlay frame image for the cache.
    RegisterOverlayImage {
        chunk_index: u32,
        payload: OverlayImagePayload,
    },
    /// A sprite sheet for fallback overlay drawing.
    RegisterSpriteSheet {
        filename: String,
        image_data: String,
    },
    /// Switch the active agent, discarding all session state.
    SetAgent(AgentConfigPayload),
    /// The asset loader's readiness signal.
    AssetsLoaded(bool),
    /// The user just sent a message; arm the idle acknowledgement window.
    UserInputSent,
    /// Stop the tick loop and drop the engine.
    Shutdown,
}

/// Events the session emits to its consumer.
#[derive(Debug)]
pub enum SessionEvent {
    /// A composited frame. Dropped, never awaited, when the consumer lags.
    Frame(FrameBuffer),
    /// Audio for this chunk should start playing now.
    AudioStart { set_id: u64, chunk_index: u32 },
    /// The engine settled into idle with nothing pending.
    IdleAnimationComplete,
}

/// Session construction parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Logical frames per second; non-positive falls back to the engine rate.
    pub fps: f64,
    /// Emit `SessionEvent::Frame` per tick. Off for headless consumers that
    /// only care about audio/idle events.
    pub emit_frames: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            canvas_width: 640,
            canvas_height: 480,
            fps: ENGINE_FPS,
            emit_frames: true,
        }
    }
}

/// Producer-side handle to a running session.
#[derive(Debug, Clone)]
pub struct Session {
    commands: mpsc::Sender<SessionCommand>,
}

impl Session {
    /// Spawn the session task. Returns the command handle and the event
    /// stream; the task stops when `Shutdown` arrives or the handle and all
    /// its clones are dropped.
    pub fn spawn(config: SessionConfig) -> (Session, mpsc::Receiver<SessionEvent>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let task = SessionTask {
            engine: AvatarEngine::new(config.canvas_width, config.canvas_height),
            clock: TickClock::new(config.fps, Instant::now()),
            emit_frames: config.emit_frames,
            commands: command_rx,
            events: event_tx,
        };
        let _handle: JoinHandle<()> = tokio::spawn(task.run());
        (Session { commands: command_tx }, event_rx)
    }

    /// Send a command to the session task.
    pub async fn send(&self, command: SessionCommand) -> VisageResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| VisageError::Other("session task has stopped".to_string()))
    }

    /// Ask the session task to stop.
    pub async fn shutdown(&self) -> VisageResult<()> {
        self.send(SessionCommand::Shutdown).await
    }
}

struct SessionTask {
    engine: AvatarEngine,
    clock: TickClock,
    emit_frames: bool,
    commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::Sender<SessionEvent>,
}

impl SessionTask {
    async fn run(mut self) {
        info!(frame_duration = ?self.clock.frame_duration(), "session started");
        // Poll well inside the frame duration so a tick is never late by
        // more than a quarter frame; the clock's remainder carry absorbs
        // the rest.
        let mut poll = tokio::time::interval(self.clock.frame_duration() / 4);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(SessionCommand::Shutdown) | None => {
                            info!("session stopping");
                            break;
                        }
                        Some(command) => self.handle_command(command),
                    }
                }
                _ = poll.tick() => {
                    if self.clock.should_step(Instant::now()) && !self.step().await {
                        break;
                    }
                }
            }
        }
    }

    /// One engine tick. Returns false when the event consumer is gone.
    async fn step(&mut self) -> bool {
        let output = self.engine.tick();

        for event in output.events {
            let event = match event {
                EngineEvent::AudioStart {
                    set_id,
                    chunk_index,
                } => SessionEvent::AudioStart {
                    set_id,
                    chunk_index,
                },
                EngineEvent::IdleAnimationComplete => SessionEvent::IdleAnimationComplete,
            };
            if self.events.send(event).await.is_err() {
                debug!("event consumer gone; stopping session");
                return false;
            }
        }

        if self.emit_frames {
            if let Err(mpsc::error::TrySendError::Full(_)) =
                self.events.try_send(SessionEvent::Frame(output.frame))
            {
                debug!("event consumer lagging; dropped frame");
            }
        }
        true
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SubmitAnimationSet(payload) => {
                self.engine.submit_animation_payload(&payload);
            }
            SessionCommand::AppendBaseFrame(payload) => {
                match decode_image_data(&payload.frame_data) {
                    Ok(frame) => self.engine.append_base_frame(payload.animation_type, frame),
                    Err(err) => warn!(%err, kind = %payload.animation_type, "dropped undecodable base frame"),
                }
            }
            SessionCommand::RegisterOverlayImage {
                chunk_index,
                payload,
            } => match decode_image_data(&payload.image_data) {
                Ok(image) => {
                    let key = OverlayKey::for_payload(chunk_index, &payload);
                    self.engine.register_overlay_image(key, image);
                }
                Err(err) => warn!(%err, "dropped undecodable overlay image"),
            },
            SessionCommand::RegisterSpriteSheet {
                filename,
                image_data,
            } => match decode_image_data(&image_data) {
                Ok(image) => {
                    self.engine.set_draw_overlay_sprites(true);
                    self.engine.register_sprite_sheet(filename, image);
                }
                Err(err) => warn!(%err, %filename, "dropped undecodable sprite sheet"),
            },
            SessionCommand::SetAgent(payload) => {
                self.engine.set_agent(payload.resolve());
            }
            SessionCommand::AssetsLoaded(loaded) => {
                self.engine.set_assets_loaded(loaded);
            }
            SessionCommand::UserInputSent => {
                self.engine.mark_user_input_sent();
            }
            SessionCommand::Shutdown => unreachable!("handled by the select loop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use base64::Engine as _;
    use visage_wire::{AnimationTargetPayload, BaseKind, OverlayFrameSpec};

    fn png_data_uri(rgba: [u8; 4]) -> String {
        let image = image::RgbaImage::from_pixel(8, 8, image::Rgba(rgba));
        let mut bytes = Vec::new();
        image
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        )
    }

    fn base_frame(kind: BaseKind) -> SessionCommand {
        SessionCommand::AppendBaseFrame(BaseFramePayload {
            animation_type: kind,
            frame_data: png_data_uri([10, 10, 10, 255]),
        })
    }

    fn animation_set(sprite_frame: usize, chunk_index: u32) -> SessionCommand {
        SessionCommand::SubmitAnimationSet(AnimationSetPayload {
            data_array: vec![AnimationTargetPayload {
                sections: vec![vec![OverlayFrameSpec {
                    matched_sprite_frame_number: sprite_frame,
                    frame_index: 0,
                    matched_filename: None,
                    sheet_filename: None,
                    coordinates: None,
                    mode: None,
                }]],
                mode: Some("forward".to_string()),
                zone_top_left: None,
            }],
            chunk_index,
            unique_set_id: None,
        })
    }

    fn fast_config() -> SessionConfig {
        SessionConfig {
            canvas_width: 16,
            canvas_height: 16,
            fps: 240.0,
            emit_frames: true,
        }
    }

    async fn recv_until<F>(
        events: &mut mpsc::Receiver<SessionEvent>,
        mut matches: F,
    ) -> Option<SessionEvent>
    where
        F: FnMut(&SessionEvent) -> bool,
    {
        let deadline = Duration::from_secs(5);
        tokio::time::timeout(deadline, async {
            while let Some(event) = events.recv().await {
                if matches(&event) {
                    return Some(event);
                }
            }
            None
        })
        .await
        .ok()
        .flatten()
    }

    #[tokio::test]
    async fn test_session_emits_frames_once_assets_load() {
        let (session, mut events) = Session::spawn(fast_config());
        session.send(base_frame(BaseKind::Idle)).await.unwrap();
        session
            .send(SessionCommand::AssetsLoaded(true))
            .await
            .unwrap();

        let frame = recv_until(&mut events, |e| matches!(e, SessionEvent::Frame(_))).await;
        match frame {
            Some(SessionEvent::Frame(frame)) => {
                assert_eq!(frame.width, 16);
                assert_eq!(frame.height, 16);
            }
            other => panic!("expected a frame event, got {other:?}"),
        }
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_completion_reaches_consumer() {
        let (session, mut events) = Session::spawn(fast_config());
        session.send(base_frame(BaseKind::Idle)).await.unwrap();
        session
            .send(SessionCommand::AssetsLoaded(true))
            .await
            .unwrap();

        let event = recv_until(&mut events, |e| {
            matches!(e, SessionEvent::IdleAnimationComplete)
        })
        .await;
        assert!(event.is_some());
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_audio_start_for_submitted_set() {
        let (session, mut events) = Session::spawn(fast_config());
        session.send(base_frame(BaseKind::Idle)).await.unwrap();
        session
            .send(SessionCommand::AssetsLoaded(true))
            .await
            .unwrap();
        // A non-opening chunk fires audio on its first drawn frame, so the
        // single-frame overlay is enough.
        session.send(animation_set(0, 1)).await.unwrap();

        let event = recv_until(&mut events, |e| {
            matches!(e, SessionEvent::AudioStart { .. })
        })
        .await;
        match event {
            Some(SessionEvent::AudioStart { chunk_index, .. }) => assert_eq!(chunk_index, 1),
            other => panic!("expected audio start, got {other:?}"),
        }
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_event_stream() {
        let (session, mut events) = Session::spawn(fast_config());
        session.shutdown().await.unwrap();
        let deadline = Duration::from_secs(5);
        let closed = tokio::time::timeout(deadline, async {
            while events.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok());
    }
}
