//! Scripted playback simulation: a synthetic agent, one speech turn, and a
//! deterministic run of the engine with composited frames written to disk.

use std::io::Cursor;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::info;

use visage_core::{hash_frames, AgentDisplayConfig, FrameBuffer};
use visage_engine::{AvatarEngine, EngineEvent};
use visage_session::{Session, SessionCommand, SessionConfig, SessionEvent};
use visage_wire::{
    AnimationSet, AnimationSetPayload, AnimationTarget, AnimationTargetPayload, BaseFramePayload,
    BaseKind, OverlayFrame, OverlayFrameSpec, OverlayImagePayload, OverlayKey, OverlayMode,
    OverlaySection,
};

pub struct SimulateOptions {
    pub ticks: usize,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub write_frames: bool,
    pub fps: f64,
}

/// Number of overlay frames in the scripted speech turn.
const TURN_OVERLAY_FRAMES: usize = 6;
/// Base frame the scripted overlay starts on.
const TURN_START_FRAME: usize = 2;
/// Overlay patch size for the synthetic agent.
const OVERLAY_SIZE: u32 = 120;

pub fn parse_size(size: &str) -> Result<(u32, u32)> {
    let Some((width, height)) = size.split_once('x') else {
        bail!("size must be WIDTHxHEIGHT, got '{size}'");
    };
    let width = width.parse().with_context(|| format!("bad width in '{size}'"))?;
    let height = height.parse().with_context(|| format!("bad height in '{size}'"))?;
    Ok((width, height))
}

/// Transition points placed inside the synthetic idle range, overlay patch
/// centered on the canvas.
fn agent_config(canvas_width: u32, canvas_height: u32) -> AgentDisplayConfig {
    AgentDisplayConfig {
        pos_x: (canvas_width.saturating_sub(OVERLAY_SIZE) / 2) as i32,
        pos_y: (canvas_height.saturating_sub(OVERLAY_SIZE) / 2) as i32,
        width: OVERLAY_SIZE,
        height: OVERLAY_SIZE,
        transition_point_1: 10,
        transition_point_2: 25,
    }
}

/// A frame sequence of one hue with brightness sweeping across the frames,
/// so base motion is visible in the output.
fn synthetic_sequence(count: usize, rgb: [u8; 3]) -> Vec<FrameBuffer> {
    (0..count)
        .map(|i| {
            let level = 90 + ((i * 120) / count.max(1)) as u8;
            let scale = |c: u8| ((c as u16 * level as u16) / 255) as u8;
            FrameBuffer::solid(64, 64, [scale(rgb[0]), scale(rgb[1]), scale(rgb[2]), 255])
        })
        .collect()
}

fn overlay_image(frame_index: usize) -> FrameBuffer {
    let level = 140 + (frame_index * 18) as u8;
    FrameBuffer::solid(OVERLAY_SIZE, OVERLAY_SIZE, [level, 40, 40, 255])
}

/// The scripted speech turn as a validated domain record (direct mode).
fn speech_turn() -> AnimationSet {
    let frames = (0..TURN_OVERLAY_FRAMES)
        .map(|i| OverlayFrame {
            sprite_frame: TURN_START_FRAME + i,
            frame_index: i,
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
        chunk_index: 0,
        forced_set_id: None,
    }
}

/// The same speech turn as a raw wire payload (realtime mode).
fn speech_turn_payload() -> AnimationSetPayload {
    let frames = (0..TURN_OVERLAY_FRAMES)
        .map(|i| OverlayFrameSpec {
            matched_sprite_frame_number: TURN_START_FRAME + i,
            frame_index: i,
            matched_filename: None,
            sheet_filename: None,
            coordinates: None,
            mode: None,
        })
        .collect();
    AnimationSetPayload {
        data_array: vec![AnimationTargetPayload {
            sections: vec![frames],
            mode: Some("forward".to_string()),
            zone_top_left: None,
        }],
        chunk_index: 0,
        unique_set_id: None,
    }
}

fn write_frame(dir: &PathBuf, index: usize, frame: &FrameBuffer) -> Result<()> {
    let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
        .context("composited frame is not RGBA8")?;
    let path = dir.join(format!("frame_{index:04}.png"));
    image
        .save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn report_event(event: &EngineEvent, tick: usize) {
    match event {
        EngineEvent::AudioStart {
            set_id,
            chunk_index,
        } => println!("🔊 audio start at tick {tick} (set {set_id}, chunk {chunk_index})"),
        EngineEvent::IdleAnimationComplete => println!("✓ idle complete at tick {tick}"),
    }
}

/// Deterministic simulation: step the engine directly, one tick per frame.
pub fn run(options: SimulateOptions) -> Result<()> {
    println!(
        "🎬 Simulating {} ticks at {}x{}...",
        options.ticks, options.width, options.height
    );
    if options.write_frames {
        std::fs::create_dir_all(&options.output)
            .with_context(|| format!("creating {}", options.output.display()))?;
    }

    let config = agent_config(options.width, options.height);
    let mut engine = AvatarEngine::with_config(options.width, options.height, config);
    engine.replace_frame_sequence(BaseKind::Idle, synthetic_sequence(30, [60, 90, 220]));
    engine.replace_frame_sequence(BaseKind::Talking, synthetic_sequence(20, [60, 200, 90]));
    engine.replace_frame_sequence(BaseKind::Transition1, synthetic_sequence(6, [160, 160, 160]));
    engine.replace_frame_sequence(BaseKind::Transition2, synthetic_sequence(6, [110, 110, 110]));
    for i in 0..TURN_OVERLAY_FRAMES {
        let key = OverlayKey::new(0, 0, TURN_START_FRAME + i, i);
        engine.register_overlay_image(key, overlay_image(i));
    }
    engine.set_assets_loaded(true);
    engine.submit_animation_set(speech_turn());

    let mut frames = Vec::with_capacity(options.ticks);
    for tick in 0..options.ticks {
        let output = engine.tick();
        for event in &output.events {
            report_event(event, tick);
        }
        if options.write_frames {
            write_frame(&options.output, tick, &output.frame)?;
        }
        frames.push(output.frame);
    }

    if options.write_frames {
        println!(
            "✓ Wrote {} frames to {}",
            frames.len(),
            options.output.display()
        );
    }
    println!("   Run hash: {}", hash_frames(&frames));
    Ok(())
}

/// Wall-clock simulation through the session runtime: the same script is
/// pushed over the command channel as raw wire payloads and frames come
/// back on the event channel.
pub fn run_realtime(options: SimulateOptions) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    runtime.block_on(run_session(options))
}

async fn run_session(options: SimulateOptions) -> Result<()> {
    println!(
        "🎬 Simulating {} ticks at {}x{} ({} fps, realtime)...",
        options.ticks, options.width, options.height, options.fps
    );
    if options.write_frames {
        std::fs::create_dir_all(&options.output)
            .with_context(|| format!("creating {}", options.output.display()))?;
    }

    let (session, mut events) = Session::spawn(SessionConfig {
        canvas_width: options.width,
        canvas_height: options.height,
        fps: options.fps,
        emit_frames: true,
    });

    // The realtime path feeds the session the same way a socket would:
    // encoded images and raw payloads, decoded at the wire boundary.
    let sequences = [
        (BaseKind::Idle, synthetic_sequence(30, [60, 90, 220])),
        (BaseKind::Talking, synthetic_sequence(20, [60, 200, 90])),
        (BaseKind::Transition1, synthetic_sequence(6, [160, 160, 160])),
        (BaseKind::Transition2, synthetic_sequence(6, [110, 110, 110])),
    ];
    for (kind, frames) in sequences {
        for frame in frames {
            session
                .send(SessionCommand::AppendBaseFrame(BaseFramePayload {
                    animation_type: kind,
                    frame_data: encode_data_uri(&frame)?,
                }))
                .await?;
        }
    }
    for i in 0..TURN_OVERLAY_FRAMES {
        session
            .send(SessionCommand::RegisterOverlayImage {
                chunk_index: 0,
                payload: OverlayImagePayload {
                    section_index: 0,
                    matched_sprite_frame_number: TURN_START_FRAME + i,
                    frame_index: i,
                    image_data: encode_data_uri(&overlay_image(i))?,
                },
            })
            .await?;
    }
    session.send(SessionCommand::AssetsLoaded(true)).await?;
    session
        .send(SessionCommand::SubmitAnimationSet(speech_turn_payload()))
        .await?;

    let mut frames = Vec::with_capacity(options.ticks);
    while frames.len() < options.ticks {
        match events.recv().await {
            Some(SessionEvent::Frame(frame)) => {
                if options.write_frames {
                    write_frame(&options.output, frames.len(), &frame)?;
                }
                frames.push(frame);
            }
            Some(SessionEvent::AudioStart {
                set_id,
                chunk_index,
            }) => println!(
                "🔊 audio start near frame {} (set {set_id}, chunk {chunk_index})",
                frames.len()
            ),
            Some(SessionEvent::IdleAnimationComplete) => {
                println!("✓ idle complete near frame {}", frames.len())
            }
            None => bail!("session stopped before {} frames", options.ticks),
        }
    }
    session.shutdown().await.ok();
    info!(frames = frames.len(), "realtime run finished");

    if options.write_frames {
        println!(
            "✓ Wrote {} frames to {}",
            frames.len(),
            options.output.display()
        );
    }
    println!("   Run hash: {}", hash_frames(&frames));
    Ok(())
}

fn encode_data_uri(frame: &FrameBuffer) -> Result<String> {
    let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
        .context("frame buffer is not RGBA8")?;
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .context("encoding frame")?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("320x240").unwrap(), (320, 240));
        assert!(parse_size("320").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn test_direct_run_is_deterministic() {
        let options = || SimulateOptions {
            ticks: 48,
            output: PathBuf::from("unused"),
            width: 64,
            height: 64,
            write_frames: false,
            fps: 24.0,
        };
        // Two identical runs, hashed tick by tick.
        let run_frames = |options: SimulateOptions| {
            let config = agent_config(options.width, options.height);
            let mut engine = AvatarEngine::with_config(options.width, options.height, config);
            engine.replace_frame_sequence(BaseKind::Idle, synthetic_sequence(30, [60, 90, 220]));
            for i in 0..TURN_OVERLAY_FRAMES {
                let key = OverlayKey::new(0, 0, TURN_START_FRAME + i, i);
                engine.register_overlay_image(key, overlay_image(i));
            }
            engine.set_assets_loaded(true);
            engine.submit_animation_set(speech_turn());
            (0..options.ticks).map(|_| engine.tick().frame).collect::<Vec<_>>()
        };
        let a = run_frames(options());
        let b = run_frames(options());
        assert_eq!(hash_frames(&a), hash_frames(&b));
    }
}
