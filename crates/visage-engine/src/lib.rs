//! # visage-engine
//!
//! The talking-head playback engine: a frame-driven state machine that
//! composites streamed base animation frames and time-aligned overlay
//! (mouth/expression) sequences into one output frame per logical tick.
//!
//! The engine is single-threaded and cooperative. Producers (the session
//! layer) only enqueue data — animation sets, base frames, overlay images —
//! and [`AvatarEngine::tick`] drives every state transition. The one
//! exception is the confirmed-idle dequeue a submit may trigger, which only
//! ever starts a new set, never mutates one in flight.

pub mod engine;
pub mod overlay;
pub mod playback;
pub mod queue;
pub mod store;

pub use engine::{AvatarEngine, EngineEvent, TickOutput};
pub use overlay::{ActiveOverlay, OverlayAnimation, OverlayState};
pub use playback::{FrameDirection, PlaybackMode, PlaybackState, TransitionKind};
pub use queue::AnimationQueue;
pub use store::FrameStore;
