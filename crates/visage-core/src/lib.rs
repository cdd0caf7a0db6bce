//! # visage-core
//!
//! Core types and primitives for the Visage avatar animation engine.
//! This crate contains foundational types shared across all Visage crates:
//! frame buffers, compositing, the logical tick clock, agent display
//! configuration, and error types.

pub mod config;
pub mod error;
pub mod frame;
pub mod hash;
pub mod time;

pub use config::AgentDisplayConfig;
pub use error::{VisageError, VisageResult};
pub use frame::{FrameBuffer, PixelFormat};
pub use hash::{hash_frame, hash_frames, ContentHash};
pub use time::{TickClock, ENGINE_FPS};
