//! # visage-wire
//!
//! The network boundary of the Visage engine: serde records for the socket
//! payload shapes, validation into typed animation records, overlay cache
//! keys, and decoding of streamed frame images.
//!
//! The engine never sees a raw payload — everything crossing this boundary
//! is parsed and validated here, and records with missing required fields
//! are rejected (the session layer drops them with a diagnostic).

pub mod decode;
pub mod key;
pub mod model;
pub mod payload;
pub mod validate;

pub use decode::decode_image_data;
pub use key::OverlayKey;
pub use model::{AnimationSet, AnimationTarget, BaseKind, OverlayFrame, OverlayMode, OverlaySection};
pub use payload::{
    AgentConfigPayload, AnimationSetPayload, AnimationTargetPayload, BaseFramePayload,
    OverlayFrameSpec, OverlayImagePayload,
};
pub use validate::validate_animation_set;
