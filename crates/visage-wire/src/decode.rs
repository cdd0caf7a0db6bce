//! Decoding of streamed frame images into RGBA buffers.
//!
//! Frame payloads carry base64 image data, either bare or as a full
//! `data:image/...;base64,` URI. The codec (JPEG, PNG, WebP) is sniffed from
//! the decoded bytes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use visage_core::{FrameBuffer, VisageError, VisageResult};

/// Decode a base64 (or data-URI) image payload into an RGBA frame buffer.
pub fn decode_image_data(data: &str) -> VisageResult<FrameBuffer> {
    let encoded = strip_data_uri(data);
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| VisageError::Decode(format!("invalid base64 image data: {e}")))?;

    let image = image::load_from_memory(&bytes)
        .map_err(|e| VisageError::Decode(format!("unsupported image data: {e}")))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    FrameBuffer::from_rgba8(width, height, rgba.into_raw())
        .ok_or_else(|| VisageError::Decode("decoded image has inconsistent dimensions".into()))
}

/// Strip a `data:image/...;base64,` prefix, if present.
fn strip_data_uri(data: &str) -> &str {
    if let Some(rest) = data.strip_prefix("data:image/") {
        if let Some((_, payload)) = rest.split_once("base64,") {
            return payload;
        }
    }
    data
}
