use visage_core::{VisageError, VisageResult};

use crate::model::{AnimationSet, AnimationTarget, OverlayFrame, OverlayMode, OverlaySection};
use crate::payload::{AnimationSetPayload, AnimationTargetPayload, OverlayFrameSpec};

/// Validate an incoming animation set payload into a typed record.
///
/// Rejects payloads with an empty `dataArray`, no sections, or no playable
/// (non-empty) section. Only the first target in `dataArray` is used; extra
/// targets are ignored. An unparseable mode string falls back to forward,
/// mirroring how the playback engine treats direction matching.
pub fn validate_animation_set(payload: &AnimationSetPayload) -> VisageResult<AnimationSet> {
    let target = payload
        .data_array
        .first()
        .ok_or_else(|| VisageError::malformed("animation set has an empty dataArray"))?;

    if target.sections.is_empty() {
        return Err(VisageError::malformed("animation target has no sections"));
    }

    let target = validate_target(target)?;

    Ok(AnimationSet {
        target,
        chunk_index: payload.chunk_index,
        forced_set_id: payload.unique_set_id,
    })
}

fn validate_target(payload: &AnimationTargetPayload) -> VisageResult<AnimationTarget> {
    let default_mode = payload
        .mode
        .as_deref()
        .and_then(OverlayMode::parse)
        .unwrap_or(OverlayMode::Forward);

    let sections: Vec<OverlaySection> = payload
        .sections
        .iter()
        .filter(|section| !section.is_empty())
        .map(|section| OverlaySection {
            frames: section
                .iter()
                .map(|spec| validate_frame(spec, default_mode))
                .collect(),
        })
        .collect();

    if sections.is_empty() {
        return Err(VisageError::malformed(
            "animation target has no non-empty sections",
        ));
    }

    Ok(AnimationTarget {
        sections,
        zone_top_left: payload.zone_top_left,
    })
}

fn validate_frame(spec: &OverlayFrameSpec, default_mode: OverlayMode) -> OverlayFrame {
    OverlayFrame {
        sprite_frame: spec.matched_sprite_frame_number,
        frame_index: spec.frame_index,
        matched_filename: spec.matched_filename.clone(),
        sheet_filename: spec.sheet_filename.clone(),
        coordinates: spec.coordinates,
        mode: spec
            .mode
            .as_deref()
            .and_then(OverlayMode::parse)
            .unwrap_or(default_mode),
    }
}
