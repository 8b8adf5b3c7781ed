//! Processed-frame exporters for the pitch path
//!
//! The frames JSON feeds downstream visualization tooling; its field names
//! and ordering are a fixed contract. The CSV form is a flat per-frame
//! table for spreadsheet inspection.

use std::path::Path;

use serde::Serialize;

use crate::error::{EngineError, Stage};
use crate::frames::PitchFrame;
use crate::output::write_atomic;

#[derive(Serialize)]
struct FramesJson<'a> {
    processed_frames: &'a [PitchFrame],
    frame_count: usize,
}

/// Render the processed frame stream as JSON
///
/// Shape: `{processed_frames: [{time, frequency, confidence, midi_pitch,
/// is_voiced}], frame_count}`.
pub fn render_frames_json(frames: &[PitchFrame]) -> Result<String, EngineError> {
    let doc = FramesJson {
        processed_frames: frames,
        frame_count: frames.len(),
    };
    serde_json::to_string_pretty(&doc).map_err(|err| EngineError::Serialization {
        stage: Stage::Export,
        reason: err.to_string(),
    })
}

/// Render the processed frame stream as CSV
///
/// Header: `time,frequency,midi_pitch,confidence,voiced` with voiced as
/// 0/1.
pub fn render_frames_csv(frames: &[PitchFrame]) -> String {
    let mut out = String::from("time,frequency,midi_pitch,confidence,voiced\n");
    for frame in frames {
        out.push_str(&format!(
            "{:.4},{:.2},{:.2},{:.4},{}\n",
            frame.time,
            frame.frequency,
            frame.midi_pitch,
            frame.confidence,
            u8::from(frame.is_voiced),
        ));
    }
    out
}

/// Write the frames JSON atomically to `path`
pub fn export_frames_json(frames: &[PitchFrame], path: &Path) -> Result<(), EngineError> {
    let rendered = render_frames_json(frames)?;
    write_atomic(path, rendered.as_bytes())?;
    log::info!("Exported {} processed frames to {}", frames.len(), path.display());
    Ok(())
}

/// Write the frames CSV atomically to `path`
pub fn export_frames_csv(frames: &[PitchFrame], path: &Path) -> Result<(), EngineError> {
    write_atomic(path, render_frames_csv(frames).as_bytes())?;
    log::info!("Exported {} frame rows to {}", frames.len(), path.display());
    Ok(())
}
