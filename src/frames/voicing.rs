//! Voicing and confidence filtering
//!
//! A frame is voiced iff its confidence meets `confidence_threshold`
//! (inclusive boundary) AND its RMS energy meets `silence_threshold_db`.
//! Frames failing either test become unvoiced regardless of detected
//! frequency. This is a pure, frame-local decision with no side effects.

use crate::config::TranscriptionConfig;
use crate::frames::PitchFrame;

/// Frame-local voicing decision
///
/// The energy test only applies when the frame carries an energy value; a
/// stream without energy information is gated by confidence alone.
pub fn is_voiced(frame: &PitchFrame, config: &TranscriptionConfig) -> bool {
    if frame.frequency <= 0.0 {
        return false;
    }
    if frame.confidence < config.confidence_threshold {
        return false;
    }
    if let Some(energy_db) = frame.energy_db {
        if energy_db < config.silence_threshold_db {
            return false;
        }
    }
    true
}

/// Apply the voicing decision across a frame stream
///
/// Frames marked unvoiced keep their time and confidence but have frequency
/// and pitch zeroed, so later stages treat them uniformly as gaps.
pub fn apply_voicing(frames: &[PitchFrame], config: &TranscriptionConfig) -> Vec<PitchFrame> {
    let mut result = Vec::with_capacity(frames.len());
    let mut silenced = 0usize;

    for frame in frames {
        if is_voiced(frame, config) {
            let mut voiced = *frame;
            voiced.is_voiced = true;
            result.push(voiced);
        } else {
            if frame.frequency > 0.0 {
                silenced += 1;
            }
            result.push(PitchFrame {
                time: frame.time,
                frequency: 0.0,
                confidence: frame.confidence,
                midi_pitch: 0.0,
                is_voiced: false,
                energy_db: frame.energy_db,
            });
        }
    }

    let voiced_count = result.iter().filter(|f| f.is_voiced).count();
    log::debug!(
        "Voicing filter: {} of {} frames voiced, {} silenced below thresholds",
        voiced_count,
        frames.len(),
        silenced
    );

    result
}
