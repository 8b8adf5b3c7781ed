//! Frame stream validation and normalization
//!
//! Structural defects (timestamp regression, mismatched parallel arrays,
//! empty required fields) are fatal and reported with the offending index.
//! Frame-local anomalies (a single NaN frequency, an out-of-range
//! confidence) are clamped or dropped here, counted, and logged at debug
//! level; they never abort the run.

use crate::error::{EngineError, Stage};
use crate::frames::{
    frequency_to_midi, ChordFrame, ChordInput, PitchFrame, PitchInput, RawChordFrame,
    RawPitchFrame,
};

/// Counters for frame-local corrections applied during ingestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Frames ingested
    pub total_frames: usize,
    /// Frames whose frequency was NaN/infinite/negative and was zeroed to
    /// unvoiced
    pub dropped_frequencies: usize,
    /// Frames whose confidence was NaN or outside [0, 1] and was clamped
    pub clamped_confidences: usize,
}

impl IngestStats {
    /// True if any correction was applied
    pub fn any_corrections(&self) -> bool {
        self.dropped_frequencies > 0 || self.clamped_confidences > 0
    }
}

/// Validate and normalize a raw pitch frame stream
///
/// Converts frequency to fractional MIDI pitch via
/// `69 + 12·log2(f / 440)` for voiced frames. The initial voicing mark is
/// frequency-based only; the voicing filter applies confidence and energy
/// gating afterwards.
///
/// # Errors
///
/// Returns `EngineError::InvalidFrameStream` when timestamps regress, a
/// timestamp is not finite, or the energy stream length does not match the
/// frame count. Zero frames is not an error.
pub fn ingest_pitch_frames(
    input: &PitchInput,
) -> Result<(Vec<PitchFrame>, IngestStats), EngineError> {
    if let Some(energy) = &input.energy_db {
        if energy.len() != input.frames.len() {
            return Err(EngineError::InvalidFrameStream {
                stage: Stage::Ingest,
                index: energy.len().min(input.frames.len()),
                reason: format!(
                    "energy stream length {} does not match frame count {}",
                    energy.len(),
                    input.frames.len()
                ),
            });
        }
    }

    validate_times(input.frames.iter().map(|f| f.time))?;

    let mut stats = IngestStats {
        total_frames: input.frames.len(),
        ..Default::default()
    };

    let mut frames = Vec::with_capacity(input.frames.len());
    for (i, raw) in input.frames.iter().enumerate() {
        let RawPitchFrame {
            time,
            frequency,
            confidence,
        } = *raw;

        let frequency = if !frequency.is_finite() || frequency < 0.0 {
            stats.dropped_frequencies += 1;
            0.0
        } else {
            frequency
        };

        let confidence = if confidence.is_nan() {
            stats.clamped_confidences += 1;
            0.0
        } else if !(0.0..=1.0).contains(&confidence) {
            stats.clamped_confidences += 1;
            confidence.clamp(0.0, 1.0)
        } else {
            confidence
        };

        let midi_pitch = frequency_to_midi(frequency);
        frames.push(PitchFrame {
            time,
            frequency,
            confidence,
            midi_pitch,
            is_voiced: frequency > 0.0,
            energy_db: input.energy_db.as_ref().map(|e| e[i]),
        });
    }

    if stats.any_corrections() {
        log::debug!(
            "Ingested {} pitch frames: {} frequencies dropped, {} confidences clamped",
            stats.total_frames,
            stats.dropped_frequencies,
            stats.clamped_confidences
        );
    } else {
        log::debug!("Ingested {} pitch frames, no corrections", stats.total_frames);
    }

    Ok((frames, stats))
}

/// Validate and normalize a raw chord frame stream
///
/// # Errors
///
/// Returns `EngineError::InvalidFrameStream` when timestamps regress, a
/// timestamp is not finite, or a chord label is empty. Zero frames is not an
/// error.
pub fn ingest_chord_frames(
    input: &ChordInput,
) -> Result<(Vec<ChordFrame>, IngestStats), EngineError> {
    validate_times(input.frames.iter().map(|f| f.time))?;

    let mut stats = IngestStats {
        total_frames: input.frames.len(),
        ..Default::default()
    };

    let mut frames = Vec::with_capacity(input.frames.len());
    for (i, raw) in input.frames.iter().enumerate() {
        let RawChordFrame {
            time,
            chord_label,
            confidence,
        } = raw;

        if chord_label.is_empty() {
            return Err(EngineError::InvalidFrameStream {
                stage: Stage::Ingest,
                index: i,
                reason: "empty chord label".to_string(),
            });
        }

        let confidence = if confidence.is_nan() {
            stats.clamped_confidences += 1;
            0.0
        } else if !(0.0..=1.0).contains(confidence) {
            stats.clamped_confidences += 1;
            confidence.clamp(0.0, 1.0)
        } else {
            *confidence
        };

        frames.push(ChordFrame {
            time: *time,
            label: chord_label.clone(),
            confidence,
        });
    }

    log::debug!(
        "Ingested {} chord frames, {} confidences clamped",
        stats.total_frames,
        stats.clamped_confidences
    );

    Ok((frames, stats))
}

fn validate_times(times: impl Iterator<Item = f64>) -> Result<(), EngineError> {
    let mut prev: Option<f64> = None;
    for (i, time) in times.enumerate() {
        if !time.is_finite() || time < 0.0 {
            return Err(EngineError::InvalidFrameStream {
                stage: Stage::Ingest,
                index: i,
                reason: format!("timestamp must be finite and non-negative, got {}", time),
            });
        }
        if let Some(prev) = prev {
            if time < prev {
                return Err(EngineError::InvalidFrameStream {
                    stage: Stage::Ingest,
                    index: i,
                    reason: format!("timestamp regressed from {} to {}", prev, time),
                });
            }
        }
        prev = Some(time);
    }
    Ok(())
}
