//! Configuration parameters for the transcription and chord pipelines
//!
//! All thresholds are validated up front: a configuration value outside its
//! domain fails at engine construction with [`EngineError::InvalidConfig`],
//! before any frame is processed.

use crate::error::EngineError;

/// Configuration for the pitch transcription pipeline
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    /// Nominal time between pitch frames in milliseconds (default: 10.0)
    pub hop_size_ms: f64,

    /// Frames below this confidence are marked unvoiced, inclusive boundary
    /// (default: 0.6). A frame with confidence exactly equal to the threshold
    /// is voiced.
    pub confidence_threshold: f64,

    /// Frames with RMS energy below this level are treated as silence
    /// (default: -40.0 dB). Only applied when an energy stream is supplied.
    pub silence_threshold_db: f64,

    /// Median filter window over voiced pitch values, in frames (default: 5)
    pub median_filter_size: usize,

    /// Notes shorter than this are merged into a neighbor (default: 80.0)
    pub min_note_duration_ms: f64,

    /// Max pitch variance (semitones squared) over the trailing stability
    /// window for a region to count as "stable" (default: 0.5)
    pub pitch_stability_threshold: f64,

    /// Trailing window for stability and sustained-confidence checks, in
    /// milliseconds (default: 50.0)
    pub stability_window_ms: f64,

    /// Unvoiced gap longer than this forces a note boundary (default: 50.0)
    pub note_gap_threshold_ms: f64,

    /// Pitch jump between consecutive frames larger than this (semitones)
    /// is a boundary candidate (default: 2.0)
    pub pitch_jump_threshold: f64,

    /// Pitch derivative above this (semitones/second) is required alongside
    /// the jump threshold to split a note (default: 100.0)
    pub pitch_jump_rate_threshold: f64,

    /// Pitch-wheel range in semitones; deviations beyond it are clamped
    /// (default: 2.0)
    pub bend_range_semitones: f64,

    /// Velocity used when no energy stream is supplied (default: 100)
    pub default_velocity: u8,

    /// Tempo written to the MIDI metadata track when the caller supplies no
    /// tempo context (default: 120.0)
    pub default_tempo_bpm: f64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            hop_size_ms: 10.0,
            confidence_threshold: 0.6,
            silence_threshold_db: -40.0,
            median_filter_size: 5,
            min_note_duration_ms: 80.0,
            pitch_stability_threshold: 0.5,
            stability_window_ms: 50.0,
            note_gap_threshold_ms: 50.0,
            pitch_jump_threshold: 2.0,
            pitch_jump_rate_threshold: 100.0,
            bend_range_semitones: 2.0,
            default_velocity: 100,
            default_tempo_bpm: 120.0,
        }
    }
}

impl TranscriptionConfig {
    /// Validate all parameters against their domains
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), EngineError> {
        check_positive("hop_size_ms", self.hop_size_ms)?;
        check_unit_range("confidence_threshold", self.confidence_threshold)?;
        check_finite("silence_threshold_db", self.silence_threshold_db)?;
        if self.median_filter_size == 0 {
            return Err(EngineError::InvalidConfig {
                field: "median_filter_size",
                reason: "must be at least 1 frame".to_string(),
            });
        }
        check_positive("min_note_duration_ms", self.min_note_duration_ms)?;
        check_positive("pitch_stability_threshold", self.pitch_stability_threshold)?;
        check_positive("stability_window_ms", self.stability_window_ms)?;
        check_positive("note_gap_threshold_ms", self.note_gap_threshold_ms)?;
        check_positive("pitch_jump_threshold", self.pitch_jump_threshold)?;
        check_positive("pitch_jump_rate_threshold", self.pitch_jump_rate_threshold)?;
        check_positive("bend_range_semitones", self.bend_range_semitones)?;
        if self.default_velocity == 0 || self.default_velocity > 127 {
            return Err(EngineError::InvalidConfig {
                field: "default_velocity",
                reason: format!("must be within [1, 127], got {}", self.default_velocity),
            });
        }
        check_positive("default_tempo_bpm", self.default_tempo_bpm)?;
        Ok(())
    }
}

/// Configuration for the chord post-processing pipeline
#[derive(Debug, Clone)]
pub struct ChordConfig {
    /// Nominal time between chord frames in milliseconds
    /// (default: 200.0, from a 22050 Hz / 4410-sample model hop)
    pub hop_size_ms: f64,

    /// Frames below this confidence are relabeled "N" (default: 0.3)
    pub filter_low_confidence: f64,

    /// Runs shorter than this many frames, bracketed by identical labels on
    /// both sides, are absorbed into the surrounding label (default: 3)
    pub smoothing_window_frames: usize,

    /// Segments shorter than this are merged into the higher-confidence
    /// neighbor (default: 100.0)
    pub min_chord_duration_ms: f64,
}

impl Default for ChordConfig {
    fn default() -> Self {
        Self {
            hop_size_ms: 200.0,
            filter_low_confidence: 0.3,
            smoothing_window_frames: 3,
            min_chord_duration_ms: 100.0,
        }
    }
}

impl ChordConfig {
    /// Validate all parameters against their domains
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), EngineError> {
        check_positive("hop_size_ms", self.hop_size_ms)?;
        check_unit_range("filter_low_confidence", self.filter_low_confidence)?;
        if self.smoothing_window_frames == 0 {
            return Err(EngineError::InvalidConfig {
                field: "smoothing_window_frames",
                reason: "must be at least 1 frame".to_string(),
            });
        }
        check_positive("min_chord_duration_ms", self.min_chord_duration_ms)?;
        Ok(())
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), EngineError> {
    if !value.is_finite() {
        return Err(EngineError::InvalidConfig {
            field,
            reason: format!("must be a finite number, got {}", value),
        });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), EngineError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(EngineError::InvalidConfig {
            field,
            reason: format!("must be a positive finite number, got {}", value),
        });
    }
    Ok(())
}

fn check_unit_range(field: &'static str, value: f64) -> Result<(), EngineError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(EngineError::InvalidConfig {
            field,
            reason: format!("must be within [0, 1], got {}", value),
        });
    }
    Ok(())
}
