//! Input frame types and stream normalization
//!
//! The engine consumes fully materialized frame arrays produced by external
//! pitch-tracking and chord-recognition models. This module defines the raw
//! collaborator-facing types, the validated internal frame representation,
//! and the frequency/MIDI conversions shared by the pitch path.

pub mod ingest;
pub mod voicing;

use serde::Serialize;

/// Reference frequency for A4 in Hz
pub const A4_FREQUENCY_HZ: f64 = 440.0;

/// MIDI note number of A4
pub const A4_MIDI: f64 = 69.0;

/// One raw pitch prediction as produced by the pitch-tracking collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPitchFrame {
    /// Frame time in seconds
    pub time: f64,
    /// Detected fundamental frequency in Hz; 0 means unvoiced
    pub frequency: f64,
    /// Model confidence in [0, 1]
    pub confidence: f64,
}

/// Pitch frame stream plus optional parallel per-frame RMS energy
#[derive(Debug, Clone, Default)]
pub struct PitchInput {
    /// Ordered pitch frames at the declared hop
    pub frames: Vec<RawPitchFrame>,
    /// Optional per-frame RMS energy in dB, same length as `frames`
    pub energy_db: Option<Vec<f64>>,
}

/// One validated, normalized pitch frame
///
/// Serializes in the exact field order of the frames JSON export contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchFrame {
    /// Frame time in seconds
    pub time: f64,
    /// Fundamental frequency in Hz; 0 when unvoiced
    pub frequency: f64,
    /// Model confidence, clamped to [0, 1]
    pub confidence: f64,
    /// MIDI pitch (fractional); 0 when unvoiced
    pub midi_pitch: f64,
    /// Voicing decision (confidence and energy gated)
    pub is_voiced: bool,
    /// RMS energy in dB when an energy stream was supplied
    #[serde(skip)]
    pub energy_db: Option<f64>,
}

/// One raw chord prediction as produced by the chord-recognition collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct RawChordFrame {
    /// Frame time in seconds
    pub time: f64,
    /// Chord label in `root:quality[/bass]` form, or "N" for no chord
    pub chord_label: String,
    /// Model confidence in [0, 1]
    pub confidence: f64,
}

/// Chord frame stream with optional declared total duration
#[derive(Debug, Clone, Default)]
pub struct ChordInput {
    /// Ordered chord frames at the declared hop
    pub frames: Vec<RawChordFrame>,
    /// Total duration in seconds; derived from the last frame plus one hop
    /// when absent
    pub duration: Option<f64>,
}

/// One validated chord frame
#[derive(Debug, Clone, PartialEq)]
pub struct ChordFrame {
    /// Frame time in seconds
    pub time: f64,
    /// Chord label, possibly relabeled "N" by post-processing
    pub label: String,
    /// Model confidence, clamped to [0, 1]
    pub confidence: f64,
}

/// Convert frequency in Hz to fractional MIDI pitch
///
/// Returns 0.0 for non-positive frequencies (unvoiced convention).
pub fn frequency_to_midi(frequency: f64) -> f64 {
    if frequency <= 0.0 {
        return 0.0;
    }
    A4_MIDI + 12.0 * (frequency / A4_FREQUENCY_HZ).log2()
}

/// Convert fractional MIDI pitch to frequency in Hz
///
/// Returns 0.0 for non-positive pitches (unvoiced convention).
pub fn midi_to_frequency(midi: f64) -> f64 {
    if midi <= 0.0 {
        return 0.0;
    }
    A4_FREQUENCY_HZ * ((midi - A4_MIDI) / 12.0).exp2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_to_midi_reference_points() {
        assert!((frequency_to_midi(440.0) - 69.0).abs() < 1e-9, "A4 should map to 69");
        assert!((frequency_to_midi(880.0) - 81.0).abs() < 1e-9, "A5 should map to 81");
        assert!((frequency_to_midi(220.0) - 57.0).abs() < 1e-9, "A3 should map to 57");
        // Middle C is ~261.626 Hz
        assert!((frequency_to_midi(261.6255653) - 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_unvoiced_frequency_maps_to_zero() {
        assert_eq!(frequency_to_midi(0.0), 0.0);
        assert_eq!(frequency_to_midi(-10.0), 0.0);
    }

    #[test]
    fn test_midi_frequency_roundtrip() {
        for midi in [36.0, 48.5, 60.0, 69.0, 72.25, 100.0] {
            let back = frequency_to_midi(midi_to_frequency(midi));
            assert!(
                (back - midi).abs() < 1e-9,
                "roundtrip drifted for {}: got {}",
                midi,
                back
            );
        }
    }
}
