//! Pitch-path result types

use serde::{Deserialize, Serialize};

use crate::frames::PitchFrame;

/// Optional externally supplied musical context
///
/// The engine never derives this itself; upstream analysis (or the caller)
/// may provide it, and it flows unchanged into the MIDI metadata track and
/// the JSON exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Tonic name, e.g. "C", "F#", "Bb"
    pub tonic: String,
    /// Scale name, e.g. "major", "minor"
    pub scale: String,
}

impl KeyInfo {
    /// True when the scale names a minor-type tonality
    pub fn is_minor(&self) -> bool {
        let scale = self.scale.to_ascii_lowercase();
        // The Hindustani parent scales that map onto minor key signatures
        scale.contains("minor") || matches!(scale.as_str(), "kafi" | "asavari" | "bhairavi")
    }
}

/// One segmented note with its retained pitch contour
#[derive(Debug, Clone, Serialize)]
pub struct NoteEvent {
    /// Note onset in seconds
    pub start_time: f64,
    /// Note offset in seconds, strictly greater than `start_time`
    pub end_time: f64,
    /// Quantized anchor pitch in [0, 127]
    pub anchor_midi: u8,
    /// MIDI velocity in [1, 127]
    pub velocity: u8,
    /// Voiced frames within [start_time, end_time), in time order
    #[serde(skip)]
    pub pitch_contour: Vec<PitchFrame>,
}

impl NoteEvent {
    /// Note duration in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// One pitch-wheel sample, one per retained frame of its owning note
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchBendEvent {
    /// Event time in seconds
    pub time: f64,
    /// 14-bit signed wheel value in [-8192, 8191]; 0 is center
    pub bend_value: i16,
}

/// Aggregate output of the pitch path
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionResult {
    /// Notes ordered by start time, non-overlapping
    pub notes: Vec<NoteEvent>,
    /// Pitch-wheel events in emission order (grouped per note, time-ordered
    /// within each note)
    pub pitch_bends: Vec<PitchBendEvent>,
    /// Tempo used for MIDI timing
    pub tempo_bpm: f64,
    /// Total duration in seconds, at least the last note's end time
    pub duration: f64,
    /// Optional externally supplied key context
    pub key: Option<KeyInfo>,
    /// Fully processed frame stream (post smoothing), retained for the
    /// frames JSON export
    #[serde(skip)]
    pub processed_frames: Vec<PitchFrame>,
}
