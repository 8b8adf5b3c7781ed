//! Chord segment types and label parsing
//!
//! Chord labels follow the `root:quality[/bass]` convention of the chord
//! recognition literature: `"C:maj"`, `"A:min7/E"`, a bare root (`"C"`)
//! meaning major, `"N"` for no chord, and `"X"` for an unclassifiable
//! sonority.

pub mod post_processor;

use serde::Serialize;

use crate::result::KeyInfo;

/// The no-chord label
pub const NO_CHORD: &str = "N";

/// The unknown-chord label
pub const UNKNOWN_CHORD: &str = "X";

/// Parsed parts of a chord label
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChordParts {
    /// Root note name; empty for "N"/"X"
    pub root: String,
    /// Chord quality; empty for "N"/"X"
    pub quality: String,
    /// Optional bass note for slash chords
    pub bass: Option<String>,
}

/// Split a chord label into root, quality, and optional bass
///
/// A bare root with no quality (e.g. `"C"`, `"F#"`) is major, matching the
/// maj/min chord vocabulary where the major quality is implied.
pub fn parse_chord_label(label: &str) -> ChordParts {
    if label == NO_CHORD || label == UNKNOWN_CHORD {
        return ChordParts::default();
    }

    let (body, bass) = match label.split_once('/') {
        Some((body, bass)) if !bass.is_empty() => (body, Some(bass.to_string())),
        _ => (label, None),
    };

    let (root, quality) = match body.split_once(':') {
        Some((root, quality)) => (root.to_string(), quality.to_string()),
        None => (body.to_string(), "maj".to_string()),
    };

    ChordParts {
        root,
        quality,
        bass,
    }
}

/// One chord segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChordEvent {
    /// Segment onset in seconds
    pub start_time: f64,
    /// Segment offset in seconds, strictly greater than `start_time`
    pub end_time: f64,
    /// Full chord label (`root:quality[/bass]`, or "N")
    pub chord_label: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Parsed root; empty for "N"
    pub root: String,
    /// Parsed quality; empty for "N"
    pub quality: String,
    /// Parsed bass note for slash chords
    pub bass: Option<String>,
}

impl ChordEvent {
    /// Build a segment, deriving the parsed parts from the label
    pub fn new(start_time: f64, end_time: f64, label: impl Into<String>, confidence: f64) -> Self {
        let chord_label = label.into();
        let parts = parse_chord_label(&chord_label);
        Self {
            start_time,
            end_time,
            chord_label,
            confidence,
            root: parts.root,
            quality: parts.quality,
            bass: parts.bass,
        }
    }

    /// Segment duration in seconds
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// True for the no-chord label
    pub fn is_no_chord(&self) -> bool {
        self.chord_label == NO_CHORD
    }
}

/// Aggregate output of the chord path
///
/// The segments are ordered, contiguous, and cover `[0, duration)` exactly;
/// stretches without a chord carry the "N" label.
#[derive(Debug, Clone, Serialize)]
pub struct ChordProgression {
    /// Ordered, gap-free chord segments
    pub chords: Vec<ChordEvent>,
    /// Total duration in seconds
    pub duration: f64,
    /// Tempo context for exports
    pub tempo_bpm: f64,
    /// Optional externally supplied key context
    pub key: Option<KeyInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_root_quality() {
        let parts = parse_chord_label("C:maj");
        assert_eq!(parts.root, "C");
        assert_eq!(parts.quality, "maj");
        assert_eq!(parts.bass, None);
    }

    #[test]
    fn test_parse_bare_root_is_major() {
        let parts = parse_chord_label("F#");
        assert_eq!(parts.root, "F#");
        assert_eq!(parts.quality, "maj");
    }

    #[test]
    fn test_parse_slash_chord() {
        let parts = parse_chord_label("A:min7/E");
        assert_eq!(parts.root, "A");
        assert_eq!(parts.quality, "min7");
        assert_eq!(parts.bass.as_deref(), Some("E"));
    }

    #[test]
    fn test_parse_no_chord_and_unknown() {
        for label in ["N", "X"] {
            let parts = parse_chord_label(label);
            assert!(parts.root.is_empty(), "{} has no root", label);
            assert!(parts.quality.is_empty());
            assert!(parts.bass.is_none());
        }
    }

    #[test]
    fn test_event_derives_parts() {
        let event = ChordEvent::new(0.0, 1.5, "G:7/B", 0.8);
        assert_eq!(event.root, "G");
        assert_eq!(event.quality, "7");
        assert_eq!(event.bass.as_deref(), Some("B"));
        assert!((event.duration() - 1.5).abs() < 1e-12);
        assert!(!event.is_no_chord());
        assert!(ChordEvent::new(0.0, 1.0, "N", 0.0).is_no_chord());
    }
}
