//! Anchor pitch selection and 14-bit pitch-bend encoding
//!
//! For each segmented note:
//!
//! 1. Histogram the contour's MIDI pitches into 0.1-semitone bins; the
//!    anchor pitch is the mode's bin center, ties broken by the bin whose
//!    first frame occurs earliest.
//! 2. `anchor_midi = round(anchor)`, clamped to [0, 127].
//! 3. Per-frame deviation from the anchor, clamped to
//!    ±`bend_range_semitones`, encodes as
//!    `round(deviation / range · 8191)` in [-8192, 8191]. A deviation of
//!    exactly zero encodes exactly zero.
//!
//! The wheel reset to center at note end is the serializer's job; encoded
//! bends here are exactly one per retained contour frame.

use crate::config::TranscriptionConfig;
use crate::pitch::segmenter::NoteSegment;
use crate::result::{NoteEvent, PitchBendEvent};

/// Anchor histogram resolution: ten 0.1-semitone bins per semitone
const ANCHOR_BINS_PER_SEMITONE: f64 = 10.0;

/// Maximum positive 14-bit wheel magnitude
const BEND_MAX: f64 = 8191.0;

/// Encode segments into final notes and their pitch-bend streams
///
/// Bends are grouped per note in segment order and time-ordered within each
/// note; each note owns the next `pitch_contour.len()` entries of the
/// stream.
pub fn encode_notes(
    segments: Vec<NoteSegment>,
    config: &TranscriptionConfig,
) -> (Vec<NoteEvent>, Vec<PitchBendEvent>) {
    let mut notes = Vec::with_capacity(segments.len());
    let mut bends = Vec::new();

    for segment in segments {
        let anchor_pitch = anchor_from_contour(&segment.frames);
        let anchor_midi = anchor_pitch.round().clamp(0.0, 127.0) as u8;

        for frame in &segment.frames {
            bends.push(PitchBendEvent {
                time: frame.time,
                bend_value: encode_bend(frame.midi_pitch - anchor_midi as f64, config),
            });
        }

        notes.push(NoteEvent {
            start_time: segment.start_time,
            end_time: segment.end_time,
            anchor_midi,
            velocity: segment.velocity,
            pitch_contour: segment.frames,
        });
    }

    log::debug!(
        "Encoded {} notes with {} pitch-bend samples",
        notes.len(),
        bends.len()
    );

    (notes, bends)
}

/// Mode of the 0.1-semitone pitch histogram, ties to the earliest bin
fn anchor_from_contour(frames: &[crate::frames::PitchFrame]) -> f64 {
    // (bin index, count, first occurrence) — small contours, linear scan
    let mut bins: Vec<(i64, usize, usize)> = Vec::new();

    for (i, frame) in frames.iter().enumerate() {
        // Multiply rather than divide by the bin width: dividing by 0.1
        // lands exact-edge pitches (69.0 / 0.1 = 689.999...) in the bin
        // below and can flip a mode tie between adjacent bins
        let bin = (frame.midi_pitch * ANCHOR_BINS_PER_SEMITONE).floor() as i64;
        match bins.iter_mut().find(|(b, _, _)| *b == bin) {
            Some((_, count, _)) => *count += 1,
            None => bins.push((bin, 1, i)),
        }
    }

    let mut best: Option<(i64, usize, usize)> = None;
    for &(bin, count, first) in &bins {
        let better = match best {
            None => true,
            Some((_, best_count, best_first)) => {
                count > best_count || (count == best_count && first < best_first)
            }
        };
        if better {
            best = Some((bin, count, first));
        }
    }

    match best {
        Some((bin, _, _)) => (bin as f64 + 0.5) / ANCHOR_BINS_PER_SEMITONE,
        // Defended against upstream, but keep a sane fallback
        None => 60.0,
    }
}

/// Encode one deviation as a 14-bit signed wheel value
///
/// Deviations beyond the wheel range saturate at the encoding-space limits:
/// +8191 above, -8192 below. In-range deviations scale linearly, so exactly
/// ±range encodes ±8191 and zero encodes zero.
fn encode_bend(deviation: f64, config: &TranscriptionConfig) -> i16 {
    let range = config.bend_range_semitones;
    if deviation > range {
        return 8191;
    }
    if deviation < -range {
        return -8192;
    }
    let scaled = (deviation / range * BEND_MAX).round();
    scaled.clamp(-8192.0, 8191.0) as i16
}
