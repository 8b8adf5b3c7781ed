//! Pitch contour smoothing
//!
//! Two passes over the voiced contour:
//!
//! 1. Median filter (fixed window, default 5 frames) applied independently
//!    per contiguous voiced run. Unvoiced frames act as filter
//!    discontinuities; values are never smoothed across a gap. Edges within
//!    a run are padded nearest-value.
//! 2. Octave correction: a frame whose pitch differs from the previous
//!    voiced frame by approximately a multiple of 12 semitones (within
//!    ±0.5) over a single hop is shifted back by that multiple, toward the
//!    octave implied by the preceding context.
//!
//! A single median pass is not a fixpoint for oscillating contours (a
//! period-4 square wave shifts under one pass), so the combined pass is
//! iterated until the contour stops changing. The returned contour is a
//! median-filter root signal: re-running the smoother on it does not
//! change values.

use crate::config::TranscriptionConfig;
use crate::frames::{midi_to_frequency, PitchFrame};

/// Tolerance around an exact octave multiple for correction, in semitones
const OCTAVE_TOLERANCE: f64 = 0.5;

/// Smooth the pitch contour and correct spurious octave jumps
///
/// Iterates median filtering plus octave correction to a fixpoint, so the
/// output is stable under re-smoothing. Returns a new frame vector;
/// unvoiced frames pass through untouched.
pub fn smooth_contour(frames: &[PitchFrame], config: &TranscriptionConfig) -> Vec<PitchFrame> {
    let mut result = frames.to_vec();
    let hop_seconds = config.hop_size_ms / 1000.0;
    // A finite-length signal reaches a median-filter root within roughly
    // half its length in passes; the cap bounds pathological inputs.
    let max_passes = result.len() / 2 + 2;
    let mut corrections = 0;

    for pass in 0..max_passes {
        let mut next = result.clone();
        median_filter_voiced_runs(&mut next, config.median_filter_size);
        corrections += correct_octave_jumps(&mut next, hop_seconds);

        let changed = next
            .iter()
            .zip(&result)
            .any(|(a, b)| a.midi_pitch != b.midi_pitch);
        result = next;
        if !changed {
            if pass > 1 {
                log::debug!("Smoothing converged after {} passes", pass + 1);
            }
            break;
        }
    }

    if corrections > 0 {
        log::debug!("Octave correction shifted {} frames", corrections);
    }

    result
}

/// Median-filter `midi_pitch` within each contiguous voiced run
fn median_filter_voiced_runs(frames: &mut [PitchFrame], window: usize) {
    if window <= 1 {
        return;
    }

    let mut run_start = None;
    let len = frames.len();
    for i in 0..=len {
        let voiced = i < len && frames[i].is_voiced;
        match (run_start, voiced) {
            (None, true) => run_start = Some(i),
            (Some(start), false) => {
                median_filter_run(&mut frames[start..i], window);
                run_start = None;
            }
            _ => {}
        }
    }
}

fn median_filter_run(run: &mut [PitchFrame], window: usize) {
    if run.len() < 2 {
        return;
    }

    let values: Vec<f64> = run.iter().map(|f| f.midi_pitch).collect();
    let half = window / 2;
    let mut scratch = Vec::with_capacity(window);

    for (i, frame) in run.iter_mut().enumerate() {
        scratch.clear();
        for offset in 0..window {
            // Nearest-edge padding: indices clamped to the run bounds
            let idx = (i + offset)
                .saturating_sub(half)
                .min(values.len() - 1);
            scratch.push(values[idx]);
        }
        scratch.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = if window % 2 == 1 {
            scratch[half]
        } else {
            (scratch[half - 1] + scratch[half]) / 2.0
        };
        if (median - frame.midi_pitch).abs() > f64::EPSILON {
            frame.midi_pitch = median;
            frame.frequency = midi_to_frequency(median);
        }
    }
}

/// Shift frames back toward the preceding octave context
///
/// Only single-hop transitions are corrected; a jump across a longer
/// unvoiced gap may be a genuine octave leap and is left alone.
fn correct_octave_jumps(frames: &mut [PitchFrame], hop_seconds: f64) -> usize {
    let single_hop = hop_seconds * 1.5;
    let mut corrections = 0;
    let mut prev_voiced: Option<(f64, f64)> = None; // (time, corrected pitch)

    for frame in frames.iter_mut() {
        if !frame.is_voiced {
            continue;
        }

        if let Some((prev_time, prev_pitch)) = prev_voiced {
            let gap = frame.time - prev_time;
            if gap <= single_hop {
                let diff = frame.midi_pitch - prev_pitch;
                let octaves = (diff / 12.0).round();
                if octaves != 0.0 && (diff - octaves * 12.0).abs() <= OCTAVE_TOLERANCE {
                    frame.midi_pitch -= octaves * 12.0;
                    frame.frequency = midi_to_frequency(frame.midi_pitch);
                    corrections += 1;
                }
            }
        }

        prev_voiced = Some((frame.time, frame.midi_pitch));
    }

    corrections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voiced(time: f64, midi: f64) -> PitchFrame {
        PitchFrame {
            time,
            frequency: midi_to_frequency(midi),
            confidence: 0.9,
            midi_pitch: midi,
            is_voiced: true,
            energy_db: None,
        }
    }

    fn unvoiced(time: f64) -> PitchFrame {
        PitchFrame {
            time,
            frequency: 0.0,
            confidence: 0.1,
            midi_pitch: 0.0,
            is_voiced: false,
            energy_db: None,
        }
    }

    fn contour(values: &[f64]) -> Vec<PitchFrame> {
        values
            .iter()
            .enumerate()
            .map(|(i, &m)| {
                if m > 0.0 {
                    voiced(i as f64 * 0.01, m)
                } else {
                    unvoiced(i as f64 * 0.01)
                }
            })
            .collect()
    }

    fn pitches(frames: &[PitchFrame]) -> Vec<f64> {
        frames.iter().map(|f| f.midi_pitch).collect()
    }

    #[test]
    fn test_median_filter_removes_single_spike() {
        let config = TranscriptionConfig::default();
        let frames = contour(&[69.0, 69.0, 75.0, 69.0, 69.0, 69.0]);
        let smoothed = smooth_contour(&frames, &config);
        for (i, frame) in smoothed.iter().enumerate() {
            assert!(
                (frame.midi_pitch - 69.0).abs() < 1e-9,
                "spike should be removed at frame {}, got {}",
                i,
                frame.midi_pitch
            );
        }
    }

    #[test]
    fn test_median_filter_does_not_cross_unvoiced_gap() {
        let config = TranscriptionConfig::default();
        // Two runs at very different pitches separated by a gap; each run is
        // constant so it must come through unchanged rather than bleeding
        // into its neighbor.
        let frames = contour(&[60.0, 60.0, 60.0, 0.0, 0.0, 72.0, 72.0, 72.0]);
        let smoothed = smooth_contour(&frames, &config);
        assert_eq!(pitches(&smoothed), vec![60.0, 60.0, 60.0, 0.0, 0.0, 72.0, 72.0, 72.0]);
    }

    #[test]
    fn test_octave_jump_corrected_to_context() {
        let config = TranscriptionConfig::default();
        // One frame detected an octave too high (81 ≈ 69 + 12)
        let frames = contour(&[69.0, 69.0, 69.0, 81.2, 69.0, 69.0, 69.0]);
        let smoothed = smooth_contour(&frames, &config);
        for frame in &smoothed {
            assert!(
                frame.midi_pitch < 72.0,
                "octave outlier should be folded back down, got {}",
                frame.midi_pitch
            );
        }
    }

    #[test]
    fn test_non_octave_jump_left_alone() {
        let config = TranscriptionConfig {
            median_filter_size: 1, // isolate the octave pass
            ..Default::default()
        };
        // A 7-semitone leap is a real interval, not an octave error
        let frames = contour(&[60.0, 60.0, 67.0, 67.0]);
        let smoothed = smooth_contour(&frames, &config);
        assert_eq!(pitches(&smoothed), vec![60.0, 60.0, 67.0, 67.0]);
    }

    #[test]
    fn test_two_octave_jump_corrected() {
        let config = TranscriptionConfig {
            median_filter_size: 1,
            ..Default::default()
        };
        let frames = contour(&[50.0, 50.0, 74.3, 50.0]);
        let smoothed = smooth_contour(&frames, &config);
        assert!(
            (smoothed[2].midi_pitch - 50.3).abs() < 1e-9,
            "24-semitone jump should fold back two octaves, got {}",
            smoothed[2].midi_pitch
        );
    }

    #[test]
    fn test_smoothing_is_idempotent() {
        let config = TranscriptionConfig::default();
        let frames = contour(&[
            69.0, 69.0, 75.0, 69.0, 69.1, 69.2, 81.1, 69.2, 0.0, 0.0, 64.0, 64.0, 64.0, 64.2,
        ]);
        let once = smooth_contour(&frames, &config);
        let twice = smooth_contour(&once, &config);
        assert_eq!(
            pitches(&once),
            pitches(&twice),
            "re-running the smoother on its own output must not change values"
        );
    }

    #[test]
    fn test_square_wave_smooths_to_a_root_signal() {
        let config = TranscriptionConfig::default();
        // A period-4 square wave is the classic contour a single median
        // pass shifts rather than fixes; the smoother must keep iterating
        // until the contour is a root signal
        let frames = contour(&[60.0, 61.0, 61.0, 60.0, 60.0, 61.0, 61.0, 60.0]);
        let once = smooth_contour(&frames, &config);
        let twice = smooth_contour(&once, &config);
        assert_eq!(
            pitches(&once),
            pitches(&twice),
            "oscillating contours must still smooth to a fixpoint"
        );
    }

    #[test]
    fn test_empty_and_tiny_inputs() {
        let config = TranscriptionConfig::default();
        assert!(smooth_contour(&[], &config).is_empty());

        let one = contour(&[69.0]);
        let smoothed = smooth_contour(&one, &config);
        assert_eq!(pitches(&smoothed), vec![69.0]);
    }
}
