//! Chord frame post-processing
//!
//! Turns the raw per-hop chord predictions into a clean, contiguous
//! progression:
//!
//! 1. Confidence filter: frames below `filter_low_confidence` are relabeled
//!    "N" (the frame is kept so coverage stays gap-free).
//! 2. Flicker smoothing: label runs shorter than the smoothing window that
//!    are bracketed by one identical label on both sides are absorbed into
//!    that label.
//! 3. Consecutive identical labels merge, keeping the higher confidence.
//! 4. Min-duration merge: segments shorter than `min_chord_duration_ms`
//!    merge into the adjacent segment with higher confidence; exact ties
//!    merge into the following segment, chains resolved left to right.
//! 5. Gap fill: the result covers `[0, duration)` exactly, with "N"
//!    segments where nothing was detected.

use crate::chords::{ChordEvent, ChordProgression, NO_CHORD};
use crate::config::ChordConfig;
use crate::frames::ChordFrame;
use crate::result::KeyInfo;

/// Label run over consecutive frames
#[derive(Debug, Clone)]
struct Run {
    label: String,
    start_time: f64,
    end_time: f64,
    frame_count: usize,
    confidence: f64,
}

impl Run {
    fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Post-process a validated chord frame stream into a progression
///
/// `duration` overrides the derived total length (last frame plus one hop);
/// `tempo_bpm` and `key` flow through to the exports untouched.
pub fn process_chord_frames(
    frames: &[ChordFrame],
    config: &ChordConfig,
    duration: Option<f64>,
    tempo_bpm: f64,
    key: Option<KeyInfo>,
) -> ChordProgression {
    let hop = config.hop_size_ms / 1000.0;

    let derived_end = frames.last().map(|f| f.time + hop).unwrap_or(0.0);
    let total_duration = match duration {
        Some(d) if d > derived_end => d,
        _ => derived_end,
    };

    if frames.is_empty() {
        let chords = if total_duration > 0.0 {
            vec![ChordEvent::new(0.0, total_duration, NO_CHORD, 0.0)]
        } else {
            Vec::new()
        };
        return ChordProgression {
            chords,
            duration: total_duration,
            tempo_bpm,
            key,
        };
    }

    let filtered = confidence_filter(frames, config);
    let mut runs = build_runs(&filtered, hop);
    absorb_flicker(&mut runs, config.smoothing_window_frames);
    let runs = merge_identical(runs);
    let runs = merge_short_runs(runs, config);
    let runs = merge_identical(runs);

    let chords = fill_gaps(runs, total_duration);

    log::debug!(
        "Chord post-processing: {} frames -> {} segments over {:.2}s",
        frames.len(),
        chords.len(),
        total_duration
    );

    ChordProgression {
        chords,
        duration: total_duration,
        tempo_bpm,
        key,
    }
}

fn confidence_filter(frames: &[ChordFrame], config: &ChordConfig) -> Vec<ChordFrame> {
    let mut relabeled = 0usize;
    let result: Vec<ChordFrame> = frames
        .iter()
        .map(|f| {
            if f.confidence < config.filter_low_confidence && f.label != NO_CHORD {
                relabeled += 1;
                ChordFrame {
                    time: f.time,
                    label: NO_CHORD.to_string(),
                    confidence: f.confidence,
                }
            } else {
                f.clone()
            }
        })
        .collect();

    if relabeled > 0 {
        log::debug!(
            "Confidence filter relabeled {} frames below {}",
            relabeled,
            config.filter_low_confidence
        );
    }
    result
}

fn build_runs(frames: &[ChordFrame], hop: f64) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();

    for frame in frames {
        match runs.last_mut() {
            Some(run) if run.label == frame.label => {
                run.end_time = frame.time + hop;
                run.frame_count += 1;
                run.confidence = run.confidence.max(frame.confidence);
            }
            _ => {
                // Segment boundaries snap together so coverage is continuous
                // even when frame times drift off the nominal hop grid
                let start_time = runs.last().map(|r| r.end_time).unwrap_or(frame.time);
                runs.push(Run {
                    label: frame.label.clone(),
                    start_time: start_time.min(frame.time),
                    end_time: frame.time + hop,
                    frame_count: 1,
                    confidence: frame.confidence,
                });
            }
        }
    }

    runs
}

/// Absorb single-flicker runs bracketed by one identical label
fn absorb_flicker(runs: &mut Vec<Run>, window_frames: usize) {
    if runs.len() < 3 {
        return;
    }

    let mut absorbed = 0usize;
    let mut i = 1;
    while i + 1 < runs.len() {
        let bracketed = runs[i - 1].label == runs[i + 1].label && runs[i].label != runs[i - 1].label;
        if bracketed && runs[i].frame_count < window_frames {
            runs[i].label = runs[i - 1].label.clone();
            absorbed += 1;
        }
        i += 1;
    }

    if absorbed > 0 {
        log::debug!("Absorbed {} flicker runs", absorbed);
    }
}

fn merge_identical(runs: Vec<Run>) -> Vec<Run> {
    let mut merged: Vec<Run> = Vec::with_capacity(runs.len());
    for run in runs {
        match merged.last_mut() {
            Some(prev) if prev.label == run.label => {
                prev.end_time = run.end_time;
                prev.frame_count += run.frame_count;
                prev.confidence = prev.confidence.max(run.confidence);
            }
            _ => merged.push(run),
        }
    }
    merged
}

/// Fold runs shorter than the minimum duration into a neighbor
fn merge_short_runs(runs: Vec<Run>, config: &ChordConfig) -> Vec<Run> {
    let min_duration = config.min_chord_duration_ms / 1000.0;

    let mut merged: Vec<Run> = Vec::with_capacity(runs.len());
    let mut pending = runs;
    pending.reverse();

    while let Some(current) = pending.pop() {
        if current.duration() >= min_duration - 1e-9 {
            merged.push(current);
            continue;
        }

        let prev_conf = merged.last().map(|r| r.confidence);
        let next_conf = pending.last().map(|r| r.confidence);

        match (prev_conf, next_conf) {
            (Some(prev), Some(next)) if prev > next => {
                let target = merged.last_mut().expect("previous run exists");
                target.end_time = current.end_time;
                target.frame_count += current.frame_count;
            }
            (_, Some(_)) => {
                // Forward merge on exact tie or higher next confidence
                let target = pending.last_mut().expect("next run exists");
                target.start_time = current.start_time;
                target.frame_count += current.frame_count;
            }
            (Some(_), None) => {
                let target = merged.last_mut().expect("previous run exists");
                target.end_time = current.end_time;
                target.frame_count += current.frame_count;
            }
            (None, None) => merged.push(current),
        }
    }

    merged
}

/// Convert runs to events covering `[0, duration)` with "N" fill
fn fill_gaps(runs: Vec<Run>, duration: f64) -> Vec<ChordEvent> {
    let mut chords: Vec<ChordEvent> = Vec::with_capacity(runs.len() + 2);
    let mut cursor = 0.0;

    for run in runs {
        if run.start_time > cursor + 1e-9 {
            chords.push(ChordEvent::new(cursor, run.start_time, NO_CHORD, 0.0));
        }
        let start = cursor.max(run.start_time);
        let end = run.end_time.min(duration).max(start);
        if end > start {
            chords.push(ChordEvent::new(start, end, run.label, run.confidence));
            cursor = end;
        }
    }

    if duration > cursor + 1e-9 {
        chords.push(ChordEvent::new(cursor, duration, NO_CHORD, 0.0));
    }

    // Adjacent fills can duplicate the no-chord label
    let mut deduped: Vec<ChordEvent> = Vec::with_capacity(chords.len());
    for chord in chords {
        match deduped.last_mut() {
            Some(prev) if prev.chord_label == chord.chord_label => {
                prev.end_time = chord.end_time;
                prev.confidence = prev.confidence.max(chord.confidence);
            }
            _ => deduped.push(chord),
        }
    }
    deduped
}
