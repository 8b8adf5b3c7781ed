//! Note boundary detection and segment merging
//!
//! Partitions the smoothed, voicing-filtered contour into note segments.
//! A boundary is inserted when any of:
//!
//! - (a) an unvoiced gap exceeds `note_gap_threshold_ms`;
//! - (b) consecutive frames show a pitch derivative above
//!   `pitch_jump_rate_threshold` combined with a jump above
//!   `pitch_jump_threshold`, arriving out of a pitch-stable region;
//! - (c) confidence sustains below `confidence_threshold` for the full
//!   trailing stability window.
//!
//! The stability gate on (b) is what keeps gamaka-style oscillation intact:
//! a region already oscillating beyond `pitch_stability_threshold` is
//! ornamentation, and splitting it would fragment one sung note into many.
//! Such movement stays encoded as continuous pitch bend instead.
//!
//! Segments shorter than `min_note_duration_ms` merge into the adjacent
//! neighbor with higher mean confidence (exact tie: the following one,
//! chains resolved left to right). A short segment with no neighbor within
//! the gap threshold is kept as-is.

use crate::config::TranscriptionConfig;
use crate::frames::PitchFrame;

/// One note segment prior to anchor/bend encoding
#[derive(Debug, Clone)]
pub struct NoteSegment {
    /// Segment onset in seconds
    pub start_time: f64,
    /// Segment offset in seconds (last frame time plus one hop)
    pub end_time: f64,
    /// Voiced frames of the segment, in time order
    pub frames: Vec<PitchFrame>,
    /// Velocity derived from the segment's mean RMS energy
    pub velocity: u8,
}

impl NoteSegment {
    fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    fn mean_confidence(&self) -> f64 {
        if self.frames.is_empty() {
            return 0.0;
        }
        self.frames.iter().map(|f| f.confidence).sum::<f64>() / self.frames.len() as f64
    }
}

/// Segment the processed contour into notes
pub fn segment_notes(frames: &[PitchFrame], config: &TranscriptionConfig) -> Vec<NoteSegment> {
    if frames.is_empty() {
        return Vec::new();
    }

    let runs = find_voiced_runs(frames, config);
    let mut segments = Vec::new();
    for run in runs {
        segments.extend(split_run(run, config));
    }
    let segments = merge_short_segments(segments, config);

    log::debug!("Segmented {} frames into {} notes", frames.len(), segments.len());
    segments
}

/// Split the stream into voiced runs at silence gaps and sustained
/// low-confidence windows (boundary rules a and c)
fn find_voiced_runs(frames: &[PitchFrame], config: &TranscriptionConfig) -> Vec<Vec<PitchFrame>> {
    let hop = config.hop_size_ms / 1000.0;
    let gap_threshold = config.note_gap_threshold_ms / 1000.0;
    let window = config.stability_window_ms / 1000.0;

    let mut runs: Vec<Vec<PitchFrame>> = Vec::new();
    let mut current: Vec<PitchFrame> = Vec::new();
    let mut low_confidence_since: Option<f64> = None;

    for frame in frames {
        if !frame.is_voiced {
            // Unvoiced frames are never retained; they only widen the gap.
            // A sustained sub-threshold stretch also forces a boundary even
            // while frames remain nominally voiced.
            continue;
        }

        if frame.confidence < config.confidence_threshold {
            let since = *low_confidence_since.get_or_insert(frame.time);
            if frame.time - since + hop >= window {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
                // One boundary per sustained window, not one per frame
                low_confidence_since = Some(frame.time);
            }
        } else {
            low_confidence_since = None;
        }

        if let Some(last) = current.last() {
            // The unvoiced span is the time between the end of the previous
            // retained frame and this one. "Exceeds" is strict: a span equal
            // to the threshold does not split.
            let unvoiced_span = frame.time - (last.time + hop);
            if unvoiced_span > gap_threshold + 1e-9 {
                runs.push(std::mem::take(&mut current));
            }
        }

        current.push(*frame);
    }

    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

/// Split a voiced run at abrupt pitch transitions (boundary rule b)
fn split_run(run: Vec<PitchFrame>, config: &TranscriptionConfig) -> Vec<NoteSegment> {
    if run.is_empty() {
        return Vec::new();
    }

    let window = config.stability_window_ms / 1000.0;
    let mut boundaries = vec![0usize];

    for i in 1..run.len() {
        let dt = run[i].time - run[i - 1].time;
        if dt <= 0.0 {
            continue;
        }
        let jump = run[i].midi_pitch - run[i - 1].midi_pitch;
        let rate = jump.abs() / dt;

        if jump.abs() > config.pitch_jump_threshold
            && rate > config.pitch_jump_rate_threshold
            && is_stable_before(&run, i, window, config.pitch_stability_threshold)
        {
            boundaries.push(i);
        }
    }

    boundaries.push(run.len());
    boundaries.dedup();

    let mut segments = Vec::with_capacity(boundaries.len() - 1);
    for pair in boundaries.windows(2) {
        let frames = run[pair[0]..pair[1]].to_vec();
        if !frames.is_empty() {
            segments.push(build_segment(frames, config));
        }
    }
    segments
}

/// Pitch variance over the trailing window ending just before `index`
///
/// A region with fewer than two trailing frames counts as stable; there is
/// no oscillation evidence to suppress the split.
fn is_stable_before(run: &[PitchFrame], index: usize, window: f64, threshold: f64) -> bool {
    let end_time = run[index - 1].time;
    let trailing: Vec<f64> = run[..index]
        .iter()
        .rev()
        .take_while(|f| end_time - f.time <= window)
        .map(|f| f.midi_pitch)
        .collect();

    if trailing.len() < 2 {
        return true;
    }

    let mean = trailing.iter().sum::<f64>() / trailing.len() as f64;
    let variance =
        trailing.iter().map(|p| (p - mean) * (p - mean)).sum::<f64>() / trailing.len() as f64;
    variance < threshold
}

fn build_segment(frames: Vec<PitchFrame>, config: &TranscriptionConfig) -> NoteSegment {
    let hop = config.hop_size_ms / 1000.0;
    let start_time = frames[0].time;
    let end_time = frames[frames.len() - 1].time + hop;
    let velocity = velocity_from_energy(&frames, config);
    NoteSegment {
        start_time,
        end_time,
        frames,
        velocity,
    }
}

/// Map the segment's mean RMS energy linearly onto [1, 127]
///
/// The dB range [silence_threshold_db, 0] spans the velocity range; a
/// stream without energy information uses the configured default.
fn velocity_from_energy(frames: &[PitchFrame], config: &TranscriptionConfig) -> u8 {
    let energies: Vec<f64> = frames.iter().filter_map(|f| f.energy_db).collect();
    if energies.is_empty() {
        return config.default_velocity;
    }

    let mean_db = energies.iter().sum::<f64>() / energies.len() as f64;
    let floor = config.silence_threshold_db;
    let normalized = ((mean_db - floor) / -floor).clamp(0.0, 1.0);
    let velocity = (1.0 + normalized * 126.0).round();
    velocity.clamp(1.0, 127.0) as u8
}

/// Fold segments shorter than the minimum duration into a neighbor
fn merge_short_segments(
    segments: Vec<NoteSegment>,
    config: &TranscriptionConfig,
) -> Vec<NoteSegment> {
    let min_duration = config.min_note_duration_ms / 1000.0;
    let gap_threshold = config.note_gap_threshold_ms / 1000.0;

    let mut merged: Vec<NoteSegment> = Vec::with_capacity(segments.len());
    let mut pending: Vec<NoteSegment> = segments;
    pending.reverse(); // pop from the front, left to right

    while let Some(current) = pending.pop() {
        if current.duration() >= min_duration {
            merged.push(current);
            continue;
        }

        let prev_eligible = merged
            .last()
            .map(|prev| current.start_time - prev.end_time <= gap_threshold + 1e-9)
            .unwrap_or(false);
        let next_eligible = pending
            .last()
            .map(|next| next.start_time - current.end_time <= gap_threshold + 1e-9)
            .unwrap_or(false);

        let into_prev = match (prev_eligible, next_eligible) {
            (true, true) => {
                let prev_conf = merged.last().map(|s| s.mean_confidence()).unwrap_or(0.0);
                let next_conf = pending.last().map(|s| s.mean_confidence()).unwrap_or(0.0);
                // Exact tie merges forward: deterministic, fixed rule
                prev_conf > next_conf
            }
            (true, false) => true,
            (false, true) => false,
            (false, false) => {
                // No neighbor to absorb it; an isolated short note stands
                merged.push(current);
                continue;
            }
        };

        if into_prev {
            let prev = merged.last_mut().expect("eligibility implies a previous segment");
            prev.end_time = current.end_time;
            prev.frames.extend(current.frames);
        } else {
            let next = pending.last_mut().expect("eligibility implies a next segment");
            next.start_time = current.start_time;
            let mut frames = current.frames;
            frames.append(&mut next.frames);
            next.frames = frames;
        }
    }

    merged
}
