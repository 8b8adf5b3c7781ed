//! Melisma: musical event segmentation and encoding
//!
//! Converts frame-level pitch and chord predictions from upstream ML models
//! into discrete musical events: notes with expressive pitch-bend contours,
//! and chord segments with parsed harmonic structure. Results serialize to
//! Standard MIDI Files and lab/CSV/JSON exports.
//!
//! # Pitch pipeline
//!
//! [`transcribe`] runs the full vocal path:
//!
//! 1. Ingestion: validate timestamps, clamp confidences, convert frequency
//!    to fractional MIDI pitch.
//! 2. Voicing: gate frames on confidence and optional RMS energy.
//! 3. Smoothing: per-run median filter plus octave-jump correction.
//! 4. Segmentation: note boundaries at silence gaps, abrupt stable-region
//!    pitch jumps, and sustained low confidence; short notes merge into
//!    their stronger neighbor.
//! 5. Encoding: per-note anchor pitch (histogram mode) and a 14-bit pitch
//!    bend per retained frame, so melisma and gamaka survive as continuous
//!    curves rather than note fragments.
//!
//! # Chord pipeline
//!
//! [`detect_chords`] post-processes a chord frame stream: low-confidence
//! relabeling, flicker absorption, merging of identical and too-short
//! segments, and gap filling so segments tile `[0, duration)` exactly.
//!
//! Every stage is deterministic: identical inputs and configuration produce
//! identical outputs, byte-for-byte in all export formats.
//!
//! # Example
//!
//! ```
//! use melisma::{transcribe, CancelToken, MusicContext, PitchInput, RawPitchFrame,
//!     TranscriptionConfig};
//!
//! let input = PitchInput {
//!     frames: (0..30)
//!         .map(|i| RawPitchFrame {
//!             time: i as f64 * 0.01,
//!             frequency: 440.0,
//!             confidence: 0.95,
//!         })
//!         .collect(),
//!     energy_db: None,
//! };
//! let config = TranscriptionConfig::default();
//! let result = transcribe(&input, &config, MusicContext::default(), &CancelToken::new())
//!     .expect("valid frame stream");
//! assert_eq!(result.notes.len(), 1);
//! assert_eq!(result.notes[0].anchor_midi, 69);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod chords;
pub mod config;
pub mod error;
pub mod frames;
pub mod output;
pub mod pitch;
pub mod result;

pub use cancel::CancelToken;
pub use chords::{ChordEvent, ChordProgression};
pub use config::{ChordConfig, TranscriptionConfig};
pub use error::{EngineError, Stage};
pub use frames::{ChordInput, PitchInput, RawChordFrame, RawPitchFrame};
pub use output::chords::ChordExportFormat;
pub use result::{KeyInfo, NoteEvent, PitchBendEvent, TranscriptionResult};

use frames::ingest::{ingest_chord_frames, ingest_pitch_frames};
use frames::voicing::apply_voicing;
use pitch::anchor::encode_notes;
use pitch::segmenter::segment_notes;
use pitch::smoothing::smooth_contour;

/// Optional musical context supplied by the caller
///
/// Tempo defaults to the configured value when absent; the key, when
/// present, is carried into the MIDI key signature and JSON exports.
#[derive(Debug, Clone, Default)]
pub struct MusicContext {
    /// Tempo in beats per minute
    pub tempo_bpm: Option<f64>,
    /// Detected or declared key
    pub key: Option<KeyInfo>,
}

/// Run the pitch pipeline over a frame stream
///
/// # Arguments
///
/// * `input` - Ordered pitch frames with optional parallel energy stream
/// * `config` - Segmentation and encoding parameters
/// * `context` - Optional tempo and key, carried through to the result
/// * `cancel` - Cooperative cancellation token, checked between stages
///
/// # Errors
///
/// Returns `EngineError::InvalidConfig` for out-of-range parameters,
/// `EngineError::InvalidFrameStream` for structural input defects, and
/// `EngineError::Cancelled` when the token fires, naming the stage that
/// would have run next. An empty frame stream is not an error; it yields an
/// empty result.
pub fn transcribe(
    input: &PitchInput,
    config: &TranscriptionConfig,
    context: MusicContext,
    cancel: &CancelToken,
) -> Result<TranscriptionResult, EngineError> {
    config.validate()?;
    let tempo_bpm = context.tempo_bpm.unwrap_or(config.default_tempo_bpm);

    cancel.checkpoint(Stage::Ingest)?;
    let (frames, stats) = ingest_pitch_frames(input)?;
    if stats.any_corrections() {
        log::warn!(
            "Recovered {} bad frequencies and {} out-of-range confidences during ingest",
            stats.dropped_frequencies,
            stats.clamped_confidences
        );
    }

    cancel.checkpoint(Stage::Voicing)?;
    let frames = apply_voicing(&frames, config);

    cancel.checkpoint(Stage::Smoothing)?;
    let frames = smooth_contour(&frames, config);

    cancel.checkpoint(Stage::Segmentation)?;
    let segments = segment_notes(&frames, config);

    cancel.checkpoint(Stage::BendEncoding)?;
    let (notes, pitch_bends) = encode_notes(segments, config);

    let hop = config.hop_size_ms / 1000.0;
    let frame_end = frames.last().map(|f| f.time + hop).unwrap_or(0.0);
    let note_end = notes.last().map(|n| n.end_time).unwrap_or(0.0);
    let duration = frame_end.max(note_end);

    log::info!(
        "Transcribed {} frames into {} notes over {:.2} s at {} BPM",
        frames.len(),
        notes.len(),
        duration,
        tempo_bpm
    );

    Ok(TranscriptionResult {
        notes,
        pitch_bends,
        tempo_bpm,
        duration,
        key: context.key,
        processed_frames: frames,
    })
}

/// Run the chord post-processing pipeline over a frame stream
///
/// # Arguments
///
/// * `input` - Ordered chord frames with optional declared total duration
/// * `config` - Filtering and merging parameters
/// * `context` - Optional tempo and key, carried through to the result
/// * `cancel` - Cooperative cancellation token
///
/// # Errors
///
/// Returns `EngineError::InvalidConfig` for out-of-range parameters,
/// `EngineError::InvalidFrameStream` for structural input defects, and
/// `EngineError::Cancelled` when the token fires.
pub fn detect_chords(
    input: &ChordInput,
    config: &ChordConfig,
    context: MusicContext,
    cancel: &CancelToken,
) -> Result<ChordProgression, EngineError> {
    config.validate()?;
    let tempo_bpm = context.tempo_bpm.unwrap_or(120.0);

    cancel.checkpoint(Stage::Ingest)?;
    let (frames, _) = ingest_chord_frames(input)?;

    cancel.checkpoint(Stage::ChordPostProcessing)?;
    let progression =
        chords::post_processor::process_chord_frames(&frames, config, input.duration, tempo_bpm, context.key);

    log::info!(
        "Detected {} chord segments over {:.2} s",
        progression.chords.len(),
        progression.duration
    );

    Ok(progression)
}
