//! End-to-end pipeline tests
//!
//! Exercises the public API from raw frame streams through segmentation,
//! encoding, and every export surface, using synthetic contours with known
//! expected outputs.

use melisma::output::midi::{export_midi, render_midi};
use melisma::output::{chords::ChordExportFormat, frames::render_frames_json};
use melisma::{
    detect_chords, transcribe, CancelToken, ChordConfig, ChordInput, KeyInfo, MusicContext,
    PitchInput, RawChordFrame, RawPitchFrame, TranscriptionConfig,
};
use midly::{MidiMessage, Smf, TrackEventKind};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pitch_frame(time: f64, frequency: f64, confidence: f64) -> RawPitchFrame {
    RawPitchFrame {
        time,
        frequency,
        confidence,
    }
}

/// Constant-frequency contour at a 10 ms hop
fn steady_contour(frequency: f64, count: usize) -> Vec<RawPitchFrame> {
    (0..count)
        .map(|i| pitch_frame(i as f64 * 0.01, frequency, 0.95))
        .collect()
}

fn midi_to_hz(midi: f64) -> f64 {
    440.0 * ((midi - 69.0) / 12.0).exp2()
}

fn run(frames: Vec<RawPitchFrame>) -> melisma::TranscriptionResult {
    transcribe(
        &PitchInput {
            frames,
            energy_db: None,
        },
        &TranscriptionConfig::default(),
        MusicContext::default(),
        &CancelToken::new(),
    )
    .expect("valid synthetic stream")
}

#[test]
fn test_short_stable_tone_yields_single_anchored_note() {
    init_logging();
    // 30 ms of stable pitch around A4; short, but isolated notes are kept
    let result = run(vec![
        pitch_frame(0.00, 440.0, 0.95),
        pitch_frame(0.01, 442.5, 0.93),
        pitch_frame(0.02, 440.0, 0.92),
    ]);

    assert_eq!(result.notes.len(), 1);
    let note = &result.notes[0];
    assert_eq!(note.anchor_midi, 69);
    assert_eq!(note.start_time, 0.0);
    assert!(
        (note.end_time - 0.03).abs() < 1e-9,
        "note should extend one hop past the last frame, got {}",
        note.end_time
    );
    assert_eq!(result.pitch_bends.len(), 3);
    assert!(
        result.pitch_bends.iter().all(|b| b.bend_value >= 0),
        "deviations above the anchor must never encode negative"
    );
}

#[test]
fn test_low_confidence_frames_are_unvoiced() {
    init_logging();
    // Confidence 0.59 sits just under the 0.6 threshold
    let frames: Vec<RawPitchFrame> = (0..20)
        .map(|i| pitch_frame(i as f64 * 0.01, 440.0, 0.59))
        .collect();
    let result = run(frames);

    assert!(result.notes.is_empty(), "sub-threshold confidence yields no notes");
    assert!(result
        .processed_frames
        .iter()
        .all(|f| !f.is_voiced && f.frequency == 0.0));
}

#[test]
fn test_unvoiced_gap_forces_note_boundary() {
    init_logging();
    // Two identical-pitch regions separated by a 60 ms silence; the gap
    // exceeds the 50 ms threshold so the pitch match must not rejoin them
    let mut frames = Vec::new();
    for i in 0..10 {
        frames.push(pitch_frame(i as f64 * 0.01, 440.0, 0.95));
    }
    for i in 10..16 {
        frames.push(pitch_frame(i as f64 * 0.01, 0.0, 0.05));
    }
    for i in 16..26 {
        frames.push(pitch_frame(i as f64 * 0.01, 440.0, 0.95));
    }
    let result = run(frames);

    assert_eq!(result.notes.len(), 2, "60 ms gap must split the note");
    assert_eq!(result.notes[0].anchor_midi, 69);
    assert_eq!(result.notes[1].anchor_midi, 69);
    assert!(
        result.notes[0].end_time <= result.notes[1].start_time,
        "notes must not overlap"
    );
}

#[test]
fn test_slow_glide_stays_one_note_with_bends() {
    init_logging();
    // A meend-style glide from A4 one semitone up over 400 ms; per-frame
    // movement is far below the jump threshold, so this is one note whose
    // curve survives as pitch bend
    let frames: Vec<RawPitchFrame> = (0..40)
        .map(|i| {
            let midi = 69.0 + i as f64 / 39.0;
            pitch_frame(i as f64 * 0.01, midi_to_hz(midi), 0.95)
        })
        .collect();
    let result = run(frames);

    assert_eq!(result.notes.len(), 1, "a glide is one note, not a fragment chain");
    assert_eq!(result.pitch_bends.len(), 40);
    let nonzero = result
        .pitch_bends
        .iter()
        .filter(|b| b.bend_value != 0)
        .count();
    assert!(nonzero > 10, "the glide must be encoded as bend, got {} nonzero", nonzero);
}

#[test]
fn test_octave_spike_does_not_split_or_survive() {
    init_logging();
    let mut frames = steady_contour(440.0, 30);
    // One frame detected an octave high
    frames[15].frequency = 880.0;
    let result = run(frames);

    assert_eq!(result.notes.len(), 1, "a single octave error must not split the note");
    assert_eq!(result.notes[0].anchor_midi, 69);
    assert!(
        result.pitch_bends.iter().all(|b| b.bend_value.abs() < 1000),
        "the spike should be smoothed away, not encoded as a huge bend"
    );
}

#[test]
fn test_cancellation_aborts_with_stage() {
    init_logging();
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = transcribe(
        &PitchInput {
            frames: steady_contour(440.0, 10),
            energy_db: None,
        },
        &TranscriptionConfig::default(),
        MusicContext::default(),
        &cancel,
    )
    .unwrap_err();
    assert!(matches!(err, melisma::EngineError::Cancelled { .. }));
}

#[test]
fn test_determinism_across_runs() {
    init_logging();
    let frames: Vec<RawPitchFrame> = (0..60)
        .map(|i| {
            // Vibrato around A4
            let midi = 69.0 + 0.3 * (i as f64 * 0.9).sin();
            pitch_frame(i as f64 * 0.01, midi_to_hz(midi), 0.9)
        })
        .collect();

    let a = run(frames.clone());
    let b = run(frames);

    let lab_a = render_frames_json(&a.processed_frames).unwrap();
    let lab_b = render_frames_json(&b.processed_frames).unwrap();
    assert_eq!(lab_a, lab_b, "identical input must render byte-identical output");
    assert_eq!(render_midi(&a).unwrap(), render_midi(&b).unwrap());
}

#[test]
fn test_midi_export_roundtrip() {
    init_logging();
    let mut result = run(steady_contour(440.0, 50));
    result.key = Some(KeyInfo {
        tonic: "A".to_string(),
        scale: "major".to_string(),
    });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("take.mid");
    export_midi(&result, &path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let smf = Smf::parse(&bytes).expect("exported file must be a valid SMF");
    assert_eq!(smf.tracks.len(), 2);

    let note_ons = smf.tracks[1]
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { .. },
                    ..
                }
            )
        })
        .count();
    assert_eq!(note_ons, 1);

    let bends = smf.tracks[1]
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                TrackEventKind::Midi {
                    message: MidiMessage::PitchBend { .. },
                    ..
                }
            )
        })
        .count();
    // One bend per frame plus the end-of-note reset
    assert_eq!(bends, 51);
}

#[test]
fn test_chord_pipeline_merges_identical_short_segments() {
    init_logging();
    // Three 40 ms fragments of the same chord collapse to one 120 ms segment
    let config = ChordConfig {
        hop_size_ms: 40.0,
        ..Default::default()
    };
    let input = ChordInput {
        frames: (0..3)
            .map(|i| RawChordFrame {
                time: i as f64 * 0.04,
                chord_label: "C:maj".to_string(),
                confidence: 0.9,
            })
            .collect(),
        duration: None,
    };
    let progression = detect_chords(&input, &config, MusicContext::default(), &CancelToken::new())
        .unwrap();

    assert_eq!(progression.chords.len(), 1);
    let chord = &progression.chords[0];
    assert_eq!(chord.chord_label, "C:maj");
    assert_eq!(chord.start_time, 0.0);
    assert!((chord.end_time - 0.12).abs() < 1e-9);
}

#[test]
fn test_chord_segments_tile_full_duration() {
    init_logging();
    let input = ChordInput {
        frames: vec![
            RawChordFrame {
                time: 0.0,
                chord_label: "C:maj".to_string(),
                confidence: 0.9,
            },
            RawChordFrame {
                time: 0.2,
                chord_label: "G:maj".to_string(),
                confidence: 0.85,
            },
        ],
        duration: Some(1.0),
    };
    let progression = detect_chords(
        &input,
        &ChordConfig::default(),
        MusicContext::default(),
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(progression.chords.first().unwrap().start_time, 0.0);
    assert_eq!(progression.chords.last().unwrap().end_time, 1.0);
    for pair in progression.chords.windows(2) {
        assert_eq!(
            pair[0].end_time, pair[1].start_time,
            "segments must tile with no gap or overlap"
        );
    }
}

#[test]
fn test_chord_exports_write_files() {
    init_logging();
    let input = ChordInput {
        frames: vec![RawChordFrame {
            time: 0.0,
            chord_label: "A:min/E".to_string(),
            confidence: 0.8,
        }],
        duration: Some(0.5),
    };
    let progression = detect_chords(
        &input,
        &ChordConfig::default(),
        MusicContext::default(),
        &CancelToken::new(),
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    for (format, name) in [
        (ChordExportFormat::Lab, "chords.lab"),
        (ChordExportFormat::Csv, "chords.csv"),
        (ChordExportFormat::Json, "chords.json"),
    ] {
        let path = dir.path().join(name);
        format.export(&progression, &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(
            contents.contains("A:min/E"),
            "{} export should carry the label",
            name
        );
    }

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("chords.json")).unwrap())
            .unwrap();
    assert_eq!(json["chords"][0]["bass"], "E");
}
