//! Standard MIDI File serialization
//!
//! Emits a two-track SMF: a metadata track (tempo, 4/4 time signature,
//! optional key signature) and a performance track carrying Note-On,
//! Pitch-Wheel, and Note-Off events. Events across all notes are merged
//! into one globally time-ordered stream; ties at an identical tick are
//! ordered Note-Off, then Note-On, then Pitch-Wheel, so a note ending at a
//! boundary instant never overlaps the note starting there. Each note ends
//! with a wheel reset to center so bend state cannot leak into the next
//! note on the channel.

use std::io::Cursor;
use std::path::Path;

use midly::num::{u15, u24, u28, u4, u7};
use midly::{
    Format, Header, MetaMessage, MidiMessage, PitchBend, Smf, Track, TrackEvent, TrackEventKind,
    Timing,
};

use crate::error::{EngineError, Stage};
use crate::output::write_atomic;
use crate::result::TranscriptionResult;

/// SMF resolution in ticks per quarter note
pub const TICKS_PER_BEAT: u16 = 480;

/// Tie-break ranks for events sharing a tick
const RANK_NOTE_OFF: u8 = 0;
const RANK_NOTE_ON: u8 = 1;
const RANK_PITCH_WHEEL: u8 = 2;

struct AbsoluteEvent {
    tick: u32,
    rank: u8,
    kind: TrackEventKind<'static>,
}

/// Serialize a transcription into SMF bytes
///
/// # Errors
///
/// Returns `EngineError::Serialization` when the tempo is non-positive,
/// the bend stream does not line up with the note contours, or the SMF
/// writer fails.
pub fn render_midi(result: &TranscriptionResult) -> Result<Vec<u8>, EngineError> {
    if !(result.tempo_bpm.is_finite() && result.tempo_bpm > 0.0) {
        return Err(EngineError::Serialization {
            stage: Stage::MidiSerialization,
            reason: format!("tempo must be positive, got {}", result.tempo_bpm),
        });
    }

    let ticks_per_second = TICKS_PER_BEAT as f64 * result.tempo_bpm / 60.0;
    let micros_per_beat = (60_000_000.0 / result.tempo_bpm).round() as u32;

    let mut smf = Smf::new(Header {
        format: Format::Parallel,
        timing: Timing::Metrical(u15::new(TICKS_PER_BEAT)),
    });

    // Track 0: metadata
    let mut meta_track = Track::new();
    meta_track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros_per_beat))),
    });
    meta_track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8)),
    });
    if let Some(key) = &result.key {
        let minor = key.is_minor();
        meta_track.push(TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::KeySignature(
                key_signature_sharps(&key.tonic, minor),
                minor,
            )),
        });
    }
    meta_track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(meta_track);

    // Track 1: performance
    let mut events = Vec::new();
    let channel = u4::new(0);
    let mut bend_cursor = 0usize;

    for note in &result.notes {
        let start_tick = seconds_to_ticks(note.start_time, ticks_per_second);
        let end_tick = seconds_to_ticks(note.end_time, ticks_per_second).max(start_tick + 1);
        let key = u7::new(note.anchor_midi.min(127));
        let vel = u7::new(note.velocity.clamp(1, 127));

        events.push(AbsoluteEvent {
            tick: start_tick,
            rank: RANK_NOTE_ON,
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn { key, vel },
            },
        });

        let bend_count = note.pitch_contour.len();
        if bend_cursor + bend_count > result.pitch_bends.len() {
            return Err(EngineError::Serialization {
                stage: Stage::MidiSerialization,
                reason: format!(
                    "bend stream exhausted: need {} events at offset {}, have {}",
                    bend_count,
                    bend_cursor,
                    result.pitch_bends.len()
                ),
            });
        }
        for bend in &result.pitch_bends[bend_cursor..bend_cursor + bend_count] {
            events.push(AbsoluteEvent {
                tick: seconds_to_ticks(bend.time, ticks_per_second).clamp(start_tick, end_tick),
                rank: RANK_PITCH_WHEEL,
                kind: wheel_event(channel, bend.bend_value),
            });
        }
        bend_cursor += bend_count;

        events.push(AbsoluteEvent {
            tick: end_tick,
            rank: RANK_NOTE_OFF,
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff { key, vel: u7::new(0) },
            },
        });

        // Implicit reset: trailing wheel state never leaks into the next note
        events.push(AbsoluteEvent {
            tick: end_tick,
            rank: RANK_PITCH_WHEEL,
            kind: wheel_event(channel, 0),
        });
    }

    if bend_cursor != result.pitch_bends.len() {
        return Err(EngineError::Serialization {
            stage: Stage::MidiSerialization,
            reason: format!(
                "{} pitch-bend events not owned by any note",
                result.pitch_bends.len() - bend_cursor
            ),
        });
    }

    // Stable sort preserves per-note emission order among equal (tick, rank)
    // pairs, so a reset always precedes the next note's first wheel sample
    events.sort_by_key(|e| (e.tick, e.rank));

    let mut performance = Track::new();
    performance.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(b"Vocals")),
    });
    let mut current_tick = 0u32;
    for event in events {
        let delta: u28 = (event.tick - current_tick).into();
        performance.push(TrackEvent {
            delta,
            kind: event.kind,
        });
        current_tick = event.tick;
    }
    performance.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(performance);

    let mut buffer = Vec::new();
    smf.write_std(&mut Cursor::new(&mut buffer))
        .map_err(|err| EngineError::Serialization {
            stage: Stage::MidiSerialization,
            reason: err.to_string(),
        })?;

    log::debug!(
        "Serialized {} notes / {} bends into {} bytes of SMF",
        result.notes.len(),
        result.pitch_bends.len(),
        buffer.len()
    );

    Ok(buffer)
}

/// Serialize and write atomically to `path`
pub fn export_midi(result: &TranscriptionResult, path: &Path) -> Result<(), EngineError> {
    let bytes = render_midi(result)?;
    write_atomic(path, &bytes)?;
    log::info!("Exported MIDI ({} notes) to {}", result.notes.len(), path.display());
    Ok(())
}

fn seconds_to_ticks(seconds: f64, ticks_per_second: f64) -> u32 {
    (seconds * ticks_per_second).round().max(0.0) as u32
}

fn wheel_event(channel: u4, bend_value: i16) -> TrackEventKind<'static> {
    // 14-bit wheel: stored value is signed offset from center 0x2000
    let raw = (bend_value as i32 + 0x2000).clamp(0, 0x3FFF) as u16;
    TrackEventKind::Midi {
        channel,
        message: MidiMessage::PitchBend {
            bend: PitchBend(raw.into()),
        },
    }
}

/// Sharps (positive) or flats (negative) for a key signature meta event
fn key_signature_sharps(tonic: &str, minor: bool) -> i8 {
    if minor {
        match tonic {
            "A" => 0,
            "E" => 1,
            "B" => 2,
            "F#" => 3,
            "C#" => 4,
            "G#" => 5,
            "D#" => 6,
            "A#" => 7,
            "D" => -1,
            "G" => -2,
            "C" => -3,
            "F" => -4,
            "Bb" => -5,
            "Eb" => -6,
            "Ab" => -7,
            _ => 0,
        }
    } else {
        match tonic {
            "C" => 0,
            "G" => 1,
            "D" => 2,
            "A" => 3,
            "E" => 4,
            "B" => 5,
            "F#" => 6,
            "C#" => 7,
            "F" => -1,
            "Bb" => -2,
            "Eb" => -3,
            "Ab" => -4,
            "Db" => -5,
            "Gb" => -6,
            "Cb" => -7,
            _ => 0,
        }
    }
}
