//! Chord progression exporters
//!
//! Three serialization contracts over the same progression, with no value
//! transformation in this layer: any numeric or field difference from the
//! published formats is a defect.
//!
//! - lab: tab-separated `start\tend\tlabel` lines, 6-decimal times;
//! - CSV: one row per segment with parsed label parts;
//! - JSON: progression header plus a segment array.

use std::path::Path;

use serde::Serialize;

use crate::chords::{ChordEvent, ChordProgression};
use crate::error::{EngineError, Stage};
use crate::output::write_atomic;
use crate::result::KeyInfo;

/// The closed set of chord export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordExportFormat {
    /// `start\tend\tlabel` lines
    Lab,
    /// `start_time,end_time,duration,chord_label,confidence,root,quality,bass`
    Csv,
    /// Progression object with `chords` array and `num_chords`
    Json,
}

impl ChordExportFormat {
    /// Render the progression in this format
    pub fn render(&self, progression: &ChordProgression) -> Result<String, EngineError> {
        match self {
            ChordExportFormat::Lab => Ok(render_lab(progression)),
            ChordExportFormat::Csv => Ok(render_csv(progression)),
            ChordExportFormat::Json => render_json(progression),
        }
    }

    /// Render and write atomically to `path`
    pub fn export(&self, progression: &ChordProgression, path: &Path) -> Result<(), EngineError> {
        let rendered = self.render(progression)?;
        write_atomic(path, rendered.as_bytes())?;
        log::info!(
            "Exported {} chords as {:?} to {}",
            progression.chords.len(),
            self,
            path.display()
        );
        Ok(())
    }
}

fn render_lab(progression: &ChordProgression) -> String {
    let mut out = String::new();
    for chord in &progression.chords {
        out.push_str(&format!(
            "{:.6}\t{:.6}\t{}\n",
            chord.start_time, chord.end_time, chord.chord_label
        ));
    }
    out
}

fn render_csv(progression: &ChordProgression) -> String {
    let mut out =
        String::from("start_time,end_time,duration,chord_label,confidence,root,quality,bass\n");
    for chord in &progression.chords {
        out.push_str(&format!(
            "{:.6},{:.6},{:.6},{},{:.4},{},{},{}\n",
            chord.start_time,
            chord.end_time,
            chord.duration(),
            chord.chord_label,
            chord.confidence,
            chord.root,
            chord.quality,
            chord.bass.as_deref().unwrap_or(""),
        ));
    }
    out
}

/// JSON segment shape, field order fixed by the export contract
#[derive(Serialize)]
struct ChordJson<'a> {
    start_time: f64,
    end_time: f64,
    root: &'a str,
    quality: &'a str,
    bass: Option<&'a str>,
    confidence: f64,
    label: &'a str,
}

impl<'a> From<&'a ChordEvent> for ChordJson<'a> {
    fn from(chord: &'a ChordEvent) -> Self {
        Self {
            start_time: chord.start_time,
            end_time: chord.end_time,
            root: &chord.root,
            quality: &chord.quality,
            bass: chord.bass.as_deref(),
            confidence: chord.confidence,
            label: &chord.chord_label,
        }
    }
}

#[derive(Serialize)]
struct ProgressionJson<'a> {
    duration: f64,
    tempo_bpm: f64,
    key: Option<&'a KeyInfo>,
    chords: Vec<ChordJson<'a>>,
    num_chords: usize,
}

fn render_json(progression: &ChordProgression) -> Result<String, EngineError> {
    let doc = ProgressionJson {
        duration: progression.duration,
        tempo_bpm: progression.tempo_bpm,
        key: progression.key.as_ref(),
        chords: progression.chords.iter().map(ChordJson::from).collect(),
        num_chords: progression.chords.len(),
    };

    serde_json::to_string_pretty(&doc).map_err(|err| EngineError::Serialization {
        stage: Stage::Export,
        reason: err.to_string(),
    })
}
