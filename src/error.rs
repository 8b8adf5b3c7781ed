//! Error types for the segmentation and encoding engine

use std::fmt;

/// Pipeline stage identifiers, used for structured error context and
/// cancellation reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Frame ingestion and validation
    Ingest,
    /// Voicing and confidence filtering
    Voicing,
    /// Median filtering and octave correction
    Smoothing,
    /// Note boundary detection and merging
    Segmentation,
    /// Anchor pitch and pitch-bend encoding
    BendEncoding,
    /// MIDI event serialization
    MidiSerialization,
    /// Chord post-processing
    ChordPostProcessing,
    /// Chord/frame export rendering
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingest => "ingest",
            Stage::Voicing => "voicing",
            Stage::Smoothing => "smoothing",
            Stage::Segmentation => "segmentation",
            Stage::BendEncoding => "bend-encoding",
            Stage::MidiSerialization => "midi-serialization",
            Stage::ChordPostProcessing => "chord-post-processing",
            Stage::Export => "export",
        };
        write!(f, "{}", name)
    }
}

/// Errors that can occur during a pipeline run
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Malformed input frame stream (non-monotonic timestamps, mismatched
    /// parallel array lengths). Fatal for the run.
    InvalidFrameStream {
        /// Stage that detected the problem
        stage: Stage,
        /// Index of the offending frame
        index: usize,
        /// Human-readable description
        reason: String,
    },

    /// Configuration value outside its valid domain. Raised at engine
    /// construction, before any frame is processed.
    InvalidConfig {
        /// Name of the offending configuration field
        field: &'static str,
        /// Human-readable description
        reason: String,
    },

    /// Encoding or export rendering failure
    Serialization {
        /// Stage that failed
        stage: Stage,
        /// Human-readable description
        reason: String,
    },

    /// Export file I/O failure (temporary write or atomic finalize)
    Io(String),

    /// Run was cancelled between stages; no partial output was produced
    Cancelled {
        /// Stage boundary at which cancellation was observed
        stage: Stage,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidFrameStream {
                stage,
                index,
                reason,
            } => {
                write!(
                    f,
                    "Invalid frame stream at {} (frame {}): {}",
                    stage, index, reason
                )
            }
            EngineError::InvalidConfig { field, reason } => {
                write!(f, "Invalid config `{}`: {}", field, reason)
            }
            EngineError::Serialization { stage, reason } => {
                write!(f, "Serialization error at {}: {}", stage, reason)
            }
            EngineError::Io(msg) => write!(f, "Export I/O error: {}", msg),
            EngineError::Cancelled { stage } => {
                write!(f, "Run cancelled before {}", stage)
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_context() {
        let err = EngineError::InvalidFrameStream {
            stage: Stage::Ingest,
            index: 42,
            reason: "timestamp regressed".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ingest"), "message should name the stage: {}", msg);
        assert!(msg.contains("42"), "message should include the index: {}", msg);
    }

    #[test]
    fn test_config_error_names_field() {
        let err = EngineError::InvalidConfig {
            field: "confidence_threshold",
            reason: "must be within [0, 1]".to_string(),
        };
        assert!(err.to_string().contains("confidence_threshold"));
    }

    #[test]
    fn test_cancelled_names_stage() {
        let err = EngineError::Cancelled {
            stage: Stage::Segmentation,
        };
        assert!(err.to_string().contains("segmentation"));
    }
}
