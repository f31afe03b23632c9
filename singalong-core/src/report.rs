//! Serializable summary of one alignment run.
//!
//! The CLI prints these as JSON so a caller can see which word was stretched
//! by how much without re-running detection.

use serde::Serialize;

use crate::engine::StretchDirection;
use crate::segment::TimeInterval;

// ---------------------------------------------------------------------------
// Per-word entries
// ---------------------------------------------------------------------------

/// How one source word was mapped onto its target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordAlignment {
    /// Position in the zipped word list.
    pub index: usize,
    /// Span of the word whose audio is kept.
    pub source: TimeInterval,
    /// Span of the word whose timing is copied.
    pub target: TimeInterval,
    /// `target / source` duration. `None` when either word had no frames:
    /// an empty source becomes silence, an empty target drops the word.
    pub ratio: Option<f64>,
    /// Frames this word contributes to the merged output.
    pub output_frames: usize,
}

// ---------------------------------------------------------------------------
// Whole-run summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentReport {
    /// Recognizer backend name (`energy`, `scripted`, `vosk`).
    pub backend: String,
    pub direction: StretchDirection,
    pub source_words: usize,
    pub target_words: usize,
    pub words: Vec<WordAlignment>,
    pub sample_rate: u32,
    pub output_frames: usize,
    pub output_secs: f64,
    pub elapsed_ms: u64,
}

impl AlignmentReport {
    /// `true` when both clips produced the same number of words.
    pub fn counts_match(&self) -> bool {
        self.source_words == self.target_words
    }
}
