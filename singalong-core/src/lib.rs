//! # singalong-core
//!
//! Re-times a recording word by word so it follows another recording's
//! rhythm.
//!
//! ## Architecture
//!
//! ```text
//! AudioClip ─► WordBoundaryDetector ─► Vec<TimeInterval>
//!                 (Recognizer per call)        │
//!                                         split_words
//!                                              │
//!                                    duration(DurationSource)
//!                                              │
//!                               TimeStretcher (PhaseVocoder)
//!                                              │
//!                                    merge ─► AudioClip ─► to_pcm16
//! ```
//!
//! `Pipeline` strings the stages together. Each stage is also usable on its
//! own. Nothing is shared between calls except the recognizer factory.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod boundary;
pub mod buffering;
pub mod duration;
pub mod engine;
pub mod error;
pub mod recognizer;
pub mod report;
pub mod segment;
pub mod stretch;

// Convenience re-exports for downstream crates
pub use audio::{AudioClip, ClipView, OverflowPolicy};
pub use boundary::WordBoundaryDetector;
pub use duration::{duration, DurationSource};
pub use engine::{Alignment, Pipeline, PipelineConfig, StretchDirection};
pub use error::{Result, SingalongError};
pub use recognizer::{
    EnergyRecognizerFactory, RecognizedUnit, Recognizer, RecognizerFactory,
    ScriptedRecognizerFactory,
};
pub use report::{AlignmentReport, WordAlignment};
pub use segment::{segment, split_words, TimeInterval};
pub use stretch::{merge, stretch_to_duration, PhaseVocoder, TimeStretcher};

#[cfg(feature = "vosk")]
pub use recognizer::VoskRecognizerFactory;
