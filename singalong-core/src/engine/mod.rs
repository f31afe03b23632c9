//! Pipeline configuration.
//!
//! ## Flow
//!
//! ```text
//! user clip ──► detect ──► split_words ─┐
//!                                       ├─► zip words ─► stretch source to target ─► merge
//! reference ──► detect ──► split_words ─┘                                            │
//!                                                           optional resample ◄──────┘
//! ```
//!
//! Which side is the source is set by [`StretchDirection`].

pub mod pipeline;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::audio::clip::OverflowPolicy;
use crate::buffering::{DEFAULT_CHUNK_FRAMES, DEFAULT_PCM_SCALE};
use crate::error::SingalongError;
use crate::stretch::phase_vocoder::DEFAULT_WINDOW_SIZE;

pub use pipeline::{Alignment, DiagnosticsSnapshot, Pipeline, PipelineDiagnostics};

/// Which clip supplies the audio and which supplies the timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StretchDirection {
    /// Reference words are re-timed to the user's word durations.
    #[default]
    ReferenceToUser,
    /// User words are re-timed to the reference's word durations.
    UserToReference,
}

impl fmt::Display for StretchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReferenceToUser => "reference-to-user",
            Self::UserToReference => "user-to-reference",
        })
    }
}

impl FromStr for StretchDirection {
    type Err = SingalongError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reference-to-user" | "reference" => Ok(Self::ReferenceToUser),
            "user-to-reference" | "user" => Ok(Self::UserToReference),
            other => Err(SingalongError::InvalidInput(format!(
                "unknown stretch direction '{other}'"
            ))),
        }
    }
}

/// Configuration for [`Pipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Frames per recognizer call. Default: 4000.
    pub chunk_frames: usize,
    /// f32 → i16 multiplier for recognizer input. Default: 32768.
    pub pcm_scale: f32,
    /// Phase vocoder FFT window. Default: 2048.
    pub window_size: usize,
    /// What `inference_pcm16` does with samples outside [-1, 1].
    pub overflow: OverflowPolicy,
    pub direction: StretchDirection,
    /// Resample the merged output to this rate. `None` keeps the source rate.
    pub output_sample_rate: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            pcm_scale: DEFAULT_PCM_SCALE,
            window_size: DEFAULT_WINDOW_SIZE,
            overflow: OverflowPolicy::Saturate,
            direction: StretchDirection::ReferenceToUser,
            output_sample_rate: None,
        }
    }
}
