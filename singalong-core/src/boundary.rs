//! Word boundary detection.
//!
//! ```text
//! AudioClip ─► downmix ─► i16 PCM ─► chunks of N frames ─► Recognizer
//!                                                            │
//!                                          final_result JSON ┘
//!                                                  │
//!                                  Vec<TimeInterval> sorted by start
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::audio::clip::AudioClip;
use crate::buffering::{pcm_chunks, to_recognizer_pcm, DEFAULT_CHUNK_FRAMES, DEFAULT_PCM_SCALE};
use crate::error::{Result, SingalongError};
use crate::recognizer::{parse_final_result, RecognizedUnit, RecognizerFactory};
use crate::segment::TimeInterval;

/// Runs a fresh recognizer over a clip and reports where the words are.
#[derive(Clone)]
pub struct WordBoundaryDetector {
    factory: Arc<dyn RecognizerFactory>,
    chunk_frames: usize,
    pcm_scale: f32,
}

impl WordBoundaryDetector {
    /// Detector with the default chunk size (4000 frames) and PCM scale.
    pub fn new(factory: Arc<dyn RecognizerFactory>) -> Self {
        Self {
            factory,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            pcm_scale: DEFAULT_PCM_SCALE,
        }
    }

    /// # Errors
    /// `InvalidInput` when `chunk_frames` is zero.
    pub fn with_chunk_frames(mut self, chunk_frames: usize) -> Result<Self> {
        if chunk_frames == 0 {
            return Err(SingalongError::InvalidInput(
                "chunk size must be at least one frame".into(),
            ));
        }
        self.chunk_frames = chunk_frames;
        Ok(self)
    }

    pub fn with_pcm_scale(mut self, pcm_scale: f32) -> Self {
        self.pcm_scale = pcm_scale;
        self
    }

    pub fn chunk_frames(&self) -> usize {
        self.chunk_frames
    }

    pub fn backend(&self) -> &str {
        self.factory.name()
    }

    /// Raw recognised units, in the order the engine reported them.
    ///
    /// The recognizer is created here and dropped before returning, on
    /// success and on error alike.
    pub fn recognize(&self, clip: &AudioClip) -> Result<Vec<RecognizedUnit>> {
        let mono = clip.to_mono();
        let pcm = to_recognizer_pcm(&mono, self.pcm_scale)?;
        let chunks = pcm_chunks(&pcm, self.chunk_frames)?;

        let mut recognizer = self.factory.create(clip.sample_rate())?;
        let mut fed = 0usize;
        for chunk in chunks {
            recognizer.accept_waveform(chunk)?;
            fed += 1;
        }
        let json = recognizer.final_result()?;
        let units = parse_final_result(&json)?;

        debug!(
            backend = self.factory.name(),
            sample_rate = clip.sample_rate(),
            frames = clip.frames(),
            chunks = fed,
            units = units.len(),
            "recognition finished"
        );
        Ok(units)
    }

    /// Word intervals in chronological order. Silence gives an empty list.
    ///
    /// # Errors
    /// `EngineInit` if no recognizer can be built, `Recognition` or `Json`
    /// if the engine misbehaves, `InvalidInterval` for a unit with negative,
    /// non-finite or reversed times.
    pub fn detect(&self, clip: &AudioClip) -> Result<Vec<TimeInterval>> {
        let mut intervals = self
            .recognize(clip)?
            .into_iter()
            .map(|u| TimeInterval::new(u.start, u.end))
            .collect::<Result<Vec<_>>>()?;
        intervals.sort_by(|a, b| a.start().total_cmp(&b.start()));
        Ok(intervals)
    }
}
