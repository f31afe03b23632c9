//! The sing-along inference pipeline.
//!
//! ## Stages (per call)
//!
//! ```text
//! 1. Detect word intervals in both clips (one recognizer each)
//! 2. Slice both clips into word views
//! 3. Zip to the shorter word list
//! 4. For each pair: target duration ─► stretch the source word to it
//! 5. Concatenate the stretched words in order
//! 6. Resample if an output rate is configured
//! ```
//!
//! Everything runs on the caller's thread. `Pipeline` holds no per-call
//! state, so one instance can serve concurrent callers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::{
    audio::{clip::AudioClip, resample::resample_clip},
    boundary::WordBoundaryDetector,
    duration::{duration, DurationSource},
    engine::{PipelineConfig, StretchDirection},
    error::Result,
    recognizer::RecognizerFactory,
    report::{AlignmentReport, WordAlignment},
    segment::{split_words, TimeInterval},
    stretch::{merge, stretch_to_duration, PhaseVocoder, TimeStretcher},
};

#[derive(Default)]
pub struct PipelineDiagnostics {
    pub detect_calls: AtomicUsize,
    pub inference_calls: AtomicUsize,
    pub words_stretched: AtomicUsize,
    pub silent_words: AtomicUsize,
    pub count_mismatches: AtomicUsize,
    pub frames_out: AtomicUsize,
}

impl PipelineDiagnostics {
    pub fn reset(&self) {
        self.detect_calls.store(0, Ordering::Relaxed);
        self.inference_calls.store(0, Ordering::Relaxed);
        self.words_stretched.store(0, Ordering::Relaxed);
        self.silent_words.store(0, Ordering::Relaxed);
        self.count_mismatches.store(0, Ordering::Relaxed);
        self.frames_out.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            detect_calls: self.detect_calls.load(Ordering::Relaxed),
            inference_calls: self.inference_calls.load(Ordering::Relaxed),
            words_stretched: self.words_stretched.load(Ordering::Relaxed),
            silent_words: self.silent_words.load(Ordering::Relaxed),
            count_mismatches: self.count_mismatches.load(Ordering::Relaxed),
            frames_out: self.frames_out.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub detect_calls: usize,
    pub inference_calls: usize,
    pub words_stretched: usize,
    pub silent_words: usize,
    pub count_mismatches: usize,
    pub frames_out: usize,
}

/// Merged output plus the per-word mapping that produced it.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub output: AudioClip,
    pub report: AlignmentReport,
}

pub struct Pipeline {
    config: PipelineConfig,
    detector: WordBoundaryDetector,
    stretcher: Arc<dyn TimeStretcher>,
    diagnostics: Arc<PipelineDiagnostics>,
}

impl Pipeline {
    /// # Errors
    /// `InvalidInput` for a zero chunk size or an unusable window size.
    pub fn new(config: PipelineConfig, factory: Arc<dyn RecognizerFactory>) -> Result<Self> {
        let detector = WordBoundaryDetector::new(factory)
            .with_chunk_frames(config.chunk_frames)?
            .with_pcm_scale(config.pcm_scale);
        let stretcher = Arc::new(PhaseVocoder::new(config.window_size)?);
        Ok(Self {
            config,
            detector,
            stretcher,
            diagnostics: Arc::new(PipelineDiagnostics::default()),
        })
    }

    /// Replace the phase vocoder with another stretcher.
    pub fn with_stretcher(mut self, stretcher: Arc<dyn TimeStretcher>) -> Self {
        self.stretcher = stretcher;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Word intervals of `clip`, in order.
    pub fn detect(&self, clip: &AudioClip) -> Result<Vec<TimeInterval>> {
        self.diagnostics.detect_calls.fetch_add(1, Ordering::Relaxed);
        self.detector.detect(clip)
    }

    /// Re-time `user` against `reference` and return only the audio.
    pub fn inference(&self, user: &AudioClip, reference: &AudioClip) -> Result<AudioClip> {
        Ok(self.align(user, reference)?.output)
    }

    /// Like [`inference`](Self::inference), quantised to 16-bit PCM with the
    /// configured overflow policy. Returns `(sample_rate, samples)`.
    pub fn inference_pcm16(
        &self,
        user: &AudioClip,
        reference: &AudioClip,
    ) -> Result<(u32, Vec<i16>)> {
        let out = self.inference(user, reference)?;
        let pcm = out.to_pcm16(self.config.overflow)?;
        Ok((out.sample_rate(), pcm))
    }

    /// Word-by-word alignment of the source clip onto the target's timing.
    ///
    /// Empty clips produce an empty output. When the two clips yield
    /// different word counts the extra words of the longer list are dropped.
    pub fn align(&self, user: &AudioClip, reference: &AudioClip) -> Result<Alignment> {
        let direction = self.config.direction;
        let span = info_span!(
            "inference",
            backend = self.detector.backend(),
            direction = %direction,
            user_frames = user.frames(),
            reference_frames = reference.frames(),
        );
        let _enter = span.enter();
        let started = Instant::now();
        self.diagnostics.inference_calls.fetch_add(1, Ordering::Relaxed);

        let (source, target) = match direction {
            StretchDirection::ReferenceToUser => (reference, user),
            StretchDirection::UserToReference => (user, reference),
        };

        let source_iv = self.detect(source)?;
        let target_iv = self.detect(target)?;
        if source_iv.len() != target_iv.len() {
            self.diagnostics.count_mismatches.fetch_add(1, Ordering::Relaxed);
            warn!(
                source_words = source_iv.len(),
                target_words = target_iv.len(),
                "word counts differ; extra words are dropped"
            );
        }

        let source_words = split_words(source, &source_iv);
        let target_words = split_words(target, &target_iv);

        let mut stretched = Vec::with_capacity(source_words.len().min(target_words.len()));
        let mut words = Vec::with_capacity(stretched.capacity());
        for (index, (src, tgt)) in source_words.iter().zip(&target_words).enumerate() {
            let target_secs = duration(DurationSource::View(*tgt))?;
            let (clip, ratio) = if src.is_empty() {
                self.diagnostics.silent_words.fetch_add(1, Ordering::Relaxed);
                let frames = (target_secs * f64::from(src.sample_rate())).round() as usize;
                let silence = AudioClip::silence(src.sample_rate(), src.channels(), frames)?;
                (silence, None)
            } else {
                let ratio = Some(target_secs / src.duration_secs()).filter(|r| *r > 0.0);
                let out = stretch_to_duration(self.stretcher.as_ref(), *src, target_secs)?;
                self.diagnostics.words_stretched.fetch_add(1, Ordering::Relaxed);
                (out, ratio)
            };
            debug!(
                index,
                source_frames = src.frames(),
                target_secs,
                out_frames = clip.frames(),
                "word aligned"
            );
            words.push(WordAlignment {
                index,
                source: source_iv[index],
                target: target_iv[index],
                ratio,
                output_frames: clip.frames(),
            });
            stretched.push(clip);
        }

        let merged = merge(source.sample_rate(), source.channels(), &stretched)?;
        let output = self.apply_output_rate(merged)?;
        self.diagnostics
            .frames_out
            .fetch_add(output.frames(), Ordering::Relaxed);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            words = words.len(),
            output_frames = output.frames(),
            output_rate = output.sample_rate(),
            elapsed_ms,
            "inference complete"
        );

        let report = AlignmentReport {
            backend: self.detector.backend().to_string(),
            direction,
            source_words: source_iv.len(),
            target_words: target_iv.len(),
            words,
            sample_rate: output.sample_rate(),
            output_frames: output.frames(),
            output_secs: output.duration_secs(),
            elapsed_ms,
        };
        Ok(Alignment { output, report })
    }

    /// Stretch the whole of `input` so it lasts `reference_secs`.
    pub fn fit_to_reference(&self, input: &AudioClip, reference_secs: f64) -> Result<AudioClip> {
        let _enter = info_span!("fit", input_frames = input.frames(), reference_secs).entered();
        let out = stretch_to_duration(self.stretcher.as_ref(), input.view(), reference_secs)?;
        let out = self.apply_output_rate(out)?;
        info!(
            input_secs = input.duration_secs(),
            output_secs = out.duration_secs(),
            "fit complete"
        );
        Ok(out)
    }

    fn apply_output_rate(&self, clip: AudioClip) -> Result<AudioClip> {
        match self.config.output_sample_rate {
            Some(rate) if rate != clip.sample_rate() => {
                debug!(from = clip.sample_rate(), to = rate, "resampling output");
                resample_clip(&clip, rate)
            }
            _ => Ok(clip),
        }
    }
}
