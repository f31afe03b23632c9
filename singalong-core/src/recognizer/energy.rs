//! Energy-based recognizer: RMS threshold + hangover counter.
//!
//! Needs no model. Each contiguous run of voiced frames becomes one unit, which
//! is a reasonable stand-in for sung words separated by breaths or consonants.
//!
//! ## Algorithm
//!
//! 1. Split incoming PCM into `frame_ms` frames and compute each frame's RMS.
//! 2. If RMS ≥ `threshold` → voiced, reset hangover counter.
//! 3. If RMS < `threshold` and hangover counter > 0 → still voiced,
//!    decrement counter (bridges short dips inside a word).
//! 4. Otherwise → silent; an open run is closed at its last loud frame.
//!
//! Runs shorter than `min_unit_ms` are discarded as clicks.

use tracing::debug;

use super::{render_final_result, RecognizedUnit, Recognizer, RecognizerFactory};
use crate::error::{Result, SingalongError};

/// Tuning for [`EnergyRecognizer`].
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyRecognizerConfig {
    /// RMS amplitude threshold in [0, 1]. Default: `0.02`.
    pub threshold: f32,
    /// Silent frames still counted as voiced after a loud one. Default: `8`.
    pub hangover_frames: u32,
    /// Analysis frame length. Default: `20` ms.
    pub frame_ms: u32,
    /// Shortest unit kept. Default: `60` ms.
    pub min_unit_ms: u32,
}

impl Default for EnergyRecognizerConfig {
    fn default() -> Self {
        Self {
            threshold: 0.02,
            hangover_frames: 8,
            frame_ms: 20,
            min_unit_ms: 60,
        }
    }
}

/// Frame classifier with hangover.
#[derive(Debug, Clone)]
struct EnergyVad {
    threshold: f32,
    hangover_frames: u32,
    hangover_counter: u32,
}

impl EnergyVad {
    fn new(threshold: f32, hangover_frames: u32) -> Self {
        Self {
            threshold,
            hangover_frames,
            hangover_counter: 0,
        }
    }

    /// Returns `(voiced, loud)`.
    fn classify(&mut self, frame: &[f32]) -> (bool, bool) {
        if rms(frame) >= self.threshold {
            self.hangover_counter = self.hangover_frames;
            (true, true)
        } else if self.hangover_counter > 0 {
            self.hangover_counter -= 1;
            (true, false)
        } else {
            (false, false)
        }
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

pub struct EnergyRecognizer {
    sample_rate: u32,
    frame_len: usize,
    min_unit_frames: usize,
    vad: EnergyVad,
    pending: Vec<f32>,
    frame_index: usize,
    total_samples: usize,
    /// `(first frame, last loud frame)` of the open run.
    run: Option<(usize, usize)>,
    units: Vec<RecognizedUnit>,
}

impl EnergyRecognizer {
    pub fn new(sample_rate: u32, config: &EnergyRecognizerConfig) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SingalongError::EngineInit("sample rate must be > 0".into()));
        }
        let frame_len = (sample_rate as u64 * config.frame_ms as u64 / 1_000) as usize;
        if frame_len == 0 {
            return Err(SingalongError::EngineInit(format!(
                "{} ms frames are empty at {} Hz",
                config.frame_ms, sample_rate
            )));
        }
        let min_unit_frames = (config.min_unit_ms as usize).div_ceil(config.frame_ms.max(1) as usize);

        Ok(Self {
            sample_rate,
            frame_len,
            min_unit_frames,
            vad: EnergyVad::new(config.threshold, config.hangover_frames),
            pending: Vec::with_capacity(frame_len),
            frame_index: 0,
            total_samples: 0,
            run: None,
            units: Vec::new(),
        })
    }

    fn process_frame(&mut self, frame: &[f32]) {
        let (voiced, loud) = self.vad.classify(frame);
        let idx = self.frame_index;
        self.frame_index += 1;

        match (self.run, voiced) {
            (None, true) if loud => self.run = Some((idx, idx)),
            (None, _) => {}
            (Some((start, _)), true) if loud => self.run = Some((start, idx)),
            (Some(_), true) => {}
            (Some(_), false) => self.close_run(),
        }
    }

    fn close_run(&mut self) {
        let Some((first, last_loud)) = self.run.take() else {
            return;
        };
        let frames = last_loud + 1 - first;
        if frames < self.min_unit_frames {
            debug!(first, frames, "dropping short energy run");
            return;
        }
        let rate = self.sample_rate as f64;
        let start = (first * self.frame_len) as f64 / rate;
        let end_sample = ((last_loud + 1) * self.frame_len).min(self.total_samples);
        self.units
            .push(RecognizedUnit::new(start, end_sample as f64 / rate));
    }
}

impl Recognizer for EnergyRecognizer {
    fn accept_waveform(&mut self, pcm: &[i16]) -> Result<()> {
        self.total_samples += pcm.len();
        for &v in pcm {
            self.pending.push(v as f32 / 32_768.0);
            if self.pending.len() == self.frame_len {
                let frame = std::mem::take(&mut self.pending);
                self.process_frame(&frame);
                self.pending = frame;
                self.pending.clear();
            }
        }
        Ok(())
    }

    fn final_result(&mut self) -> Result<String> {
        if !self.pending.is_empty() {
            let frame = std::mem::take(&mut self.pending);
            self.process_frame(&frame);
        }
        self.close_run();
        render_final_result(&std::mem::take(&mut self.units))
    }
}

/// Factory for [`EnergyRecognizer`].
#[derive(Debug, Clone, Default)]
pub struct EnergyRecognizerFactory {
    config: EnergyRecognizerConfig,
}

impl EnergyRecognizerFactory {
    pub fn new(config: EnergyRecognizerConfig) -> Self {
        Self { config }
    }
}

impl RecognizerFactory for EnergyRecognizerFactory {
    fn name(&self) -> &str {
        "energy"
    }

    fn create(&self, sample_rate: u32) -> Result<Box<dyn Recognizer>> {
        Ok(Box::new(EnergyRecognizer::new(sample_rate, &self.config)?))
    }
}
