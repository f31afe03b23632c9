//! Pitch-preserving time stretch by phase-vocoder resynthesis.
//!
//! ## Parameters
//!
//! | Parameter        | Value                      |
//! |------------------|----------------------------|
//! | Window           | periodic Hann, `N` samples |
//! | FFT size         | `N` (default 2048)         |
//! | Synthesis hop    | `Hs = N / 4`               |
//! | Analysis anchor  | `m · Hs / ratio`           |
//!
//! For each synthesis frame `m` two analysis frames are taken: one at the
//! anchor and one `Hs` samples earlier. Their phase difference gives each
//! bin's instantaneous frequency, which advances the synthesis phase by
//! `ω · Hs`. Frames are overlap-added with the same window and normalised by
//! the summed squared window, so a ratio of 1.0 reconstructs the input.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use tracing::debug;

use super::{check_ratio, output_frames, TimeStretcher};
use crate::audio::clip::{AudioClip, ClipView};
use crate::error::{Result, SingalongError};

pub const DEFAULT_WINDOW_SIZE: usize = 2_048;

pub struct PhaseVocoder {
    window_size: usize,
    hop: usize,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl PhaseVocoder {
    /// # Errors
    /// `InvalidInput` unless `window_size` is a multiple of 4 and at least 16.
    pub fn new(window_size: usize) -> Result<Self> {
        if window_size < 16 || window_size % 4 != 0 {
            return Err(SingalongError::InvalidInput(format!(
                "phase vocoder window must be a multiple of 4 and >= 16, got {window_size}"
            )));
        }
        Ok(Self::build(window_size))
    }

    fn build(window_size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            window_size,
            hop: window_size / 4,
            window: build_hann_window(window_size),
            forward: planner.plan_fft_forward(window_size),
            inverse: planner.plan_fft_inverse(window_size),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Stretch one channel to exactly `out_len` samples.
    fn stretch_channel(&self, input: &[f32], ratio: f64, out_len: usize) -> Vec<f32> {
        if input.is_empty() || out_len == 0 {
            return vec![0.0; out_len];
        }

        let n = self.window_size;
        let hop = self.hop;
        let half = n / 2;
        let bins = half + 1;

        // Centre frames on their anchor: frame at anchor `a` reads padded[a..a + n].
        let mut padded = vec![0.0f32; half];
        padded.extend_from_slice(input);
        padded.resize(padded.len() + half + n, 0.0);

        let frames = out_len / hop + n / hop + 2;
        let mut out = vec![0.0f32; frames * hop + n];
        let mut norm = vec![0.0f32; frames * hop + n];

        let mut cur = vec![Complex::new(0.0f32, 0.0); n];
        let mut prev = vec![Complex::new(0.0f32, 0.0); n];
        let mut phase = vec![0.0f32; bins];
        let omega: Vec<f32> = (0..bins)
            .map(|k| 2.0 * PI * k as f32 / n as f32)
            .collect();

        for m in 0..frames {
            let anchor = (m as f64 * hop as f64 / ratio).round() as isize;
            self.analyse(&padded, anchor, &mut cur);
            self.analyse(&padded, anchor - hop as isize, &mut prev);

            for k in 0..bins {
                let now = cur[k].arg();
                if m == 0 {
                    phase[k] = now;
                    continue;
                }
                let delta = princarg(now - prev[k].arg() - omega[k] * hop as f32);
                let advance = omega[k] * hop as f32 + delta;
                phase[k] = princarg(phase[k] + advance);
            }

            for k in 0..bins {
                cur[k] = Complex::from_polar(cur[k].norm(), phase[k]);
            }
            for k in 1..half {
                cur[n - k] = cur[k].conj();
            }
            self.inverse.process(&mut cur);

            let base = m * hop;
            let scale = 1.0 / n as f32;
            for i in 0..n {
                let w = self.window[i];
                out[base + i] += cur[i].re * scale * w;
                norm[base + i] += w * w;
            }
        }

        (0..out_len)
            .map(|i| {
                let w = norm[i + half];
                if w > 1e-6 {
                    out[i + half] / w
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Windowed FFT of `padded[start..start + n]`; indices outside are zero.
    fn analyse(&self, padded: &[f32], start: isize, buf: &mut [Complex<f32>]) {
        for (i, slot) in buf.iter_mut().enumerate() {
            let idx = start + i as isize;
            let s = if idx >= 0 {
                padded.get(idx as usize).copied().unwrap_or(0.0)
            } else {
                0.0
            };
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.forward.process(buf);
    }
}

impl Default for PhaseVocoder {
    fn default() -> Self {
        Self::build(DEFAULT_WINDOW_SIZE)
    }
}

impl TimeStretcher for PhaseVocoder {
    fn stretch(&self, input: ClipView<'_>, ratio: f64) -> Result<AudioClip> {
        check_ratio(ratio)?;
        let out_len = output_frames(input.frames(), ratio);
        debug!(
            frames = input.frames(),
            out_len,
            ratio,
            window = self.window_size,
            "phase vocoder stretch"
        );

        let channels = (0..usize::from(input.channels()))
            .map(|c| self.stretch_channel(&input.channel(c), ratio, out_len))
            .collect();
        AudioClip::from_channels(input.sample_rate(), channels)
    }
}

fn build_hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos()))
        .collect()
}

/// Wrap a phase to [-π, π].
fn princarg(p: f32) -> f32 {
    p - 2.0 * PI * (p / (2.0 * PI)).round()
}
