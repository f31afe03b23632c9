//! Whole-clip sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! Used when the merged output must be delivered at a rate other than the
//! reference track's. The clip is fed through in fixed `chunk_size` blocks,
//! the tail is flushed with `process_partial_into_buffer`, and the
//! resampler's startup delay is trimmed so the output lines up with the input.
//!
//! When source rate == target rate the clip is returned unchanged and no
//! rubato session is created.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

use crate::audio::clip::AudioClip;
use crate::error::{Result, SingalongError};

/// Input frames per rubato call.
pub const DEFAULT_RESAMPLE_CHUNK: usize = 1024;

/// Converts interleaved f32 audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when source rate == target rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    target_rate: u32,
    channels: usize,
    chunk_size: usize,
    ratio: f64,
}

impl RateConverter {
    /// Create a new converter.
    ///
    /// # Errors
    /// Returns `SingalongError::Resample` if rubato fails to initialise.
    pub fn new(source_rate: u32, target_rate: u32, channels: u16, chunk_size: usize) -> Result<Self> {
        if source_rate == 0 || target_rate == 0 || channels == 0 || chunk_size == 0 {
            return Err(SingalongError::InvalidInput(format!(
                "resampler parameters must be non-zero (from={source_rate} to={target_rate} \
                 channels={channels} chunk={chunk_size})"
            )));
        }

        let ratio = target_rate as f64 / source_rate as f64;
        let channels = usize::from(channels);

        if source_rate == target_rate {
            return Ok(Self {
                resampler: None,
                target_rate,
                channels,
                chunk_size,
                ratio,
            });
        }

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio
            PolynomialDegree::Cubic,
            chunk_size,
            channels,
        )
        .map_err(|e| SingalongError::Resample(format!("init: {e}")))?;

        debug!(source_rate, target_rate, chunk_size, "resampling enabled");

        Ok(Self {
            resampler: Some(resampler),
            target_rate,
            channels,
            chunk_size,
            ratio,
        })
    }

    /// Returns `true` when source rate == target rate (no resampling occurs).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }

    /// Resample a whole clip. The output has `round(frames × ratio)` frames.
    pub fn process(&mut self, clip: &AudioClip) -> Result<AudioClip> {
        if usize::from(clip.channels()) != self.channels {
            return Err(SingalongError::InvalidInput(format!(
                "converter built for {} channels, clip has {}",
                self.channels,
                clip.channels()
            )));
        }

        let Some(ref mut resampler) = self.resampler else {
            return Ok(clip.clone());
        };

        let expected = (clip.frames() as f64 * self.ratio).round() as usize;
        let input: Vec<Vec<f32>> = (0..self.channels).map(|c| clip.view().channel(c)).collect();
        let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + 64); self.channels];
        let mut out_buf = vec![vec![0f32; resampler.output_frames_max()]; self.channels];

        let delay = resampler.output_delay();
        let total = clip.frames();
        let mut pos = 0usize;

        while pos + self.chunk_size <= total {
            let block: Vec<&[f32]> = input.iter().map(|c| &c[pos..pos + self.chunk_size]).collect();
            let (_, produced) = resampler
                .process_into_buffer(block.as_slice(), &mut out_buf, None)
                .map_err(|e| SingalongError::Resample(e.to_string()))?;
            append(&mut output, &out_buf, produced);
            pos += self.chunk_size;
        }

        if pos < total {
            let block: Vec<&[f32]> = input.iter().map(|c| &c[pos..]).collect();
            let (_, produced) = resampler
                .process_partial_into_buffer(Some(block.as_slice()), &mut out_buf, None)
                .map_err(|e| SingalongError::Resample(e.to_string()))?;
            append(&mut output, &out_buf, produced);
        }

        // Flush the filter delay with empty input until we have enough frames.
        let mut guard = 0;
        while output[0].len() < expected + delay && guard < 16 {
            let (_, produced) = resampler
                .process_partial_into_buffer(None::<&[&[f32]]>, &mut out_buf, None)
                .map_err(|e| SingalongError::Resample(e.to_string()))?;
            append(&mut output, &out_buf, produced);
            guard += 1;
        }
        resampler.reset();

        let channels = output
            .into_iter()
            .map(|mut c| {
                let start = delay.min(c.len());
                c.drain(..start);
                c.resize(expected, 0.0);
                c
            })
            .collect();

        AudioClip::from_channels(self.target_rate, channels)
    }
}

/// Convenience wrapper: resample `clip` to `target_rate`.
pub fn resample_clip(clip: &AudioClip, target_rate: u32) -> Result<AudioClip> {
    let mut rc = RateConverter::new(
        clip.sample_rate(),
        target_rate,
        clip.channels(),
        DEFAULT_RESAMPLE_CHUNK,
    )?;
    rc.process(clip)
}

fn append(output: &mut [Vec<f32>], buf: &[Vec<f32>], produced: usize) {
    for (dst, src) in output.iter_mut().zip(buf) {
        dst.extend_from_slice(&src[..produced]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_identity() {
        let samples: Vec<f32> = (0..480).map(|i| i as f32 * 0.001).collect();
        let clip = AudioClip::mono(16_000, samples).unwrap();
        let mut rc = RateConverter::new(16_000, 16_000, 1, 960).unwrap();
        assert!(rc.is_passthrough());
        assert_eq!(rc.process(&clip).unwrap(), clip);
    }

    #[test]
    fn ratio_48k_to_16k_correct_length() {
        let clip = AudioClip::silence(48_000, 1, 4_800).unwrap();
        let out = resample_clip(&clip, 16_000).unwrap();
        assert_eq!(out.sample_rate(), 16_000);
        assert_eq!(out.frames(), 1_600);
    }

    #[test]
    fn stereo_upsampling_keeps_channels() {
        let clip = AudioClip::silence(22_050, 2, 2_205).unwrap();
        let out = resample_clip(&clip, 44_100).unwrap();
        assert_eq!(out.channels(), 2);
        assert_eq!(out.frames(), 4_410);
    }

    #[test]
    fn dc_level_survives_conversion() {
        let clip = AudioClip::mono(48_000, vec![0.5; 9_600]).unwrap();
        let out = resample_clip(&clip, 16_000).unwrap();
        // Skip the edges where the interpolator sees zero padding.
        let mid = &out.samples()[400..2_800];
        assert!(mid.iter().all(|s| (s - 0.5).abs() < 0.05), "DC level drifted");
    }

    #[test]
    fn zero_rate_is_rejected() {
        assert!(RateConverter::new(0, 16_000, 1, 960).is_err());
    }
}
