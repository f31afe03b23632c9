//! Owned and borrowed audio buffers.
//!
//! Samples are interleaved f32 in the nominal range [-1.0, 1.0]. Every
//! constructor takes the sample rate first, then the channel count, then the
//! samples.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SingalongError};

/// Full-scale multiplier used when writing 16-bit PCM files.
pub const PCM16_WRITE_SCALE: f32 = i16::MAX as f32;

/// Full-scale divisor used when reading 16-bit PCM.
pub const PCM16_READ_SCALE: f32 = 32768.0;

/// What to do with samples that fall outside the 16-bit range after scaling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Clamp to `i16::MIN..=i16::MAX`. Clipped samples are counted and logged.
    #[default]
    Saturate,
    /// Fail with `NumericOverflow` on the first out-of-range sample.
    Reject,
}

/// A block of interleaved PCM samples at a known rate and channel count.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
}

impl AudioClip {
    /// # Errors
    /// `InvalidInput` for a zero rate, zero channels, or a sample count that is
    /// not a whole number of frames.
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Result<Self> {
        check_format(sample_rate, channels)?;
        if samples.len() % usize::from(channels) != 0 {
            return Err(SingalongError::InvalidInput(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            samples,
        })
    }

    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Result<Self> {
        Self::new(sample_rate, 1, samples)
    }

    pub fn silence(sample_rate: u32, channels: u16, frames: usize) -> Result<Self> {
        Self::new(sample_rate, channels, vec![0.0; frames * usize::from(channels)])
    }

    pub fn empty(sample_rate: u32, channels: u16) -> Result<Self> {
        Self::new(sample_rate, channels, Vec::new())
    }

    /// Build a clip from one sample vector per channel. All channels must be
    /// the same length.
    pub fn from_channels(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        let count = u16::try_from(channels.len()).map_err(|_| {
            SingalongError::InvalidInput(format!("too many channels: {}", channels.len()))
        })?;
        check_format(sample_rate, count)?;

        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(SingalongError::InvalidInput(
                "channel buffers differ in length".into(),
            ));
        }

        if count == 1 {
            return Self::new(sample_rate, 1, channels.into_iter().flatten().collect());
        }

        let mut samples = Vec::with_capacity(frames * channels.len());
        for f in 0..frames {
            for ch in &channels {
                samples.push(ch[f]);
            }
        }
        Self::new(sample_rate, count, samples)
    }

    /// Decode 16-bit PCM (`v / 32768`).
    pub fn from_pcm16(sample_rate: u32, channels: u16, pcm: &[i16]) -> Result<Self> {
        let samples = pcm.iter().map(|&v| v as f32 / PCM16_READ_SCALE).collect();
        Self::new(sample_rate, channels, samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    /// Returns the duration of this clip in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Borrow the whole clip.
    pub fn view(&self) -> ClipView<'_> {
        ClipView {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples: &self.samples,
        }
    }

    /// Borrow frames `start..end`. Bounds are clipped to the clip length.
    pub fn frame_range(&self, start: usize, end: usize) -> ClipView<'_> {
        let frames = self.frames();
        let end = end.min(frames);
        let start = start.min(end);
        let ch = usize::from(self.channels);
        ClipView {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples: &self.samples[start * ch..end * ch],
        }
    }

    pub fn to_mono(&self) -> Vec<f32> {
        self.view().to_mono()
    }

    /// Quantise to interleaved 16-bit PCM for writing.
    pub fn to_pcm16(&self, policy: OverflowPolicy) -> Result<Vec<i16>> {
        quantize_pcm16(&self.samples, PCM16_WRITE_SCALE, policy)
    }
}

/// Read-only window into an `AudioClip`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipView<'a> {
    sample_rate: u32,
    channels: u16,
    samples: &'a [f32],
}

impl<'a> ClipView<'a> {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Copy the viewed frames into an owned clip.
    pub fn to_clip(&self) -> AudioClip {
        AudioClip {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples: self.samples.to_vec(),
        }
    }

    /// Average all channels into one.
    pub fn to_mono(&self) -> Vec<f32> {
        let ch = usize::from(self.channels);
        if ch == 1 {
            return self.samples.to_vec();
        }
        self.samples
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
            .collect()
    }

    /// Extract one channel (0-based).
    pub fn channel(&self, index: usize) -> Vec<f32> {
        let ch = usize::from(self.channels);
        self.samples
            .iter()
            .skip(index)
            .step_by(ch)
            .copied()
            .collect()
    }
}

/// Scale and round f32 samples to i16.
///
/// With `Saturate`, out-of-range (and NaN) samples are clamped and a single
/// warning is logged with the count.
///
/// # Errors
/// With `Reject`, returns `NumericOverflow` for the first sample whose scaled
/// value is outside the 16-bit range or not finite.
pub fn quantize_pcm16(samples: &[f32], scale: f32, policy: OverflowPolicy) -> Result<Vec<i16>> {
    let lo = i16::MIN as f32;
    let hi = i16::MAX as f32;
    let mut clipped = 0usize;
    let mut out = Vec::with_capacity(samples.len());

    for (index, &s) in samples.iter().enumerate() {
        let v = (s * scale).round();
        if v.is_finite() && (lo..=hi).contains(&v) {
            out.push(v as i16);
            continue;
        }
        match policy {
            OverflowPolicy::Reject => {
                return Err(SingalongError::NumericOverflow { index, value: s });
            }
            OverflowPolicy::Saturate => {
                clipped += 1;
                // `as` saturates and maps NaN to 0.
                out.push(v as i16);
            }
        }
    }

    if clipped > 0 {
        warn!(clipped, total = samples.len(), "clamped out-of-range samples");
    }
    Ok(out)
}

fn check_format(sample_rate: u32, channels: u16) -> Result<()> {
    if sample_rate == 0 {
        return Err(SingalongError::InvalidInput("sample rate must be > 0".into()));
    }
    if channels == 0 {
        return Err(SingalongError::InvalidInput(
            "channel count must be > 0".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rejects_zero_rate_and_ragged_frames() {
        assert!(AudioClip::mono(0, vec![0.0]).is_err());
        assert!(AudioClip::new(16_000, 0, vec![]).is_err());
        assert!(AudioClip::new(16_000, 2, vec![0.0; 3]).is_err());
    }

    #[test]
    fn duration_is_frames_over_rate() {
        let clip = AudioClip::new(8_000, 2, vec![0.0; 8_000]).unwrap();
        assert_eq!(clip.frames(), 4_000);
        assert_relative_eq!(clip.duration_secs(), 0.5);
    }

    #[test]
    fn frame_range_clips_to_length() {
        let clip = AudioClip::mono(10, (0..10).map(|i| i as f32).collect()).unwrap();
        let view = clip.frame_range(8, 50);
        assert_eq!(view.samples(), &[8.0, 9.0]);
        assert!(clip.frame_range(20, 30).is_empty());
    }

    #[test]
    fn downmix_averages_channels() {
        let clip = AudioClip::new(4, 2, vec![1.0, 0.0, 0.5, 0.5]).unwrap();
        assert_eq!(clip.to_mono(), vec![0.5, 0.5]);
    }

    #[test]
    fn channels_round_trip_through_interleaving() {
        let left = vec![0.1, 0.2, 0.3];
        let right = vec![-0.1, -0.2, -0.3];
        let clip = AudioClip::from_channels(100, vec![left.clone(), right.clone()]).unwrap();
        assert_eq!(clip.channels(), 2);
        assert_eq!(clip.view().channel(0), left);
        assert_eq!(clip.view().channel(1), right);
    }

    #[test]
    fn saturate_clamps_instead_of_wrapping() {
        let pcm = quantize_pcm16(&[2.0, -2.0, 0.5], PCM16_WRITE_SCALE, OverflowPolicy::Saturate)
            .unwrap();
        assert_eq!(pcm[0], i16::MAX);
        assert_eq!(pcm[1], i16::MIN);
        assert_eq!(pcm[2], 16_384);
    }

    #[test]
    fn reject_reports_first_offender() {
        let err = quantize_pcm16(&[0.0, 0.2, 1.5, 3.0], PCM16_WRITE_SCALE, OverflowPolicy::Reject)
            .unwrap_err();
        match err {
            SingalongError::NumericOverflow { index, .. } => assert_eq!(index, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn full_negative_scale_is_representable() {
        // -1.0 * 32768 is exactly i16::MIN and must not count as overflow.
        let pcm = quantize_pcm16(&[-1.0], PCM16_READ_SCALE, OverflowPolicy::Reject).unwrap();
        assert_eq!(pcm, vec![i16::MIN]);
    }

    #[test]
    fn pcm16_decode_matches_scale() {
        let clip = AudioClip::from_pcm16(16_000, 1, &[16_384, -32_768]).unwrap();
        assert_relative_eq!(clip.samples()[0], 0.5);
        assert_relative_eq!(clip.samples()[1], -1.0);
    }
}
