//! WAV file I/O via `hound`.
//!
//! Reading accepts 8/16/24/32-bit integer and 32-bit float PCM of any channel
//! count. Writing always produces 16-bit integer PCM.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::debug;

use crate::audio::clip::{AudioClip, OverflowPolicy, PCM16_READ_SCALE};
use crate::error::{Result, SingalongError};

/// Header facts of a WAV file, read without decoding samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u32,
}

impl WavInfo {
    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }
}

pub fn probe(path: &Path) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        frames: reader.duration(),
    })
}

/// Decode a whole WAV file into an `AudioClip`.
pub fn read_wav(path: &Path) -> Result<AudioClip> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / PCM16_READ_SCALE))
            .collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Int, bits @ (24 | 32)) => {
            let full_scale = (1_i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<std::result::Result<_, _>>()?
        }
        (format, bits) => {
            return Err(SingalongError::UnsupportedFormat(format!(
                "{bits}-bit {format:?} WAV"
            )))
        }
    };

    debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        samples = samples.len(),
        "decoded WAV"
    );

    AudioClip::new(spec.sample_rate, spec.channels, samples)
}

/// Encode `clip` as 16-bit PCM WAV at `path`.
///
/// # Errors
/// `NumericOverflow` when `policy` is `Reject` and a sample exceeds full scale.
pub fn write_wav(path: &Path, clip: &AudioClip, policy: OverflowPolicy) -> Result<()> {
    let pcm = clip.to_pcm16(policy)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let spec = WavSpec {
        channels: clip.channels(),
        sample_rate: clip.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for v in pcm {
        writer.write_sample(v)?;
    }
    writer.finalize()?;

    debug!(path = %path.display(), frames = clip.frames(), "wrote WAV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn write_then_read_keeps_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let clip = AudioClip::new(22_050, 2, vec![0.25, -0.25, 0.5, -0.5, 0.0, 0.0]).unwrap();

        write_wav(&path, &clip, OverflowPolicy::Reject).unwrap();
        let back = read_wav(&path).unwrap();

        assert_eq!(back.sample_rate(), 22_050);
        assert_eq!(back.channels(), 2);
        assert_eq!(back.frames(), 3);
        for (a, b) in clip.samples().iter().zip(back.samples()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
        }
    }

    #[test]
    fn probe_reads_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one_and_a_half.wav");
        let clip = AudioClip::silence(16_000, 1, 24_000).unwrap();
        write_wav(&path, &clip, OverflowPolicy::Saturate).unwrap();

        let info = probe(&path).unwrap();
        assert_eq!(info.frames, 24_000);
        assert_abs_diff_eq!(info.duration_secs(), 1.5);
    }

    #[test]
    fn float_wav_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut w = WavWriter::create(&path, spec).unwrap();
        w.write_sample(0.75f32).unwrap();
        w.finalize().unwrap();

        let clip = read_wav(&path).unwrap();
        assert_eq!(clip.samples(), &[0.75]);
    }

    #[test]
    fn reject_policy_refuses_hot_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hot.wav");
        let clip = AudioClip::mono(8_000, vec![0.1, 1.2]).unwrap();
        let err = write_wav(&path, &clip, OverflowPolicy::Reject).unwrap_err();
        assert!(matches!(err, SingalongError::NumericOverflow { index: 1, .. }));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_wav(Path::new("/nonexistent/singalong.wav")).is_err());
    }
}
