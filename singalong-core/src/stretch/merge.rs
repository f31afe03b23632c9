//! In-order concatenation of stretched segments.

use tracing::debug;

use crate::audio::clip::AudioClip;
use crate::error::{Result, SingalongError};

/// Concatenate `segments` in order into one clip at `sample_rate`/`channels`.
///
/// The output frame count is the sum of the segment frame counts. An empty
/// list yields an empty clip.
///
/// # Errors
/// `SampleRateMismatch` or `InvalidInput` if any segment's format differs.
pub fn merge(sample_rate: u32, channels: u16, segments: &[AudioClip]) -> Result<AudioClip> {
    for seg in segments {
        if seg.sample_rate() != sample_rate {
            return Err(SingalongError::SampleRateMismatch {
                expected: sample_rate,
                actual: seg.sample_rate(),
            });
        }
        if seg.channels() != channels {
            return Err(SingalongError::InvalidInput(format!(
                "cannot merge a {}-channel segment into {}-channel output",
                seg.channels(),
                channels
            )));
        }
    }

    let total: usize = segments.iter().map(|s| s.samples().len()).sum();
    let mut samples = Vec::with_capacity(total);
    for seg in segments {
        samples.extend_from_slice(seg.samples());
    }
    debug!(segments = segments.len(), samples = total, "merged segments");
    AudioClip::new(sample_rate, channels, samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_sum_of_segments() {
        let segs = vec![
            AudioClip::silence(100, 1, 3).unwrap(),
            AudioClip::silence(100, 1, 0).unwrap(),
            AudioClip::silence(100, 1, 7).unwrap(),
        ];
        let out = merge(100, 1, &segs).unwrap();
        assert_eq!(out.frames(), 10);
    }

    #[test]
    fn order_is_preserved() {
        let a = AudioClip::mono(10, vec![1.0, 2.0]).unwrap();
        let b = AudioClip::mono(10, vec![3.0]).unwrap();
        let out = merge(10, 1, &[a, b]).unwrap();
        assert_eq!(out.samples(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn empty_list_is_empty_clip() {
        let out = merge(44_100, 2, &[]).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.sample_rate(), 44_100);
    }

    #[test]
    fn mismatched_rate_is_rejected() {
        let segs = vec![AudioClip::silence(100, 1, 3).unwrap()];
        assert!(matches!(
            merge(200, 1, &segs),
            Err(SingalongError::SampleRateMismatch { expected: 200, actual: 100 })
        ));
    }

    #[test]
    fn mismatched_channels_are_rejected() {
        let segs = vec![AudioClip::silence(100, 2, 3).unwrap()];
        assert!(merge(100, 1, &segs).is_err());
    }
}
