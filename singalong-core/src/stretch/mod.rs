//! Time stretching and concatenation.
//!
//! The `TimeStretcher` trait is the swap point for the resynthesis algorithm.
//! `PhaseVocoder` is the default implementation.

pub mod merge;
pub mod phase_vocoder;

pub use merge::merge;
pub use phase_vocoder::PhaseVocoder;

use crate::audio::clip::{AudioClip, ClipView};
use crate::error::{Result, SingalongError};

/// Changes duration while preserving pitch.
pub trait TimeStretcher: Send + Sync {
    /// Resynthesise `input` to `round(frames × ratio)` frames.
    ///
    /// # Errors
    /// `InvalidInput` when `ratio` is not a finite number greater than zero.
    fn stretch(&self, input: ClipView<'_>, ratio: f64) -> Result<AudioClip>;
}

/// Reject ratios that cannot describe a duration change.
pub fn check_ratio(ratio: f64) -> Result<()> {
    if ratio.is_finite() && ratio > 0.0 {
        Ok(())
    } else {
        Err(SingalongError::InvalidInput(format!(
            "stretch ratio must be finite and > 0, got {ratio}"
        )))
    }
}

/// Frame count after stretching `frames` by `ratio`.
pub fn output_frames(frames: usize, ratio: f64) -> usize {
    (frames as f64 * ratio).round() as usize
}

/// Stretch `input` so it lasts `target_secs`. An empty input stays empty.
pub fn stretch_to_duration(
    stretcher: &dyn TimeStretcher,
    input: ClipView<'_>,
    target_secs: f64,
) -> Result<AudioClip> {
    if !target_secs.is_finite() || target_secs < 0.0 {
        return Err(SingalongError::InvalidInput(format!(
            "target duration must be a non-negative number, got {target_secs}"
        )));
    }
    let source_secs = input.duration_secs();
    if input.is_empty() || target_secs == 0.0 {
        return AudioClip::empty(input.sample_rate(), input.channels());
    }
    stretcher.stretch(input, target_secs / source_secs)
}
