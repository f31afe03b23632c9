//! Time intervals and word segmentation.
//!
//! A `TimeInterval` is validated on construction, so segmenting with one
//! cannot fail: out-of-range bounds are clipped to the clip length and the
//! result borrows the source clip.

use serde::Serialize;

use crate::audio::clip::{AudioClip, ClipView};
use crate::error::{Result, SingalongError};

/// Absorbs representation error in `seconds × rate` (e.g. `0.18 × 44100`
/// evaluates to `7937.999…`) before flooring to a frame index.
const FRAME_EPSILON: f64 = 1e-6;

/// A `(start, end)` span in seconds with `0 ≤ start ≤ end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeInterval {
    start: f64,
    end: f64,
}

impl TimeInterval {
    /// # Errors
    /// `InvalidInterval` if either bound is negative or non-finite, or
    /// `start > end`.
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || start > end {
            return Err(SingalongError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// `end − start`.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Frame index range `floor(start × rate) .. floor(end × rate)`, unclipped.
    pub fn frame_range(&self, sample_rate: u32) -> (usize, usize) {
        (
            seconds_to_frame(self.start, sample_rate),
            seconds_to_frame(self.end, sample_rate),
        )
    }
}

impl TryFrom<(f64, f64)> for TimeInterval {
    type Error = SingalongError;

    fn try_from((start, end): (f64, f64)) -> Result<Self> {
        Self::new(start, end)
    }
}

fn seconds_to_frame(secs: f64, sample_rate: u32) -> usize {
    (secs * f64::from(sample_rate) + FRAME_EPSILON).floor() as usize
}

/// Borrow the frames of `clip` covered by `interval`, clipped to its length.
pub fn segment<'a>(clip: &'a AudioClip, interval: &TimeInterval) -> ClipView<'a> {
    let (start, end) = interval.frame_range(clip.sample_rate());
    clip.frame_range(start, end)
}

/// Segment `clip` at every interval, in order.
pub fn split_words<'a>(clip: &'a AudioClip, intervals: &[TimeInterval]) -> Vec<ClipView<'a>> {
    intervals.iter().map(|iv| segment(clip, iv)).collect()
}
