//! Duration in seconds from any of the places a duration can come from.

use std::path::Path;

use crate::audio::clip::{AudioClip, ClipView};
use crate::audio::wav;
use crate::error::Result;
use crate::segment::TimeInterval;

/// Input to [`duration`], dispatched on the variant.
#[derive(Debug, Clone, Copy)]
pub enum DurationSource<'a> {
    /// Decoded clip: frames / rate.
    Clip(&'a AudioClip),
    /// Borrowed segment: frames / rate.
    View(ClipView<'a>),
    /// WAV file on disk: header frame count / rate. Samples are not decoded.
    WavFile(&'a Path),
    /// Recognised span: end − start.
    Interval(TimeInterval),
}

/// Seconds covered by `source`. Always non-negative.
///
/// # Errors
/// Only `WavFile` can fail (missing or unreadable file).
pub fn duration(source: DurationSource<'_>) -> Result<f64> {
    match source {
        DurationSource::Clip(clip) => Ok(clip.duration_secs()),
        DurationSource::View(view) => Ok(view.duration_secs()),
        DurationSource::WavFile(path) => Ok(wav::probe(path)?.duration_secs()),
        DurationSource::Interval(iv) => Ok(iv.duration()),
    }
}

impl<'a> From<&'a AudioClip> for DurationSource<'a> {
    fn from(clip: &'a AudioClip) -> Self {
        Self::Clip(clip)
    }
}

impl<'a> From<ClipView<'a>> for DurationSource<'a> {
    fn from(view: ClipView<'a>) -> Self {
        Self::View(view)
    }
}

impl<'a> From<&'a Path> for DurationSource<'a> {
    fn from(path: &'a Path) -> Self {
        Self::WavFile(path)
    }
}

impl From<TimeInterval> for DurationSource<'_> {
    fn from(iv: TimeInterval) -> Self {
        Self::Interval(iv)
    }
}
