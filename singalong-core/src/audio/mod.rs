//! Audio buffers, WAV file I/O and sample-rate conversion.
//!
//! # Conventions
//!
//! - Samples are interleaved `f32`, nominally in [-1.0, 1.0].
//! - Argument order is always `(sample_rate, channels, samples)`.
//! - 16-bit output goes through [`clip::quantize_pcm16`], which either clamps
//!   or rejects out-of-range values. It never wraps.

pub mod clip;
pub mod resample;
pub mod wav;

pub use clip::{quantize_pcm16, AudioClip, ClipView, OverflowPolicy};
pub use resample::{resample_clip, RateConverter};
pub use wav::{probe, read_wav, write_wav, WavInfo};
