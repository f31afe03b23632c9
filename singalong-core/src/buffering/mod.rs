//! Fixed-size PCM chunking for streaming recognizers.
//!
//! Recognizers consume 16-bit mono PCM in blocks of `chunk_frames` frames.
//! The last block may be shorter; it is still delivered so no trailing audio
//! is dropped.

use tracing::debug;

use crate::error::{Result, SingalongError};

/// Frames per recognizer call.
pub const DEFAULT_CHUNK_FRAMES: usize = 4_000;

/// Multiplier applied to f32 samples before quantising for the recognizer.
pub const DEFAULT_PCM_SCALE: f32 = 32_768.0;

/// Quantise mono f32 samples to recognizer PCM, `clamp(round(s × scale))`.
/// Full-scale input routinely lands one step past `i16::MAX` at the default
/// scale, so clamping here is expected and only logged at debug level.
pub fn to_recognizer_pcm(mono: &[f32], pcm_scale: f32) -> Result<Vec<i16>> {
    if !pcm_scale.is_finite() || pcm_scale <= 0.0 {
        return Err(SingalongError::InvalidInput(format!(
            "pcm scale must be a positive number, got {pcm_scale}"
        )));
    }
    let lo = i16::MIN as f32;
    let hi = i16::MAX as f32;
    let mut clamped = 0usize;
    let pcm = mono
        .iter()
        .map(|&s| {
            let v = (s * pcm_scale).round();
            if !(lo..=hi).contains(&v) {
                clamped += 1;
            }
            // `as` saturates and maps NaN to 0.
            v as i16
        })
        .collect();
    if clamped > 0 {
        debug!(clamped, total = mono.len(), "recognizer input clamped");
    }
    Ok(pcm)
}

/// Split `pcm` into blocks of `chunk_frames`, keeping the short tail.
///
/// # Errors
/// `InvalidInput` when `chunk_frames` is zero.
pub fn pcm_chunks(pcm: &[i16], chunk_frames: usize) -> Result<std::slice::Chunks<'_, i16>> {
    if chunk_frames == 0 {
        return Err(SingalongError::InvalidInput(
            "chunk size must be at least one frame".into(),
        ));
    }
    Ok(pcm.chunks(chunk_frames))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_chunk_is_kept() {
        let pcm = vec![1i16; 9_000];
        let sizes: Vec<usize> = pcm_chunks(&pcm, 4_000).unwrap().map(<[i16]>::len).collect();
        assert_eq!(sizes, vec![4_000, 4_000, 1_000]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert_eq!(pcm_chunks(&[], 4_000).unwrap().count(), 0);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(pcm_chunks(&[0, 1], 0).is_err());
    }

    #[test]
    fn recognizer_pcm_uses_32768_scale() {
        let pcm = to_recognizer_pcm(&[0.5, -1.0, 1.0], DEFAULT_PCM_SCALE).unwrap();
        assert_eq!(pcm, vec![16_384, -32_768, 32_767]);
    }

    #[test]
    fn full_scale_input_clamps_without_warning() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        use tracing_subscriber::layer::{Context, SubscriberExt};
        use tracing_subscriber::Layer;

        use crate::audio::clip::{quantize_pcm16, OverflowPolicy};

        struct WarnCounter(Arc<AtomicUsize>);

        impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
            fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
                if *event.metadata().level() == tracing::Level::WARN {
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));
        tracing::subscriber::with_default(subscriber, || {
            let pcm = to_recognizer_pcm(&[1.0, -1.0, 1.5, f32::NAN], DEFAULT_PCM_SCALE).unwrap();
            assert_eq!(pcm, vec![32_767, -32_768, 32_767, 0]);
            assert_eq!(warnings.load(Ordering::SeqCst), 0);

            // Output quantisation still reports clipping.
            quantize_pcm16(&[1.5], DEFAULT_PCM_SCALE, OverflowPolicy::Saturate).unwrap();
            assert_eq!(warnings.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        assert!(to_recognizer_pcm(&[0.0], 0.0).is_err());
    }
}
