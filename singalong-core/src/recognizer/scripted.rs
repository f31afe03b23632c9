//! `ScriptedRecognizer` replays a fixed word timeline instead of listening.
//!
//! Useful when the word boundaries of a reference track are already known
//! (e.g. from a lyrics file) and for exercising the pipeline end-to-end
//! without a model. Units are trimmed to the audio actually fed, so empty
//! input yields an empty result like a real engine would.

use tracing::debug;

use super::{render_final_result, RecognizedUnit, Recognizer, RecognizerFactory};
use crate::error::{Result, SingalongError};

pub struct ScriptedRecognizer {
    sample_rate: u32,
    units: Vec<RecognizedUnit>,
    samples_seen: usize,
}

impl ScriptedRecognizer {
    pub fn new(sample_rate: u32, units: Vec<RecognizedUnit>) -> Self {
        Self {
            sample_rate,
            units,
            samples_seen: 0,
        }
    }
}

impl Recognizer for ScriptedRecognizer {
    fn accept_waveform(&mut self, pcm: &[i16]) -> Result<()> {
        self.samples_seen += pcm.len();
        Ok(())
    }

    fn final_result(&mut self) -> Result<String> {
        let heard = self.samples_seen as f64 / self.sample_rate as f64;
        let units: Vec<RecognizedUnit> = self
            .units
            .iter()
            .filter(|u| u.start < heard)
            .map(|u| RecognizedUnit {
                end: u.end.min(heard),
                ..u.clone()
            })
            .collect();
        debug!(
            scripted = self.units.len(),
            emitted = units.len(),
            heard_secs = heard,
            "ScriptedRecognizer::final_result"
        );
        render_final_result(&units)
    }
}

/// Hands out [`ScriptedRecognizer`]s that all replay the same timeline.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRecognizerFactory {
    units: Vec<RecognizedUnit>,
}

impl ScriptedRecognizerFactory {
    pub fn new(units: Vec<RecognizedUnit>) -> Self {
        Self { units }
    }

    /// Build from `(start, end)` pairs in seconds.
    pub fn from_spans(spans: &[(f64, f64)]) -> Self {
        Self::new(
            spans
                .iter()
                .map(|&(start, end)| RecognizedUnit::new(start, end))
                .collect(),
        )
    }
}

impl RecognizerFactory for ScriptedRecognizerFactory {
    fn name(&self) -> &str {
        "scripted"
    }

    fn create(&self, sample_rate: u32) -> Result<Box<dyn Recognizer>> {
        if sample_rate == 0 {
            return Err(SingalongError::EngineInit("sample rate must be > 0".into()));
        }
        Ok(Box::new(ScriptedRecognizer::new(
            sample_rate,
            self.units.clone(),
        )))
    }
}
