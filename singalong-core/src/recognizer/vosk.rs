//! Vosk (Kaldi) backend via the `vosk` crate.
//!
//! The acoustic model is loaded once by [`VoskRecognizerFactory::load`] and
//! shared read-only. Each `create` call builds a fresh Kaldi recognizer with
//! word timestamps enabled, so decoder state never leaks between calls.
//!
//! Requires `libvosk` at link time; enable with `--features vosk`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use ::vosk::{CompleteResult, Model, Word, WordInAlternative};

use super::{render_final_result, RecognizedUnit, Recognizer, RecognizerFactory};
use crate::error::{Result, SingalongError};

pub struct VoskRecognizerFactory {
    model: Arc<Model>,
    model_path: PathBuf,
}

impl VoskRecognizerFactory {
    /// Load a Vosk model directory (e.g. `vosk-model-small-en-us-0.15`).
    ///
    /// # Errors
    /// `EngineInit` if the directory is missing or the model fails to load.
    pub fn load(model_path: &Path) -> Result<Self> {
        if !model_path.is_dir() {
            return Err(SingalongError::EngineInit(format!(
                "model directory not found: {}",
                model_path.display()
            )));
        }
        let model = Model::new(model_path.to_string_lossy()).ok_or_else(|| {
            SingalongError::EngineInit(format!(
                "failed to load Vosk model from {}",
                model_path.display()
            ))
        })?;
        info!(path = %model_path.display(), "Vosk model loaded");
        Ok(Self {
            model: Arc::new(model),
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl RecognizerFactory for VoskRecognizerFactory {
    fn name(&self) -> &str {
        "vosk"
    }

    fn create(&self, sample_rate: u32) -> Result<Box<dyn Recognizer>> {
        let mut engine = ::vosk::Recognizer::new(&self.model, sample_rate as f32).ok_or_else(|| {
            SingalongError::EngineInit(format!("Vosk rejected sample rate {sample_rate} Hz"))
        })?;
        engine.set_words(true);
        engine.set_partial_words(true);
        debug!(sample_rate, "Vosk recognizer created");
        Ok(Box::new(VoskRecognizer { engine }))
    }
}

struct VoskRecognizer {
    engine: ::vosk::Recognizer,
}

impl Recognizer for VoskRecognizer {
    fn accept_waveform(&mut self, pcm: &[i16]) -> Result<()> {
        self.engine
            .accept_waveform(pcm)
            .map(|_| ())
            .map_err(|e| SingalongError::Recognition(e.to_string()))
    }

    fn final_result(&mut self) -> Result<String> {
        render_final_result(&units_from_result(self.engine.final_result()))
    }
}

/// Word list of the best hypothesis. With alternatives enabled that is the
/// first alternative, whose words carry no per-word confidence.
fn units_from_result(result: CompleteResult<'_>) -> Vec<RecognizedUnit> {
    match result {
        CompleteResult::Single(single) => single.result.iter().map(word_unit).collect(),
        CompleteResult::Multiple(multi) => multi
            .alternatives
            .first()
            .map(|alt| alt.result.iter().map(alternative_unit).collect())
            .unwrap_or_default(),
    }
}

fn word_unit(w: &Word<'_>) -> RecognizedUnit {
    RecognizedUnit {
        conf: Some(f64::from(w.conf)),
        ..RecognizedUnit::new(f64::from(w.start), f64::from(w.end)).with_word(w.word)
    }
}

fn alternative_unit(w: &WordInAlternative<'_>) -> RecognizedUnit {
    RecognizedUnit::new(f64::from(w.start), f64::from(w.end)).with_word(w.word)
}

#[cfg(test)]
mod tests {
    use ::vosk::{Alternative, CompleteResultMultiple, CompleteResultSingle};

    use super::*;

    #[test]
    fn single_result_keeps_word_confidence() {
        let result = CompleteResult::Single(CompleteResultSingle {
            speaker_info: None,
            result: vec![
                Word { conf: 1.0, start: 0.06, end: 0.18, word: "fly" },
                Word { conf: 0.5, start: 0.18, end: 0.24, word: "me" },
            ],
            text: "fly me",
        });
        let units = units_from_result(result);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].word.as_deref(), Some("fly"));
        assert_eq!(units[1].conf, Some(0.5));
        assert_eq!(units[1].start, f64::from(0.18f32));
    }

    #[test]
    fn alternatives_use_the_first_hypothesis() {
        let result = CompleteResult::Multiple(CompleteResultMultiple {
            alternatives: vec![
                Alternative {
                    confidence: 210.0,
                    result: vec![WordInAlternative { start: 0.24, end: 1.0, word: "to" }],
                    text: "to",
                },
                Alternative {
                    confidence: 190.0,
                    result: vec![WordInAlternative { start: 0.2, end: 0.9, word: "two" }],
                    text: "two",
                },
            ],
        });
        let units = units_from_result(result);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].word.as_deref(), Some("to"));
        assert_eq!(units[0].conf, None);
    }

    #[test]
    fn no_alternatives_means_no_units() {
        let result = CompleteResult::Multiple(CompleteResultMultiple { alternatives: vec![] });
        assert!(units_from_result(result).is_empty());
    }

    #[test]
    fn missing_model_directory_fails_to_initialise() {
        assert!(matches!(
            VoskRecognizerFactory::load(Path::new("/nonexistent/vosk-model")),
            Err(SingalongError::EngineInit(_))
        ));
    }
}
