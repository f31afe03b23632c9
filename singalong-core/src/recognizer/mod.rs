//! Speech recognizer abstraction.
//!
//! The `Recognizer` trait decouples boundary detection from any specific
//! engine (energy-based segmentation, scripted timelines, Vosk/Kaldi).
//!
//! `&mut self` on both methods expresses that recognizers are stateful: they
//! accumulate partial hypotheses across `accept_waveform` calls. A recognizer
//! is therefore never shared. `RecognizerFactory::create` hands out a fresh
//! instance per detection call, and dropping it releases the engine state.
//!
//! ## Result format
//!
//! `final_result` returns the engine's JSON verbatim:
//!
//! ```json
//! {"result": [{"start": 0.06, "end": 0.18, "word": "fly", "conf": 1.0}], "text": "fly"}
//! ```
//!
//! `result` may be missing when nothing was recognised.

pub mod energy;
pub mod scripted;

#[cfg(feature = "vosk")]
pub mod vosk;

pub use energy::{EnergyRecognizer, EnergyRecognizerFactory};
pub use scripted::{ScriptedRecognizer, ScriptedRecognizerFactory};

#[cfg(feature = "vosk")]
pub use self::vosk::VoskRecognizerFactory;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Contract for streaming recognizers with word timestamps.
pub trait Recognizer: Send {
    /// Feed one block of 16-bit mono PCM.
    fn accept_waveform(&mut self, pcm: &[i16]) -> Result<()>;

    /// Flush pending audio and return the final JSON result.
    fn final_result(&mut self) -> Result<String>;
}

/// Builds one recognizer per detection call.
pub trait RecognizerFactory: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// # Errors
    /// `EngineInit` when the engine cannot be created for `sample_rate`
    /// (missing model, unsupported rate). Callers do not retry.
    fn create(&self, sample_rate: u32) -> Result<Box<dyn Recognizer>>;
}

/// One recognised unit (usually a word) with its time span in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedUnit {
    pub start: f64,
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conf: Option<f64>,
}

impl RecognizedUnit {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            word: None,
            conf: None,
        }
    }

    pub fn with_word(mut self, word: impl Into<String>) -> Self {
        self.word = Some(word.into());
        self
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FinalResult {
    #[serde(default)]
    result: Vec<RecognizedUnit>,
    #[serde(default)]
    text: String,
}

/// Parse a recognizer's final JSON result.
pub fn parse_final_result(json: &str) -> Result<Vec<RecognizedUnit>> {
    let parsed: FinalResult = serde_json::from_str(json)?;
    Ok(parsed.result)
}

/// Render units in the recognizer JSON shape. `text` joins the words.
pub fn render_final_result(units: &[RecognizedUnit]) -> Result<String> {
    let text = units
        .iter()
        .filter_map(|u| u.word.as_deref())
        .collect::<Vec<_>>()
        .join(" ");
    let result = FinalResult {
        result: units.to_vec(),
        text,
    };
    Ok(serde_json::to_string(&result)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_word_list() {
        let json = r#"{"result":[{"conf":1.0,"end":0.18,"start":0.06,"word":"fly"},
                                 {"conf":0.9,"end":0.24,"start":0.18,"word":"me"}],
                       "text":"fly me"}"#;
        let units = parse_final_result(json).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].start, 0.06);
        assert_eq!(units[1].word.as_deref(), Some("me"));
    }

    #[test]
    fn missing_result_means_no_units() {
        assert!(parse_final_result(r#"{"text": ""}"#).unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_final_result("not json").is_err());
    }

    #[test]
    fn render_then_parse_keeps_spans() {
        let units = vec![
            RecognizedUnit::new(0.0, 0.5).with_word("to"),
            RecognizedUnit::new(0.5, 1.0).with_word("the"),
        ];
        let json = render_final_result(&units).unwrap();
        assert!(json.contains(r#""text":"to the""#));
        assert_eq!(parse_final_result(&json).unwrap(), units);
    }
}
