use thiserror::Error;

/// All errors produced by singalong-core.
#[derive(Debug, Error)]
pub enum SingalongError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid time interval: start={start} end={end}")]
    InvalidInterval { start: f64, end: f64 },

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("sample rate mismatch: expected {expected} Hz, got {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    #[error("recognizer initialisation failed: {0}")]
    EngineInit(String),

    #[error("recognition error: {0}")]
    Recognition(String),

    #[error("sample {index} out of 16-bit range: {value}")]
    NumericOverflow { index: usize, value: f32 },

    #[error("resampler error: {0}")]
    Resample(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("malformed recognizer result: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SingalongError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_display_names_both_bounds() {
        let err = SingalongError::InvalidInterval {
            start: 0.5,
            end: 0.25,
        };
        assert_eq!(err.to_string(), "invalid time interval: start=0.5 end=0.25");
    }

    #[test]
    fn overflow_display_reports_index() {
        let err = SingalongError::NumericOverflow {
            index: 7,
            value: 1.5,
        };
        assert!(err.to_string().contains("sample 7"));
    }

    #[test]
    fn json_errors_convert() {
        let raw = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: SingalongError = raw.into();
        assert!(matches!(err, SingalongError::Json(_)));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SingalongError>();
    }
}
