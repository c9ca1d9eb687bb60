//! Error types for waveform parsing and trace comparison

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WaveError>;

#[derive(Debug, Error)]
pub enum WaveError {
    /// Malformed dump; `at` is `header` or the last timestamp seen
    #[error("Waveform parse error at {at}: {reason}")]
    Parse { at: String, reason: String },

    /// Two wires in one scope carry the same interface signal name
    #[error("Wire '{name}' bound twice in scope '{scope}'")]
    AmbiguousBinding { scope: String, name: String },

    /// A combinational signal has no settled value to report
    #[error("Signal '{0}' has no settled value")]
    EmptyTrace(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WaveError {
    pub(crate) fn parse(at: impl Into<String>, reason: impl Into<String>) -> Self {
        WaveError::Parse {
            at: at.into(),
            reason: reason.into(),
        }
    }
}
