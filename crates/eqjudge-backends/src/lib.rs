//! External tool drivers for the judge
//!
//! This crate wraps the command-line tools a grading run depends on:
//! a bounded process runner, the synthesizer backends, the equivalence
//! checker driver and the scraper for synthesis statistics.

use std::time::Duration;
use thiserror::Error;

pub mod equivalence;
pub mod process;
pub mod stats;
pub mod synthesizer;

pub use equivalence::{scan_report, EquivalenceChecker, EquivalenceOutcome};
pub use process::ToolCommand;
pub use stats::{collect_statistics, collect_statistics_file};
pub use synthesizer::{
    SynthesisJob, SynthesisOutcome, Synthesizer, SynthesizerId, SynthesizerInfo,
    YosysSynthesizer,
};

/// Backend-specific errors
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("'{command}' timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },
    #[error("Tool not found: {0}")]
    ToolNotFound(String),
    #[error("Tool execution failed: {0}")]
    ToolFailed(String),
    #[error("Unknown synthesizer '{0}'")]
    UnknownSynthesizer(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl BackendError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::TimedOut { .. })
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_classification() {
        let err = BackendError::TimedOut {
            command: "eqy x.eqy".to_string(),
            timeout: Duration::from_secs(300),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("eqy x.eqy"));
        assert!(!BackendError::ToolNotFound("yosys".to_string()).is_timeout());
    }
}
