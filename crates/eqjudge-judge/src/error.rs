//! Error types for a grading run
//!
//! Submission-caused failures never show up here: they are stage outcomes
//! that become verdicts. A `JudgeError` means the run itself could not be
//! carried out and is recorded as an internal error.

use eqjudge_backends::BackendError;
use eqjudge_iface::IfaceError;
use eqjudge_wave::WaveError;
use thiserror::Error;

/// Result type for judge operations
pub type Result<T> = std::result::Result<T, JudgeError>;

#[derive(Debug, Error)]
pub enum JudgeError {
    /// Reference interface is malformed or cannot be read
    #[error(transparent)]
    Iface(#[from] IfaceError),

    #[error(transparent)]
    Wave(#[from] WaveError),

    /// External tool could not be run
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Option absent from every configuration document and without default
    #[error("Missing option '{0}'")]
    MissingOption(String),

    /// Option present but of the wrong shape
    #[error("Invalid value for option '{option}': {reason}")]
    InvalidOption { option: String, reason: String },

    /// Requested synthesizer not in the problem's allowed list
    #[error("Invalid synthesizer '{id}' (allowed: {allowed})")]
    InvalidSynthesizer { id: String, allowed: String },

    /// A tool ran but behaved outside its contract
    #[error("{tool} malfunctioned: {detail}")]
    ToolMalfunction { tool: String, detail: String },

    /// The reference solution could not be prepared
    #[error("Reference preparation failed: {0}")]
    Reference(String),

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse toolchain configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JudgeError {
    /// The error and its sources, one per line
    pub fn chain(&self) -> String {
        let mut lines = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            let line = err.to_string();
            if lines.last() != Some(&line) {
                lines.push(line);
            }
            source = err.source();
        }
        lines.join("\n")
    }
}
