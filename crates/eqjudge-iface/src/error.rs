//! Error types for interface loading and validation

use thiserror::Error;

/// Result type for interface operations
pub type Result<T> = std::result::Result<T, IfaceError>;

/// Errors that can occur while building, reading or validating an interface
#[derive(Debug, Error)]
pub enum IfaceError {
    /// A port set breaks one of the circuit trait rules
    #[error("Interface invariant violated by port '{port}': {reason}")]
    InvariantViolation { port: String, reason: String },

    /// Two ports with the same name in one interface
    #[error("Duplicate port '{port}' in module '{module}'")]
    DuplicatePort { module: String, port: String },

    /// Zero-width port
    #[error("Port '{port}' in module '{module}' has width 0")]
    ZeroWidth { module: String, port: String },

    /// Malformed `.iface` or Verilog text
    #[error("Parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// Requested module is not declared in the source
    #[error("Module '{0}' not found")]
    UnknownModule(String),

    /// I/O error reading or writing interface files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IfaceError {
    pub(crate) fn invariant(port: &str, reason: impl Into<String>) -> Self {
        IfaceError::InvariantViolation {
            port: port.to_string(),
            reason: reason.into(),
        }
    }
}
