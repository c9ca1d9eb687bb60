//! Grading of hardware-description submissions
//!
//! This crate runs the verdict pipeline over a judge directory and owns the
//! verdict record it produces, the run configuration and the counterexample
//! artifacts of a refuted proof.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod record;

pub use config::{RunOptions, Toolchain};
pub use error::{JudgeError, Result};
pub use layout::JudgeLayout;
pub use pipeline::{InterfaceOutcome, Judge};
pub use record::{Environment, Verdict, VerdictRecord};

use eqjudge_backends::{SynthesizerId, SynthesizerInfo};
use indexmap::IndexMap;

/// Info table of every supported synthesizer, keyed by id
pub fn synthesizer_table(toolchain: &Toolchain) -> IndexMap<String, SynthesizerInfo> {
    SynthesizerId::ALL
        .iter()
        .map(|id| {
            let backend = id.backend(&toolchain.synthesizer);
            (id.to_string(), backend.info())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesizer_table() {
        let toolchain = Toolchain {
            synthesizer: "/nonexistent/yosys".into(),
            ..Default::default()
        };
        let table = synthesizer_table(&toolchain);
        assert_eq!(table.len(), 1);
        assert_eq!(table["Yosys"].language, "Verilog");
        assert_eq!(table["Yosys"].extension, "v");
    }
}
