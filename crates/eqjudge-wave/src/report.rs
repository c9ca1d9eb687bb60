//! Counterexample report consumed by the grader's trace viewer.
//!
//! ```json
//! {
//!   "type": "combinational",
//!   "input": { "a": 2 },
//!   "output": { "y": 1 },
//!   "expected": { "y": 3 },
//!   "errors": ["y"]
//! }
//! ```

use crate::syntax::Sample;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitKind {
    Combinational,
    Sequential,
}

/// A signal's value: one settled value for combinational circuits, one
/// value per timestamp for sequential ones. Values wider than 127 bits are
/// written as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SignalValues {
    Scalar(Sample),
    Sequence(Vec<Sample>),
}

#[derive(Debug, Clone, Serialize)]
pub struct Counterexample {
    #[serde(rename = "type")]
    pub kind: CircuitKind,
    pub input: IndexMap<String, SignalValues>,
    /// Values produced by the submission
    pub output: IndexMap<String, SignalValues>,
    /// Values produced by the reference
    pub expected: IndexMap<String, SignalValues>,
    /// Outputs where submission and reference disagree
    pub errors: Vec<String>,
}

impl Counterexample {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report as JSON to a file
    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).map_err(std::io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(kind: CircuitKind, value: SignalValues) -> Counterexample {
        let mut input = IndexMap::new();
        input.insert("b".to_string(), value.clone());
        input.insert("a".to_string(), value.clone());
        Counterexample {
            kind,
            input,
            output: IndexMap::new(),
            expected: IndexMap::new(),
            errors: vec![],
        }
    }

    #[test]
    fn test_json_shape() {
        let cex = sample(CircuitKind::Combinational, SignalValues::Scalar(Sample::Int(5)));
        let json: serde_json::Value = serde_json::from_str(&cex.to_json_pretty().unwrap()).unwrap();

        assert_eq!(json["type"], "combinational");
        assert_eq!(json["input"]["a"], 5);
        assert!(json["errors"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_sequences_and_declaration_order() {
        let values = vec![Sample::Int(-1), Sample::Int(0), Sample::Int(1)];
        let cex = sample(CircuitKind::Sequential, SignalValues::Sequence(values));
        let text = cex.to_json_pretty().unwrap();

        assert!(text.find("\"b\"").unwrap() < text.find("\"a\"").unwrap());
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["type"], "sequential");
        assert_eq!(json["input"]["b"], serde_json::json!([-1, 0, 1]));
    }

    #[test]
    fn test_write_json_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traces").join("sat.json");
        sample(CircuitKind::Combinational, SignalValues::Scalar(Sample::Int(0)))
            .write_json(&path)
            .unwrap();
        assert!(path.exists());
    }
}
