//! The verdict record of one grading run

use crate::error::{JudgeError, Result};
use eqjudge_backends::SynthesizerInfo;
use eqjudge_iface::Interface;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::path::Path;

/// Written before any stage runs, so a crash never leaves a stale verdict behind
pub const PLACEHOLDER_RECORD: &str = "veredict: IE\ninternal_error: very severe\n";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Grading verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verdict {
    #[default]
    #[serde(rename = "IE")]
    InternalError,
    #[serde(rename = "AC")]
    Accepted,
    #[serde(rename = "WA")]
    WrongAnswer,
    #[serde(rename = "CE")]
    CompileError,
    #[serde(rename = "EE")]
    ExecutionError,
}

impl Verdict {
    pub fn code(&self) -> &'static str {
        match self {
            Verdict::InternalError => "IE",
            Verdict::Accepted => "AC",
            Verdict::WrongAnswer => "WA",
            Verdict::CompileError => "CE",
            Verdict::ExecutionError => "EE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Where and when the run happened
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    pub hostname: String,
    pub username: String,
    pub time_beg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

pub fn current_time() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/proc/sys/kernel/hostname")
                .ok()
                .map(|h| h.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn username() -> String {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|u| !u.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

impl Environment {
    pub fn capture() -> Self {
        Self {
            hostname: hostname(),
            username: username(),
            time_beg: current_time(),
            time_end: None,
        }
    }
}

/// Synthesizer selection
#[derive(Debug, Clone, Default, Serialize)]
pub struct SynthesisSection {
    #[serde(skip_serializing_if = "Value::is_null")]
    pub synthesizers: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesizer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<SynthesizerInfo>,
}

/// The single mutable result of a grading run
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerdictRecord {
    pub submission: Value,
    pub problem: Value,
    pub driver: Value,
    pub handler: Value,
    pub environment: Environment,
    #[serde(rename = "veredict")]
    pub verdict: Verdict,
    pub synthesis: SynthesisSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<Interface>,
    pub statistics: IndexMap<String, u64>,
    pub trace_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl VerdictRecord {
    /// A fresh record, defaulting to an internal error
    pub fn new() -> Self {
        Self {
            environment: Environment::capture(),
            ..Default::default()
        }
    }

    /// Register an artifact path, relative to the judge root
    pub fn add_trace_file(&mut self, path: impl Into<String>) {
        self.trace_files.push(path.into());
    }

    /// Mark the run as crashed
    pub fn fail(&mut self, err: &JudgeError) {
        self.verdict = Verdict::InternalError;
        self.internal_error = Some("exception".to_string());
        self.traceback = Some(err.chain());
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|source| JudgeError::Yaml {
            path: "correction record".to_string(),
            source,
        })
    }

    /// Persist the record. The file is replaced in one step.
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        let tmp = path.with_extension("yml.tmp");
        std::fs::write(&tmp, yaml)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Write the placeholder record a run starts from
pub fn write_placeholder(path: &Path) -> Result<()> {
    std::fs::write(path, PLACEHOLDER_RECORD)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_internal_error() {
        let record = VerdictRecord::new();
        assert_eq!(record.verdict, Verdict::InternalError);
        assert!(record.trace_files.is_empty());
        assert!(!record.environment.time_beg.is_empty());
    }

    #[test]
    fn test_verdict_codes() {
        assert_eq!(serde_yaml::to_string(&Verdict::WrongAnswer).unwrap(), "WA\n");
        let parsed: Verdict = serde_yaml::from_str("EE").unwrap();
        assert_eq!(parsed, Verdict::ExecutionError);
        assert_eq!(Verdict::Accepted.to_string(), "AC");
    }

    #[test]
    fn test_record_keys() {
        let mut record = VerdictRecord::new();
        record.verdict = Verdict::CompileError;
        record.add_trace_file("correction/interface.txt");
        record.statistics.insert("NANDs".to_string(), 4);

        let doc: Value = serde_yaml::from_str(&record.to_yaml().unwrap()).unwrap();
        assert_eq!(doc["veredict"], Value::String("CE".to_string()));
        assert_eq!(doc["trace_files"][0], Value::String("correction/interface.txt".to_string()));
        assert_eq!(doc["statistics"]["NANDs"].as_u64(), Some(4));
        assert!(doc.get("environment").and_then(|e| e.get("hostname")).is_some());
        assert!(doc.get("internal_error").is_none());
        assert!(doc.get("interface").is_none());
    }

    #[test]
    fn test_failure_is_recorded() {
        let mut record = VerdictRecord::new();
        record.verdict = Verdict::Accepted;
        record.fail(&JudgeError::MissingOption("compiler_id".to_string()));

        assert_eq!(record.verdict, Verdict::InternalError);
        assert_eq!(record.internal_error.as_deref(), Some("exception"));
        assert!(record.traceback.as_deref().unwrap().contains("compiler_id"));
    }

    #[test]
    fn test_save_replaces_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("correction.yml");

        write_placeholder(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), PLACEHOLDER_RECORD);

        let mut record = VerdictRecord::new();
        record.verdict = Verdict::Accepted;
        record.save(&path).unwrap();

        let doc: Value = serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["veredict"], Value::String("AC".to_string()));
        assert!(doc.get("internal_error").is_none());
        assert!(!dir.path().join("correction.yml.tmp").exists());
    }
}
