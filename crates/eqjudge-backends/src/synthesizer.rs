//! Synthesizer backends
//!
//! Backends form a closed set: an untrusted id string is resolved through
//! [`SynthesizerId::from_id`] and never used to look anything up dynamically.

use crate::process::ToolCommand;
use crate::{BackendError, BackendResult};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Supported synthesizers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynthesizerId {
    Yosys,
}

impl SynthesizerId {
    pub const ALL: [SynthesizerId; 1] = [SynthesizerId::Yosys];

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "Yosys" => Some(SynthesizerId::Yosys),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesizerId::Yosys => "Yosys",
        }
    }

    /// Instantiate the backend, running the given executable
    pub fn backend(self, program: impl Into<PathBuf>) -> Box<dyn Synthesizer> {
        match self {
            SynthesizerId::Yosys => Box::new(YosysSynthesizer::new(program)),
        }
    }
}

impl fmt::Display for SynthesizerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SynthesizerId {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| BackendError::UnknownSynthesizer(s.to_string()))
    }
}

/// One synthesis run: a driver script and where its output goes
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    /// Directory the synthesizer runs in
    pub root: PathBuf,
    /// Driver script, relative to `root`
    pub script: PathBuf,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

/// How a synthesis run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// Exit status 0 and nothing on the error stream
    Success,
    /// Non-zero exit or diagnostics on the error stream
    Failed { exit_code: Option<i32> },
    TimedOut,
}

impl SynthesisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SynthesisOutcome::Success)
    }
}

/// Descriptive table for a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesizerInfo {
    pub compiler_id: String,
    pub name: String,
    pub language: String,
    pub version: String,
    pub extension: String,
}

/// Capability interface of a synthesizer backend
pub trait Synthesizer {
    fn id(&self) -> SynthesizerId;

    fn name(&self) -> &str;

    /// Hardware description language accepted
    fn language(&self) -> &str;

    /// Version string reported by the installed tool
    fn report_version(&self) -> BackendResult<String>;

    /// Extension of submitted source files
    fn file_extension(&self) -> &str;

    fn synthesize(&self, job: &SynthesisJob) -> BackendResult<SynthesisOutcome>;

    fn info(&self) -> SynthesizerInfo {
        let version = self.report_version().unwrap_or_else(|e| {
            warn!("Cannot determine {} version: {}", self.name(), e);
            String::new()
        });
        SynthesizerInfo {
            compiler_id: self.id().to_string(),
            name: self.name().to_string(),
            language: self.language().to_string(),
            version,
            extension: self.file_extension().to_string(),
        }
    }
}

/// The Yosys open synthesis suite
#[derive(Debug, Clone)]
pub struct YosysSynthesizer {
    program: PathBuf,
}

impl YosysSynthesizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for YosysSynthesizer {
    fn default() -> Self {
        Self::new("yosys")
    }
}

/// Second space-separated field of a `--version` banner
fn version_field(banner: &str) -> Option<&str> {
    banner.split(' ').nth(1).map(str::trim)
}

fn is_empty_file(path: &Path) -> BackendResult<bool> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(meta.len() == 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e.into()),
    }
}

impl Synthesizer for YosysSynthesizer {
    fn id(&self) -> SynthesizerId {
        SynthesizerId::Yosys
    }

    fn name(&self) -> &str {
        "Yosys"
    }

    fn language(&self) -> &str {
        "Verilog"
    }

    fn report_version(&self) -> BackendResult<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    BackendError::ToolNotFound(self.program.display().to_string())
                }
                _ => BackendError::IoError(e),
            })?;
        let banner = String::from_utf8_lossy(&output.stdout);
        version_field(&banner)
            .map(str::to_string)
            .ok_or_else(|| BackendError::ToolFailed(format!("unexpected version banner '{}'", banner.trim())))
    }

    fn file_extension(&self) -> &str {
        "v"
    }

    fn synthesize(&self, job: &SynthesisJob) -> BackendResult<SynthesisOutcome> {
        let command = ToolCommand::new(&self.program)
            .arg(job.script.to_string_lossy())
            .current_dir(&job.root)
            .stdout_to(&job.stdout)
            .stderr_to(&job.stderr)
            .timeout(job.timeout)
            .poll_interval(job.poll_interval);

        let status = match command.run() {
            Ok(status) => status,
            Err(BackendError::TimedOut { .. }) => return Ok(SynthesisOutcome::TimedOut),
            Err(e) => return Err(e),
        };

        let quiet = is_empty_file(&job.stderr)?;
        info!("Synthesis finished with {} (empty error stream: {})", status, quiet);
        if status.success() && quiet {
            Ok(SynthesisOutcome::Success)
        } else {
            Ok(SynthesisOutcome::Failed {
                exit_code: status.code(),
            })
        }
    }
}
