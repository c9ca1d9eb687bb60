//! Formal equivalence checker driver
//!
//! The checker is configured by a script template in which every occurrence
//! of the placeholder module name is replaced by the graded module. Its
//! verdict is read back from the report it prints.

use crate::process::{ToolCommand, DEFAULT_POLL_INTERVAL};
use crate::{BackendError, BackendResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Report line announcing a successful proof
pub const PROVED_PHRASE: &str = "Successfully proved designs equivalent";
/// Report line announcing a refuted proof
pub const FAILED_PHRASE: &str = "Failed to prove equivalence";
/// Module name the script template is written for
pub const TEMPLATE_MODULE: &str = "top_module";

/// Default time bound for a proof attempt
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquivalenceOutcome {
    Equivalent,
    NotEquivalent,
    /// The report announced neither result
    Inconclusive,
    TimedOut,
}

/// Scan a checker report. The last announcing line wins.
pub fn scan_report(report: &str) -> EquivalenceOutcome {
    report
        .lines()
        .filter_map(|line| {
            if line.contains(PROVED_PHRASE) {
                Some(EquivalenceOutcome::Equivalent)
            } else if line.contains(FAILED_PHRASE) {
                Some(EquivalenceOutcome::NotEquivalent)
            } else {
                None
            }
        })
        .last()
        .unwrap_or(EquivalenceOutcome::Inconclusive)
}

/// Instantiate the script template for `module` and write it to `dest`
pub fn prepare_script(template: &Path, module: &str, dest: &Path) -> BackendResult<()> {
    let content = std::fs::read_to_string(template)?;
    std::fs::write(dest, content.replace(TEMPLATE_MODULE, module))?;
    debug!("Prepared equivalence script {}", dest.display());
    Ok(())
}

/// Driver for the checker executable
#[derive(Debug, Clone)]
pub struct EquivalenceChecker {
    program: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
}

impl EquivalenceChecker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_VERIFY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run the checker from `workdir` on `script` and classify its report.
    ///
    /// The checker's exit status is not consulted; only the report decides.
    pub fn run(
        &self,
        workdir: &Path,
        script: &str,
        stdout: &Path,
        stderr: &Path,
    ) -> BackendResult<EquivalenceOutcome> {
        info!("Start of equivalence checking");
        let result = ToolCommand::new(&self.program)
            .arg(script)
            .current_dir(workdir)
            .stdout_to(stdout)
            .stderr_to(stderr)
            .timeout(self.timeout)
            .poll_interval(self.poll_interval)
            .run();
        info!("End of equivalence checking");

        match result {
            Ok(_) => {}
            Err(BackendError::TimedOut { .. }) => return Ok(EquivalenceOutcome::TimedOut),
            Err(e) => return Err(e),
        }

        let report = std::fs::read_to_string(stdout)?;
        let outcome = scan_report(&report);
        debug!("Equivalence report classified as {:?}", outcome);
        Ok(outcome)
    }
}

impl Default for EquivalenceChecker {
    fn default() -> Self {
        Self::new("eqy")
    }
}
