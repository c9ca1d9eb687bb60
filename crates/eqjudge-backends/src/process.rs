//! Bounded execution of external tools
//!
//! A tool runs with its output streams redirected to files while the caller
//! polls for completion. Once the time bound is exceeded the process is
//! killed outright and the call fails with [`BackendError::TimedOut`]; files
//! the tool was writing may be truncated at that point.

use crate::{BackendError, BackendResult};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default time bound for a tool run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Interval between liveness checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// An external command together with its time bound and output sinks
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    stdout: Option<PathBuf>,
    stderr: Option<PathBuf>,
    timeout: Duration,
    poll_interval: Duration,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdout: None,
            stderr: None,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Redirect standard output to a file (created or truncated)
    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    /// Redirect standard error to a file (created or truncated)
    pub fn stderr_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr = Some(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Command line as logged
    pub fn display(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn sink(path: Option<&Path>) -> BackendResult<Stdio> {
        match path {
            Some(path) => Ok(Stdio::from(File::create(path)?)),
            None => Ok(Stdio::null()),
        }
    }

    /// Run the command to completion or until the time bound expires
    pub fn run(&self) -> BackendResult<ExitStatus> {
        let line = self.display();
        info!("Executing '{}'", line);

        let stdout = Self::sink(self.stdout.as_deref())?;
        let stderr = Self::sink(self.stderr.as_deref())?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        if let Some(ref cwd) = self.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                BackendError::ToolNotFound(self.program.display().to_string())
            }
            _ => BackendError::ToolFailed(format!("cannot start '{}': {}", line, e)),
        })?;

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                debug!(
                    "'{}' finished with {} after {:?}",
                    line,
                    status,
                    start.elapsed()
                );
                return Ok(status);
            }
            if start.elapsed() > self.timeout {
                break;
            }
            thread::sleep(self.poll_interval);
        }

        warn!("'{}' exceeded {:?}, killing it", line, self.timeout);
        if let Err(e) = child.kill() {
            warn!("Failed to kill '{}': {}", line, e);
        }
        let _ = child.wait();
        Err(BackendError::TimedOut {
            command: line,
            timeout: self.timeout,
        })
    }
}
