//! Counterexample artifacts for a refuted proof
//!
//! Every trace the checker leaves under `correction/` yields up to three
//! files in `correction/traces/`: a filtered waveform, its SVG rendering and
//! the JSON counterexample. Failing to produce one of them is logged and
//! skipped; the verdict is already decided at this point. The one exception
//! is a trace binding two wires to the same signal of one instance, which
//! means the checker's output cannot be trusted.

use crate::error::{JudgeError, Result};
use crate::layout::JudgeLayout;
use eqjudge_backends::ToolCommand;
use eqjudge_iface::Interface;
use eqjudge_wave::{clean_vcd, counterexample_from_file, WaveError};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Trace names, in the order they are collected
pub const TRACE_FILE_NAMES: [&str; 2] = ["trace_induct.vcd", "trace.vcd"];

const STRATEGIES_DIR: &str = "strategies";

/// Every checker trace under `dir`: induction traces first, each group sorted
pub fn find_traces(dir: &Path) -> Vec<PathBuf> {
    TRACE_FILE_NAMES
        .iter()
        .flat_map(|name| {
            WalkDir::new(dir)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(move |entry| entry.file_type().is_file() && entry.file_name() == *name)
                .map(|entry| entry.into_path())
        })
        .collect()
}

/// Name of the strategy directory a trace belongs to
pub fn strategy_name(trace: &Path) -> Option<String> {
    let mut components = trace.components().map(|c| c.as_os_str().to_string_lossy());
    components.find(|c| c == STRATEGIES_DIR)?;
    components.next().map(|c| c.into_owned())
}

/// Module part of a strategy name (`adder.sat` is a strategy on `adder`)
fn strategy_module(strategy: &str) -> &str {
    strategy.split('.').next().unwrap_or(strategy)
}

/// Builds the artifacts of the traces found after a failed proof
#[derive(Debug, Clone)]
pub struct TraceArtifacts<'a> {
    layout: &'a JudgeLayout,
    renderer: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
}

impl<'a> TraceArtifacts<'a> {
    pub fn new(layout: &'a JudgeLayout, renderer: impl Into<PathBuf>) -> Self {
        Self {
            layout,
            renderer: renderer.into(),
            timeout: eqjudge_backends::process::DEFAULT_TIMEOUT,
            poll_interval: eqjudge_backends::process::DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Produce all artifacts. Returns their paths relative to the judge root.
    pub fn materialize(&self) -> Result<Vec<String>> {
        let traces_dir = self.layout.traces_dir();
        std::fs::create_dir_all(&traces_dir)?;

        let mut produced = Vec::new();
        for trace in find_traces(&self.layout.correction()) {
            let Some(strategy) = strategy_name(&trace) else {
                warn!("Trace {} is not inside a strategy directory", trace.display());
                continue;
            };
            info!("Collecting counterexample of strategy {}", strategy);

            let vcd = traces_dir.join(format!("{}.vcd", strategy));
            if let Err(e) = write_clean_copy(&trace, &vcd) {
                warn!("Failed creating {}: {}", vcd.display(), e);
                continue;
            }
            produced.push(vcd.clone());

            let svg = traces_dir.join(format!("{}.svg", strategy));
            if self.render(&vcd, &svg) {
                produced.push(svg);
            }

            let json = traces_dir.join(format!("{}.json", strategy));
            match self.write_counterexample(&trace, &strategy, &json) {
                Ok(()) => {
                    debug!("File generated: {}", json.display());
                    produced.push(json);
                }
                Err(e @ JudgeError::Wave(WaveError::AmbiguousBinding { .. })) => return Err(e),
                Err(e) => warn!("Failed creating {}: {}", json.display(), e),
            }
        }

        Ok(produced.iter().map(|p| self.layout.relative(p)).collect())
    }

    /// Render a waveform to SVG. An empty or failed rendering is removed.
    fn render(&self, vcd: &Path, svg: &Path) -> bool {
        let result = ToolCommand::new(&self.renderer)
            .arg(self.layout.relative(vcd))
            .arg("-o")
            .current_dir(self.layout.root())
            .stdout_to(svg)
            .timeout(self.timeout)
            .poll_interval(self.poll_interval)
            .run();

        let rendered = match result {
            Ok(status) if status.success() => std::fs::metadata(svg).map(|m| m.len() > 0).unwrap_or(false),
            Ok(status) => {
                debug!("Renderer exited with {}", status);
                false
            }
            Err(e) => {
                debug!("Failed creating {}: {}", svg.display(), e);
                false
            }
        };
        if rendered {
            debug!("File generated: {}", svg.display());
        } else if svg.exists() {
            let _ = std::fs::remove_file(svg);
        }
        rendered
    }

    fn write_counterexample(&self, trace: &Path, strategy: &str, json: &Path) -> Result<()> {
        let iface_path = self
            .layout
            .submission_dir()
            .join(format!("{}.iface", strategy_module(strategy)));
        let iface = Interface::read_iface(&iface_path)?;
        let counterexample = counterexample_from_file(trace, &iface)?;
        counterexample.write_json(json)?;
        Ok(())
    }
}

fn write_clean_copy(trace: &Path, dest: &Path) -> std::io::Result<()> {
    let reader = BufReader::new(File::open(trace)?);
    let writer = BufWriter::new(File::create(dest)?);
    clean_vcd(reader, writer)
}
