//! The verdict pipeline
//!
//! One run grades one submission in a fixed order: reference preparation,
//! synthesis, interface check, equivalence proof, then statistics and (for a
//! refuted proof) counterexample collection. Each stage resolves the
//! submission-caused failures it can observe into an outcome; anything else
//! is a [`JudgeError`] and ends the run as an internal error.
//!
//! The record on disk is first overwritten with a placeholder internal error
//! and then written exactly once more, after the last stage or after a
//! failure.

use crate::artifacts::TraceArtifacts;
use crate::config::{RunOptions, Toolchain};
use crate::error::{JudgeError, Result};
use crate::layout::{JudgeLayout, TOP_MODULE_IFACE};
use crate::record::{current_time, write_placeholder, Verdict, VerdictRecord};
use eqjudge_backends::equivalence::prepare_script;
use eqjudge_backends::{
    collect_statistics_file, BackendError, EquivalenceChecker, EquivalenceOutcome, SynthesisJob,
    SynthesisOutcome, SynthesizerId, ToolCommand,
};
use eqjudge_iface::{detect_circuit_traits, parse_top_module, parse_verilog, IfaceError, Interface};
use indexmap::IndexMap;
use serde_yaml::Value;
use std::path::Path;
use tracing::{error, info, warn};

/// Result of comparing the submission's interface with the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceOutcome {
    Match,
    Mismatch,
}

/// Option value allowing every synthesizer
const ANY_SYNTHESIZER: &str = "any";

/// Run `body` between "Start of"/"End of" log lines
fn stage<T>(name: &str, body: impl FnOnce() -> Result<T>) -> Result<T> {
    info!("Start of {}", name);
    let result = body();
    info!("End of {}", name);
    result
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn write_interfaces(ifaces: &IndexMap<String, Interface>, dir: &Path) -> Result<()> {
    for (name, iface) in ifaces {
        iface.write_iface(dir.join(format!("{}.iface", name)))?;
    }
    Ok(())
}

/// Whether `id` is allowed by the `compilers` option
fn synthesizer_allowed(allowed: &Value, id: &str) -> bool {
    match allowed {
        Value::String(s) => s == ANY_SYNTHESIZER || s == id,
        Value::Sequence(ids) => ids.iter().any(|v| v.as_str() == Some(id)),
        _ => false,
    }
}

/// Grades the submission in one judge directory
#[derive(Debug, Clone)]
pub struct Judge {
    layout: JudgeLayout,
    toolchain: Toolchain,
}

/// State threaded through the stages of one run
struct RunContext<'a> {
    layout: &'a JudgeLayout,
    toolchain: &'a Toolchain,
    options: RunOptions,
    record: &'a mut VerdictRecord,
}

impl Judge {
    pub fn new(root: impl AsRef<Path>, toolchain: Toolchain) -> Self {
        Self {
            layout: JudgeLayout::new(root.as_ref()),
            toolchain,
        }
    }

    pub fn layout(&self) -> &JudgeLayout {
        &self.layout
    }

    /// Grade the submission and persist the verdict record.
    ///
    /// The record is written even when the run fails; the error is returned
    /// afterwards.
    pub fn run(&self) -> Result<VerdictRecord> {
        info!("Start of judge in {}", self.layout.root().display());
        self.layout.create_directories()?;

        info!("Writing placeholder record with a generic internal error");
        write_placeholder(&self.layout.record())?;

        let mut record = VerdictRecord::new();
        let result = self.run_stages(&mut record);
        if let Err(ref e) = result {
            error!("Internal error: {}", e.chain());
            record.fail(e);
        }
        record.environment.time_end = Some(current_time());

        info!("Verdict: {}", record.verdict);
        info!("Writing correction record");
        record.save(&self.layout.record())?;
        info!("End of judge");

        result.map(|()| record)
    }

    fn run_stages(&self, record: &mut VerdictRecord) -> Result<()> {
        let options = RunOptions::load(&self.layout)?;
        record.submission = options.submission.clone();
        record.problem = options.problem.clone();
        record.driver = options.driver.clone();
        record.handler = options.handler.clone();

        let mut ctx = RunContext {
            layout: &self.layout,
            toolchain: &self.toolchain,
            options,
            record,
        };

        let reference = stage("reference preparation", || prepare_reference(&ctx))?;

        if !stage("synthesis", || synthesis(&mut ctx))?.is_success() {
            ctx.record.verdict = Verdict::CompileError;
            let stderr = ctx.layout.relative(&ctx.layout.synthesis_stderr());
            ctx.record.add_trace_file(stderr);
            return Ok(());
        }

        if stage("interface verification", || interface(&mut ctx, &reference))?
            == InterfaceOutcome::Mismatch
        {
            ctx.record.verdict = Verdict::CompileError;
            let diff = ctx.layout.relative(&ctx.layout.interface_diff());
            ctx.record.add_trace_file(diff);
            return Ok(());
        }

        let outcome = stage("verification", || verification(&mut ctx, &reference));
        // Statistics are gathered whatever the proof attempt did
        ctx.record.statistics = collect_statistics_file(ctx.layout.synthesis_stdout());
        outcome?;

        if ctx.record.verdict == Verdict::Accepted {
            stage("cleanup", || cleanup(ctx.layout, &reference.name))?;
        }
        Ok(())
    }
}

/// Synthesize the reference solution and write its interfaces
fn prepare_reference(ctx: &RunContext<'_>) -> Result<Interface> {
    let layout = ctx.layout;
    let status = ToolCommand::new(&ctx.toolchain.synthesizer)
        .arg(layout.solution_script())
        .current_dir(layout.root())
        .stdout_to(layout.solution_log())
        .stderr_to(layout.solution_errors())
        .timeout(ctx.toolchain.synthesis_timeout())
        .poll_interval(ctx.toolchain.poll_interval())
        .run()?;
    if !status.success() {
        warn!("Reference synthesis exited with {}", status);
    }

    let log = std::fs::read_to_string(layout.solution_log()).unwrap_or_default();
    let netlist = std::fs::read_to_string(layout.solution_netlist())?;
    let ifaces = parse_verilog(&netlist)?;
    write_interfaces(&ifaces, &layout.solution_dir())?;

    let top = parse_top_module(&log, &netlist)
        .ok_or_else(|| JudgeError::Reference("no top module in the reference netlist".to_string()))?;
    let reference = ifaces
        .get(&top)
        .cloned()
        .ok_or(IfaceError::UnknownModule(top))?;
    reference.write_iface(layout.solution_dir().join(TOP_MODULE_IFACE))?;

    let traits = detect_circuit_traits(&reference)?;
    info!(
        "Reference top module {} (sequential: {}, don't care: {})",
        reference.name, traits.sequential, traits.dont_care
    );
    Ok(reference)
}

fn synthesis(ctx: &mut RunContext<'_>) -> Result<SynthesisOutcome> {
    let allowed = ctx.options.get("compilers", Some(Value::from(ANY_SYNTHESIZER)))?;
    let id = ctx.options.get_str("compiler_id", None)?;
    ctx.record.synthesis.synthesizers = allowed.clone();
    ctx.record.synthesis.synthesizer = Some(id.clone());

    if !synthesizer_allowed(&allowed, &id) {
        return Err(JudgeError::InvalidSynthesizer {
            id,
            allowed: serde_yaml::to_string(&allowed)
                .map(|s| s.trim_end().to_string())
                .unwrap_or_default(),
        });
    }

    let backend = id
        .parse::<SynthesizerId>()?
        .backend(&ctx.toolchain.synthesizer);
    ctx.record.synthesis.info = Some(backend.info());

    let job = SynthesisJob {
        root: ctx.layout.root().to_path_buf(),
        script: ctx.layout.submission_synthesis_script().into(),
        stdout: ctx.layout.synthesis_stdout(),
        stderr: ctx.layout.synthesis_stderr(),
        timeout: ctx.toolchain.synthesis_timeout(),
        poll_interval: ctx.toolchain.poll_interval(),
    };
    let outcome = backend.synthesize(&job)?;
    info!("Synthesis outcome: {:?}", outcome);
    Ok(outcome)
}

/// Extract the submission's interfaces and diff its top module against the reference
fn interface(ctx: &mut RunContext<'_>, reference: &Interface) -> Result<InterfaceOutcome> {
    let layout = ctx.layout;
    let parsed = ToolCommand::new(&ctx.toolchain.synthesizer)
        .arg(layout.submission_parser_script())
        .current_dir(layout.root())
        .stdout_to(layout.submission_parser_log())
        .timeout(ctx.toolchain.synthesis_timeout())
        .poll_interval(ctx.toolchain.poll_interval())
        .run();
    if let Err(BackendError::TimedOut { .. }) = parsed {
        std::fs::write(
            layout.interface_diff(),
            "The submission's interface could not be extracted in time.\n",
        )?;
        return Ok(InterfaceOutcome::Mismatch);
    }
    parsed?;

    let netlist = std::fs::read_to_string(layout.submission_netlist())?;
    let ifaces = parse_verilog(&netlist)?;
    write_interfaces(&ifaces, &layout.submission_dir())?;

    let top = if ifaces.contains_key(&reference.name) {
        Some(reference.name.clone())
    } else {
        let log = std::fs::read_to_string(layout.synthesis_stdout()).unwrap_or_default();
        parse_top_module(&log, &netlist)
    };
    let Some(submitted) = top.and_then(|name| ifaces.get(&name)) else {
        std::fs::write(
            layout.interface_diff(),
            format!("No top module found; expected module {}.\n", reference.name),
        )?;
        return Ok(InterfaceOutcome::Mismatch);
    };
    submitted.write_iface(layout.submission_dir().join(TOP_MODULE_IFACE))?;
    ctx.record.interface = Some(submitted.clone());

    let status = ToolCommand::new(&ctx.toolchain.diff)
        .arg(layout.relative(&layout.solution_dir().join(TOP_MODULE_IFACE)))
        .arg(layout.relative(&layout.submission_dir().join(TOP_MODULE_IFACE)))
        .current_dir(layout.root())
        .stdout_to(layout.interface_diff())
        .timeout(ctx.toolchain.synthesis_timeout())
        .poll_interval(ctx.toolchain.poll_interval())
        .run()?;

    match status.code() {
        Some(0) => Ok(InterfaceOutcome::Match),
        Some(1) => Ok(InterfaceOutcome::Mismatch),
        _ => Err(JudgeError::ToolMalfunction {
            tool: ctx.toolchain.diff.display().to_string(),
            detail: format!(
                "exited with {}: {}",
                status,
                std::fs::read_to_string(layout.interface_diff()).unwrap_or_default().trim()
            ),
        }),
    }
}

fn verification(ctx: &mut RunContext<'_>, reference: &Interface) -> Result<()> {
    let layout = ctx.layout;
    let module = reference.name.as_str();
    prepare_script(&layout.eqy_template(), module, &layout.eqy_script(module))?;

    let checker = EquivalenceChecker::new(&ctx.toolchain.equivalence)
        .with_timeout(ctx.toolchain.verification_timeout())
        .with_poll_interval(ctx.toolchain.poll_interval());
    let outcome = checker.run(
        &layout.correction(),
        &layout.eqy_script_arg(module),
        &layout.eqy_stdout(),
        &layout.eqy_stderr(),
    )?;

    match outcome {
        EquivalenceOutcome::Equivalent => {
            info!("Accepted answer");
            ctx.record.verdict = Verdict::Accepted;
        }
        EquivalenceOutcome::TimedOut => {
            info!("Verification too long");
            ctx.record.verdict = Verdict::ExecutionError;
        }
        EquivalenceOutcome::NotEquivalent | EquivalenceOutcome::Inconclusive => {
            if outcome == EquivalenceOutcome::Inconclusive {
                warn!("Equivalence report announced no result, grading as wrong answer");
            }
            info!("Wrong answer, collecting counterexamples");
            ctx.record.verdict = Verdict::WrongAnswer;
            let produced = TraceArtifacts::new(layout, &ctx.toolchain.renderer)
                .with_timeout(ctx.toolchain.synthesis_timeout(), ctx.toolchain.poll_interval())
                .materialize()?;
            info!("{} trace files generated", produced.len());
            ctx.record.trace_files.extend(produced);
        }
    }
    Ok(())
}

/// Remove the intermediate files of an accepted run
fn cleanup(layout: &JudgeLayout, module: &str) -> Result<()> {
    for path in [
        layout.proof_dir(module),
        layout.yosys_dir(),
        layout.interface_diff(),
        layout.eqy_script(module),
    ] {
        remove_if_present(&path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesizer_allowed() {
        assert!(synthesizer_allowed(&Value::from("any"), "Yosys"));
        assert!(synthesizer_allowed(&Value::from("Yosys"), "Yosys"));
        assert!(!synthesizer_allowed(&Value::from("Other"), "Yosys"));

        let list: Value = serde_yaml::from_str("[Other, Yosys]").unwrap();
        assert!(synthesizer_allowed(&list, "Yosys"));
        let list: Value = serde_yaml::from_str("[Other]").unwrap();
        assert!(!synthesizer_allowed(&list, "Yosys"));
        assert!(!synthesizer_allowed(&Value::from(3), "Yosys"));
    }

    #[test]
    fn test_cleanup_ignores_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = JudgeLayout::new(dir.path());
        layout.create_directories().unwrap();
        std::fs::create_dir_all(layout.proof_dir("adder").join("strategies")).unwrap();
        std::fs::write(layout.interface_diff(), "").unwrap();

        cleanup(&layout, "adder").unwrap();
        assert!(!layout.proof_dir("adder").exists());
        assert!(!layout.yosys_dir().exists());
        assert!(!layout.interface_diff().exists());
        assert!(layout.correction().exists());
    }

    #[test]
    fn test_missing_configuration_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let judge = Judge::new(dir.path(), Toolchain::default());

        assert!(matches!(judge.run(), Err(JudgeError::Io(_))));

        let record: Value =
            serde_yaml::from_str(&std::fs::read_to_string(judge.layout().record()).unwrap()).unwrap();
        assert_eq!(record["veredict"].as_str(), Some("IE"));
        assert_eq!(record["internal_error"].as_str(), Some("exception"));
        assert!(record["traceback"].as_str().is_some());
        assert!(record["environment"]["time_end"].as_str().is_some());
    }
}
