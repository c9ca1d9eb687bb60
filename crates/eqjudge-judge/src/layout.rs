//! Paths inside a judge directory

use std::path::{Path, PathBuf};

/// Interface file every reference and submission top module is copied to
pub const TOP_MODULE_IFACE: &str = "top_module.iface";

/// Directory a single grading run operates in
#[derive(Debug, Clone)]
pub struct JudgeLayout {
    root: PathBuf,
}

impl JudgeLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Configuration documents

    pub fn handler_yml(&self) -> PathBuf {
        self.root.join("problem/handler.yml")
    }

    pub fn problem_yml(&self) -> PathBuf {
        self.root.join("problem/problem.yml")
    }

    pub fn submission_yml(&self) -> PathBuf {
        self.root.join("submission/submission.yml")
    }

    pub fn driver_yml(&self) -> PathBuf {
        self.root.join("driver/driver.yml")
    }

    // Driver scripts, relative to the root since tools run from there

    pub fn solution_script(&self) -> &'static str {
        "driver/yosys/yosys_solution_parser_and_synthesis.ys"
    }

    pub fn submission_synthesis_script(&self) -> &'static str {
        "driver/yosys/yosys_submission_synthesis.ys"
    }

    pub fn submission_parser_script(&self) -> &'static str {
        "driver/yosys/yosys_submission_parser.ys"
    }

    pub fn eqy_template(&self) -> PathBuf {
        self.root.join("driver/yosys/top_module.eqy")
    }

    pub fn eqy_script(&self, module: &str) -> PathBuf {
        self.root.join(format!("driver/yosys/{}.eqy", module))
    }

    /// Script argument for the checker, which runs from `correction/`
    pub fn eqy_script_arg(&self, module: &str) -> String {
        format!("../driver/yosys/{}.eqy", module)
    }

    // Correction outputs

    pub fn correction(&self) -> PathBuf {
        self.root.join("correction")
    }

    pub fn record(&self) -> PathBuf {
        self.correction().join("correction.yml")
    }

    pub fn interface_diff(&self) -> PathBuf {
        self.correction().join("interface.txt")
    }

    pub fn yosys_dir(&self) -> PathBuf {
        self.correction().join("yosys")
    }

    pub fn solution_dir(&self) -> PathBuf {
        self.yosys_dir().join("solution")
    }

    pub fn submission_dir(&self) -> PathBuf {
        self.yosys_dir().join("submission")
    }

    pub fn solution_log(&self) -> PathBuf {
        self.solution_dir().join("yosys.stdout")
    }

    pub fn solution_errors(&self) -> PathBuf {
        self.solution_dir().join("yosys.stderr")
    }

    pub fn solution_netlist(&self) -> PathBuf {
        self.solution_dir().join("solution.v")
    }

    pub fn synthesis_stdout(&self) -> PathBuf {
        self.submission_dir().join("synthesis.stdout")
    }

    pub fn synthesis_stderr(&self) -> PathBuf {
        self.submission_dir().join("synthesis.stderr")
    }

    pub fn submission_parser_log(&self) -> PathBuf {
        self.submission_dir().join("yosys.stdout")
    }

    pub fn submission_netlist(&self) -> PathBuf {
        self.submission_dir().join("submission.v")
    }

    pub fn eqy_stdout(&self) -> PathBuf {
        self.yosys_dir().join("eqy.stdout")
    }

    pub fn eqy_stderr(&self) -> PathBuf {
        self.yosys_dir().join("eqy.stderr")
    }

    /// Checker work directory for a module
    pub fn proof_dir(&self, module: &str) -> PathBuf {
        self.correction().join(module)
    }

    pub fn traces_dir(&self) -> PathBuf {
        self.correction().join("traces")
    }

    /// Path as recorded in the verdict record: relative to the root, `/`-separated
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Create the output directories a run writes into
    pub fn create_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.solution_dir())?;
        std::fs::create_dir_all(self.submission_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = JudgeLayout::new("/judge");
        assert_eq!(layout.record(), PathBuf::from("/judge/correction/correction.yml"));
        assert_eq!(
            layout.synthesis_stderr(),
            PathBuf::from("/judge/correction/yosys/submission/synthesis.stderr")
        );
        assert_eq!(layout.eqy_script("adder"), PathBuf::from("/judge/driver/yosys/adder.eqy"));
        assert_eq!(layout.eqy_script_arg("adder"), "../driver/yosys/adder.eqy");
        assert_eq!(layout.relative(&layout.interface_diff()), "correction/interface.txt");
    }

    #[test]
    fn test_create_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = JudgeLayout::new(dir.path());
        layout.create_directories().unwrap();
        assert!(layout.solution_dir().is_dir());
        assert!(layout.submission_dir().is_dir());
        // Idempotent
        layout.create_directories().unwrap();
    }
}
