//! Run configuration
//!
//! Two layers: the [`Toolchain`] naming the executables and time bounds
//! (optionally loaded from a TOML file), and the [`RunOptions`] gathered from
//! the problem, submission, driver and handler documents of a judge
//! directory.

use crate::error::{JudgeError, Result};
use crate::layout::JudgeLayout;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// External tools and their time bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toolchain {
    /// Synthesizer executable
    pub synthesizer: PathBuf,

    /// Formal equivalence checker executable
    pub equivalence: PathBuf,

    /// Line diff used for the interface check
    pub diff: PathBuf,

    /// Waveform to SVG renderer
    pub renderer: PathBuf,

    pub synthesis_timeout_secs: u64,

    pub verification_timeout_secs: u64,

    pub poll_interval_ms: u64,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            synthesizer: PathBuf::from("yosys"),
            equivalence: PathBuf::from("eqy"),
            diff: PathBuf::from("diff"),
            renderer: PathBuf::from("sootty"),
            synthesis_timeout_secs: 20,
            verification_timeout_secs: 300,
            poll_interval_ms: 200,
        }
    }
}

impl Toolchain {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    pub fn verification_timeout(&self) -> Duration {
        Duration::from_secs(self.verification_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Where a resolved option came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    Submission,
    Problem,
    Driver,
    Handler,
    Default,
}

impl OptionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionSource::Submission => "submission",
            OptionSource::Problem => "problem",
            OptionSource::Driver => "driver",
            OptionSource::Handler => "handler",
            OptionSource::Default => "default",
        }
    }
}

/// Snapshots of the four configuration documents
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub submission: Value,
    pub problem: Value,
    pub driver: Value,
    pub handler: Value,
}

fn read_yaml(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(|source| JudgeError::Yaml {
        path: path.display().to_string(),
        source,
    })
}

impl RunOptions {
    pub fn load(layout: &JudgeLayout) -> Result<Self> {
        Ok(Self {
            handler: read_yaml(&layout.handler_yml())?,
            problem: read_yaml(&layout.problem_yml())?,
            submission: read_yaml(&layout.submission_yml())?,
            driver: read_yaml(&layout.driver_yml())?,
        })
    }

    /// Look an option up in submission, problem, driver and handler order
    pub fn lookup(&self, key: &str) -> Option<(&Value, OptionSource)> {
        [
            (&self.submission, OptionSource::Submission),
            (&self.problem, OptionSource::Problem),
            (&self.driver, OptionSource::Driver),
            (&self.handler, OptionSource::Handler),
        ]
        .into_iter()
        .find_map(|(doc, source)| doc.get(key).map(|v| (v, source)))
    }

    /// Resolve an option, falling back to `default`. A null value counts as missing.
    pub fn get(&self, key: &str, default: Option<Value>) -> Result<Value> {
        let (value, source) = match self.lookup(key) {
            Some((value, source)) => (value.clone(), source),
            None => (default.unwrap_or(Value::Null), OptionSource::Default),
        };
        if value.is_null() {
            return Err(JudgeError::MissingOption(key.to_string()));
        }
        info!(
            "Using value {} for option {} from {}",
            display_value(&value),
            key,
            source.as_str()
        );
        Ok(value)
    }

    pub fn get_str(&self, key: &str, default: Option<&str>) -> Result<String> {
        let value = self.get(key, default.map(|d| Value::String(d.to_string())))?;
        match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(JudgeError::InvalidOption {
                option: key.to_string(),
                reason: format!("expected a string, found {}", display_value(&other)),
            }),
        }
    }
}

fn display_value(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn options() -> RunOptions {
        RunOptions {
            submission: yaml("compiler_id: Yosys\n"),
            problem: yaml("compilers: [Yosys]\nlimit: 3\n"),
            driver: yaml("compiler_id: Other\nlimit: 5\ndepth: 7\n"),
            handler: yaml("handler: circuits\nempty: ~\n"),
        }
    }

    #[test]
    fn test_lookup_precedence() {
        let opts = options();
        assert_eq!(opts.lookup("compiler_id").unwrap().1, OptionSource::Submission);
        assert_eq!(opts.lookup("limit").unwrap().1, OptionSource::Problem);
        assert_eq!(opts.lookup("depth").unwrap().1, OptionSource::Driver);
        assert_eq!(opts.lookup("handler").unwrap().1, OptionSource::Handler);
        assert!(opts.lookup("absent").is_none());

        assert_eq!(opts.get_str("compiler_id", None).unwrap(), "Yosys");
        assert_eq!(opts.get_str("limit", None).unwrap(), "3");
    }

    #[test]
    fn test_defaults_and_missing() {
        let opts = options();
        assert_eq!(opts.get_str("compilers_x", Some("any")).unwrap(), "any");
        assert!(matches!(
            opts.get("absent", None),
            Err(JudgeError::MissingOption(key)) if key == "absent"
        ));
        assert!(matches!(opts.get("empty", None), Err(JudgeError::MissingOption(_))));
        assert!(matches!(
            opts.get_str("compilers", None),
            Err(JudgeError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_empty_document_has_no_options() {
        let opts = RunOptions {
            submission: yaml(""),
            ..Default::default()
        };
        assert!(opts.lookup("anything").is_none());
    }

    #[test]
    fn test_toolchain_defaults_and_overrides() {
        let defaults = Toolchain::default();
        assert_eq!(defaults.synthesis_timeout(), Duration::from_secs(20));
        assert_eq!(defaults.verification_timeout(), Duration::from_secs(300));
        assert_eq!(defaults.poll_interval(), Duration::from_millis(200));

        let toolchain = Toolchain::from_toml(
            r#"
            equivalence = "/opt/oss-cad-suite/bin/eqy"
            verification_timeout_secs = 600
            "#,
        )
        .unwrap();
        assert_eq!(toolchain.equivalence, PathBuf::from("/opt/oss-cad-suite/bin/eqy"));
        assert_eq!(toolchain.verification_timeout_secs, 600);
        assert_eq!(toolchain.synthesizer, PathBuf::from("yosys"));

        assert!(matches!(
            Toolchain::from_toml("poll_interval_ms = \"fast\""),
            Err(JudgeError::Toml(_))
        ));
    }

    #[test]
    fn test_load_from_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for (path, body) in [
            ("problem/handler.yml", "handler: circuits\n"),
            ("problem/problem.yml", "title: adder\n"),
            ("submission/submission.yml", "compiler_id: Yosys\n"),
            ("driver/driver.yml", "compilers: any\n"),
        ] {
            std::fs::create_dir_all(root.join(path).parent().unwrap()).unwrap();
            std::fs::write(root.join(path), body).unwrap();
        }

        let opts = RunOptions::load(&JudgeLayout::new(root)).unwrap();
        assert_eq!(opts.get_str("compilers", None).unwrap(), "any");
        assert_eq!(opts.get_str("title", None).unwrap(), "adder");
    }
}
