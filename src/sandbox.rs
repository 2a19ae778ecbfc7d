mod compare;
mod javascript;
mod judge;
mod language;
mod materialize;
mod process;
mod python;

pub use compare::values_equal;
pub use judge::Judge;
pub use language::{HarnessSpec, Language, LanguageRegistry, LanguageRunner, create_runner};
pub use materialize::{Artifacts, materialize};
pub use process::run_harness;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::SandboxConfig;

/// One hidden (or public) input/output pair of a problem
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TestCase {
    /// Parameter name to argument, in declaration order
    pub input: Map<String, Value>,
    pub output: Value,
}

/// Candidate code submitted for one problem, never persisted
#[derive(Debug, Clone)]
pub struct Submission {
    pub problem_id: String,
    pub code: String,
    pub language: String,
}

/// Outcome of one hidden test case
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TestResult {
    /// 1-based position in the hidden test case sequence
    pub test_id: u32,
    pub passed: bool,
    pub input: Map<String, Value>,
    pub expected: Value,
    pub actual: Value,
    pub error: Option<&'static str>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub problem_id: String,
    pub results: Vec<TestResult>,
    pub summary: Summary,
}

impl ValidationReport {
    pub fn new(problem_id: String, results: Vec<TestResult>) -> Self {
        let total = results.len() as u32;
        let passed = results.iter().filter(|r| r.passed).count() as u32;
        Self {
            problem_id,
            results,
            summary: Summary {
                total,
                passed,
                failed: total - passed,
            },
        }
    }
}

/// Runtime knobs shared by every sandbox invocation
#[derive(Debug, Clone)]
pub struct SandboxSettings {
    pub timeout: Duration,
    pub scratch_dir: PathBuf,
}

impl From<&SandboxConfig> for SandboxSettings {
    fn from(config: &SandboxConfig) -> Self {
        Self {
            timeout: config.timeout(),
            scratch_dir: config.scratch_dir(),
        }
    }
}

/// Every way a single test case execution can fail
///
/// The `Display` text carries internal detail (stderr, paths, parser messages)
/// and is only ever logged. Callers outside the server see [`SandboxError::label`].
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("language {0:?} is not supported")]
    UnsupportedLanguage(String),

    #[error("problem has no entry method configured")]
    MissingEntryMethod,

    #[error("failed to write sandbox artifacts: {0}")]
    Materialize(#[source] std::io::Error),

    #[error("failed to spawn interpreter {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("execution exceeded the {0:?} wall-clock limit")]
    Timeout(Duration),

    #[error("runtime error: {detail}")]
    Runtime { detail: String },

    #[error("output is not valid JSON ({source}): {stdout:?}")]
    OutputFormat {
        stdout: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to supervise interpreter: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Fixed, client-safe classification of this failure
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnsupportedLanguage(_) => "Language Not Supported",
            Self::MissingEntryMethod => "Configuration Error",
            Self::Materialize(_) | Self::Spawn { .. } | Self::Io(_) => "System Error",
            Self::Timeout(_) => "Time Limit Exceeded",
            Self::Runtime { .. } => "Runtime Error",
            Self::OutputFormat { .. } => "Output Format Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(test_id: u32, passed: bool) -> TestResult {
        TestResult {
            test_id,
            passed,
            input: Map::new(),
            expected: Value::Null,
            actual: Value::Null,
            error: None,
        }
    }

    #[test]
    fn test_report_summary_counts() {
        let report = ValidationReport::new(
            "two-sum".to_string(),
            vec![result(1, true), result(2, false), result(3, true)],
        );
        assert_eq!(
            report.summary,
            Summary {
                total: 3,
                passed: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn test_empty_report() {
        let report = ValidationReport::new("empty".to_string(), Vec::new());
        assert_eq!(report.summary.total, 0);
        assert_eq!(report.summary.passed + report.summary.failed, 0);
    }

    #[test]
    fn test_labels_hide_internal_detail() {
        let err = SandboxError::Runtime {
            detail: "Traceback (most recent call last): secret.py".to_string(),
        };
        assert_eq!(err.label(), "Runtime Error");
        assert!(err.to_string().contains("Traceback"));

        let err = SandboxError::Timeout(Duration::from_secs(5));
        assert_eq!(err.label(), "Time Limit Exceeded");
    }

    #[test]
    fn test_result_serializes_null_actual() {
        let mut failed = result(1, false);
        failed.error = Some("Runtime Error");
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(
            value,
            json!({
                "test_id": 1,
                "passed": false,
                "input": {},
                "expected": null,
                "actual": null,
                "error": "Runtime Error"
            })
        );
    }
}
