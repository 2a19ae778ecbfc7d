use std::time::Instant;

use serde_json::Value;

use crate::config::ProblemConfig;

use super::{
    LanguageRegistry, SandboxError, SandboxSettings, Submission, TestCase, TestResult,
    ValidationReport, values_equal,
};

/// Runs submissions against the hidden test cases of a problem
///
/// Holds no per-request state: every call to [`Judge::validate`] materializes,
/// runs and cleans up its own artifacts.
pub struct Judge {
    registry: LanguageRegistry,
    settings: SandboxSettings,
}

impl Judge {
    pub fn new(registry: LanguageRegistry, settings: SandboxSettings) -> Self {
        Self { registry, settings }
    }

    /// Runs every hidden test case of `problem` in order, one subprocess at a time
    ///
    /// Never fails: each per-case error becomes a failed [`TestResult`], so the
    /// report always has one entry per hidden test case.
    pub async fn validate(
        &self,
        problem: &ProblemConfig,
        submission: &Submission,
    ) -> ValidationReport {
        let start_time = Instant::now();
        let runner = self.registry.get(&submission.language);
        let entry_method = problem
            .entry_method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty());

        if runner.is_none() {
            log::info!(
                "Rejecting submission for {} in unsupported language {:?}",
                problem.problem_id,
                submission.language
            );
        }

        let mut results = Vec::with_capacity(problem.hidden_test_cases.len());

        for (idx, case) in problem.hidden_test_cases.iter().enumerate() {
            let test_id = idx as u32 + 1;

            let outcome = match (runner, entry_method) {
                (None, _) => Err(SandboxError::UnsupportedLanguage(
                    submission.language.clone(),
                )),
                (Some(_), None) => Err(SandboxError::MissingEntryMethod),
                (Some(runner), Some(entry_method)) => {
                    runner
                        .execute(&submission.code, case, entry_method, &self.settings)
                        .await
                }
            };

            results.push(grade(&problem.problem_id, test_id, case, outcome));
        }

        let report = ValidationReport::new(problem.problem_id.clone(), results);
        log::info!(
            "Validated {} submission for {}: {}/{} passed in {:?}",
            submission.language,
            problem.problem_id,
            report.summary.passed,
            report.summary.total,
            start_time.elapsed()
        );

        report
    }
}

/// Turns the outcome of one execution into a client-facing result
fn grade(
    problem_id: &str,
    test_id: u32,
    case: &TestCase,
    outcome: Result<Value, SandboxError>,
) -> TestResult {
    match outcome {
        Ok(actual) => TestResult {
            test_id,
            passed: values_equal(&actual, &case.output),
            input: case.input.clone(),
            expected: case.output.clone(),
            actual,
            error: None,
        },
        Err(e) => {
            match &e {
                SandboxError::Materialize(_) | SandboxError::Spawn { .. } | SandboxError::Io(_) => {
                    log::error!("Test {test_id} of {problem_id} could not run: {e}")
                }
                _ => log::warn!("Test {test_id} of {problem_id} failed: {e}"),
            }
            TestResult {
                test_id,
                passed: false,
                input: case.input.clone(),
                expected: case.output.clone(),
                actual: Value::Null,
                error: Some(e.label()),
            }
        }
    }
}
