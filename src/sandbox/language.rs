use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;

use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LanguageConfig;

use super::javascript::JavaScript;
use super::python::Python;
use super::{SandboxError, SandboxSettings, TestCase, materialize, run_harness};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Python, Language::JavaScript];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
        }
    }

    /// Interpreter used when the configuration does not override it
    pub fn default_command(&self) -> Vec<String> {
        match self {
            Self::Python => vec!["python3".to_string()],
            Self::JavaScript => vec!["node".to_string()],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.name() == s)
            .ok_or_else(|| SandboxError::UnsupportedLanguage(s.to_string()))
    }
}

/// What a harness needs to know to load and call the candidate code
#[derive(Debug, Clone, Copy)]
pub struct HarnessSpec<'a> {
    pub source_path: &'a Path,
    /// Identifier-safe name for the candidate module
    pub module_name: &'a str,
    pub entry_method: &'a str,
}

/// Execution strategy for one interpreted language
///
/// Implementors only describe the language: file extension, interpreter
/// command and harness text. Materializing, spawning and cleanup are shared.
pub trait LanguageRunner: Send + Sync {
    fn language(&self) -> Language;

    fn source_extension(&self) -> &'static str;

    /// Interpreter program followed by its fixed arguments
    fn command(&self) -> &[String];

    /// Source text of the program that loads the candidate and calls the entry method
    fn render_harness(&self, spec: &HarnessSpec<'_>) -> String;

    /// Runs one test case against `code` and returns the parsed return value
    fn execute<'a>(
        &'a self,
        code: &'a str,
        case: &'a TestCase,
        entry_method: &'a str,
        settings: &'a SandboxSettings,
    ) -> BoxFuture<'a, Result<Value, SandboxError>> {
        async move {
            let artifacts = materialize(self, &settings.scratch_dir, code, entry_method).await?;
            let outcome = run_harness(
                self.command(),
                &artifacts,
                &case.input,
                settings.timeout,
                &settings.scratch_dir,
            )
            .await;
            artifacts.release().await;
            outcome
        }
        .boxed()
    }
}

/// Substitutes the `%NAME%` placeholders of a harness template with JSON string literals
///
/// JSON string syntax is a subset of both Python and JavaScript string literal
/// syntax, so the same quoting serves every harness.
pub(super) fn render_template(template: &str, spec: &HarnessSpec<'_>) -> String {
    let literal = |s: &str| serde_json::Value::from(s).to_string();

    let mapping = [
        ("%ENTRY_METHOD%", literal(spec.entry_method)),
        ("%SOURCE_PATH%", literal(&spec.source_path.to_string_lossy())),
        ("%MODULE_NAME%", literal(spec.module_name)),
    ];

    mapping
        .iter()
        .fold(template.to_string(), |t, (k, v)| t.replace(k, v))
}

/// Builds the runner for `language` with the given interpreter command
pub fn create_runner(language: Language, command: Vec<String>) -> Box<dyn LanguageRunner> {
    match language {
        Language::Python => Box::new(Python::new(command)),
        Language::JavaScript => Box::new(JavaScript::new(command)),
    }
}

/// Runners keyed by language, looked up by the name a client submits
pub struct LanguageRegistry {
    runners: Vec<Box<dyn LanguageRunner>>,
}

impl LanguageRegistry {
    /// One runner per known language, with configured interpreter overrides applied
    pub fn from_config(overrides: &[LanguageConfig]) -> Self {
        let runners = Language::ALL
            .into_iter()
            .map(|language| {
                let command = overrides
                    .iter()
                    .rev()
                    .find(|o| o.name == language && !o.command.is_empty())
                    .map(|o| o.command.clone())
                    .unwrap_or_else(|| language.default_command());
                create_runner(language, command)
            })
            .collect();

        Self { runners }
    }

    pub fn get(&self, name: &str) -> Option<&dyn LanguageRunner> {
        let language = name.parse::<Language>().ok()?;
        self.runners
            .iter()
            .find(|r| r.language() == language)
            .map(|r| r.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn LanguageRunner> {
        self.runners.iter().map(|r| r.as_ref())
    }

    /// Probes every interpreter with `--version` and returns the languages that are unusable
    pub async fn check_interpreters(&self) -> Vec<Language> {
        let mut missing = Vec::new();

        for runner in self.iter() {
            let Some(program) = runner.command().first() else {
                log::warn!("No interpreter configured for {}", runner.language());
                missing.push(runner.language());
                continue;
            };

            let available = tokio::process::Command::new(program)
                .arg("--version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
                .map(|status| status.success())
                .unwrap_or(false);

            if available {
                log::info!("Interpreter for {} found: {program}", runner.language());
            } else {
                log::warn!(
                    "Interpreter {program} for {} is not available, its submissions will fail",
                    runner.language()
                );
                missing.push(runner.language());
            }
        }

        missing
    }
}
