use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::sandbox::{Language, TestCase};

#[derive(Parser)]
#[command(name = "ace", version = "1.0", about, long_about = None)]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(long = "config", short = 'c')]
    pub config_path: String,

    /// Whether to flush the existing database
    #[arg(long = "flush-data", short = 'f', default_value_t = false)]
    pub flush_data: bool,

    /// Use this database file instead of the one in the local data directory
    #[arg(long = "db")]
    pub db_path: Option<PathBuf>,
}

impl CliArgs {
    /// Load the configuration from the specified file
    pub fn to_config(&self) -> std::io::Result<Config> {
        let file = std::fs::File::open(&self.config_path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| e.into())
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub languages: Vec<LanguageConfig>,
    #[serde(default)]
    pub problems: Vec<ProblemConfig>,
}

#[derive(Deserialize, Debug)]
pub struct ServerConfig {
    pub bind_address: Option<String>,
    pub bind_port: Option<u16>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SandboxConfig {
    /// Wall-clock limit for one test case, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: MilliSecond,
    /// Directory holding the per-invocation source and harness files
    pub scratch_dir: Option<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            scratch_dir: None,
        }
    }
}

impl SandboxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from(self.timeout_ms)
    }

    /// Absolute scratch directory; interpreters run with it as working directory
    pub fn scratch_dir(&self) -> PathBuf {
        let dir = self
            .scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("ace-sandbox"));
        std::path::absolute(&dir).unwrap_or(dir)
    }
}

fn default_timeout_ms() -> MilliSecond {
    MilliSecond(5000)
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MilliSecond(pub u64);

impl From<MilliSecond> for Duration {
    fn from(value: MilliSecond) -> Self {
        Duration::from_millis(value.0)
    }
}

/// Interpreter override for one language
#[derive(Deserialize, Debug, Clone)]
pub struct LanguageConfig {
    pub name: Language,
    pub command: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" => Ok(Self::Easy),
            "Medium" => Ok(Self::Medium),
            "Hard" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty {other:?}")),
        }
    }
}

/// Full problem document, hidden test cases included
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProblemConfig {
    pub problem_id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub description: String,
    #[serde(default)]
    pub examples: Vec<Value>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub starter_code: Map<String, Value>,
    pub entry_method: Option<String>,
    #[serde(default)]
    pub public_test_cases: Vec<TestCase>,
    pub hidden_test_cases: Vec<TestCase>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let file = std::fs::File::open("data/example.json").unwrap();
        let reader = std::io::BufReader::new(file);
        let config: Config = serde_json::from_reader(reader).unwrap();
        assert_eq!(config.server.bind_address, Some("127.0.0.1".to_string()));
        assert_eq!(config.sandbox.timeout_ms, MilliSecond(5000));
        assert_eq!(config.languages[0].name, Language::Python);

        let two_sum = &config.problems[0];
        assert_eq!(two_sum.problem_id, "two-sum");
        assert_eq!(two_sum.difficulty, Difficulty::Easy);
        assert_eq!(two_sum.entry_method.as_deref(), Some("twoSum"));
        assert_eq!(two_sum.hidden_test_cases.len(), 3);
    }

    #[test]
    fn test_sandbox_defaults() {
        let config: Config = serde_json::from_str(r#"{"server": {}}"#).unwrap();
        assert_eq!(config.sandbox.timeout(), Duration::from_secs(5));
        assert!(config.sandbox.scratch_dir().ends_with("ace-sandbox"));
        assert!(config.languages.is_empty());
        assert!(config.problems.is_empty());
    }

    #[test]
    fn test_test_case_keeps_parameter_order() {
        let case: TestCase =
            serde_json::from_str(r#"{"input": {"target": 9, "nums": [2, 7]}, "output": [0, 1]}"#)
                .unwrap();
        let keys: Vec<&String> = case.input.keys().collect();
        assert_eq!(keys, ["target", "nums"]);
    }

    #[test]
    fn test_unknown_language_is_rejected() {
        let err = serde_json::from_str::<LanguageConfig>(r#"{"name": "java", "command": ["java"]}"#);
        assert!(err.is_err());
    }
}
