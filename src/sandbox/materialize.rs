use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use super::{HarnessSpec, LanguageRunner, SandboxError};

/// The candidate source file and its harness for one runner invocation
///
/// Both files are removed by [`Artifacts::release`]; if the value is dropped
/// without being released (early return, panic, cancelled future) `Drop`
/// removes them synchronously instead.
#[derive(Debug)]
pub struct Artifacts {
    id: String,
    source_path: PathBuf,
    harness_path: PathBuf,
    released: bool,
}

impl Artifacts {
    fn new(scratch_dir: &Path, id: String, extension: &str) -> Self {
        Self {
            source_path: scratch_dir.join(format!("{id}.{extension}")),
            harness_path: scratch_dir.join(format!("{id}_harness.{extension}")),
            id,
            released: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn harness_path(&self) -> &Path {
        &self.harness_path
    }

    /// Deletes both files
    pub async fn release(mut self) {
        self.released = true;
        for path in [&self.source_path, &self.harness_path] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => log::debug!("Removed sandbox artifact {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => log::error!("Failed to remove sandbox artifact {}: {e}", path.display()),
            }
        }
    }
}

impl Drop for Artifacts {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        for path in [&self.source_path, &self.harness_path] {
            match std::fs::remove_file(path) {
                Ok(()) => log::debug!("Removed orphaned sandbox artifact {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => log::error!("Failed to remove sandbox artifact {}: {e}", path.display()),
            }
        }
    }
}

/// Fresh artifact identifier: timestamp plus random suffix
///
/// Only ASCII letters, digits and underscores, starting with a letter, so it
/// is a valid module name in every supported language.
pub fn artifact_id() -> String {
    format!(
        "sub_{}_{}",
        Utc::now().format("%Y%m%d%H%M%S%6f"),
        Uuid::new_v4().simple()
    )
}

/// Writes `code` and a generated harness into `scratch_dir`
pub async fn materialize<R: LanguageRunner + ?Sized>(
    runner: &R,
    scratch_dir: &Path,
    code: &str,
    entry_method: &str,
) -> Result<Artifacts, SandboxError> {
    tokio::fs::create_dir_all(scratch_dir)
        .await
        .map_err(SandboxError::Materialize)?;

    // Constructed before the first write so partial output is cleaned up on error
    let artifacts = Artifacts::new(scratch_dir, artifact_id(), runner.source_extension());

    let harness = runner.render_harness(&HarnessSpec {
        source_path: artifacts.source_path(),
        module_name: artifacts.id(),
        entry_method,
    });

    tokio::fs::write(artifacts.source_path(), code)
        .await
        .map_err(SandboxError::Materialize)?;
    tokio::fs::write(artifacts.harness_path(), harness)
        .await
        .map_err(SandboxError::Materialize)?;

    log::debug!(
        "Materialized {} submission {} in {}",
        runner.language(),
        artifacts.id(),
        scratch_dir.display()
    );

    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{Language, create_runner};

    #[test]
    fn test_artifact_id_is_identifier() {
        let id = artifact_id();
        assert!(id.starts_with("sub_"));
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        assert_ne!(id, artifact_id());
    }

    #[tokio::test]
    async fn test_materialize_and_release() {
        let scratch = tempfile::tempdir().unwrap();
        let runner = create_runner(Language::Python, Language::Python.default_command());

        let artifacts = materialize(runner.as_ref(), scratch.path(), "x = 1\n", "twoSum")
            .await
            .unwrap();

        let source = std::fs::read_to_string(artifacts.source_path()).unwrap();
        assert_eq!(source, "x = 1\n");
        assert!(artifacts.harness_path().exists());
        assert!(
            artifacts
                .harness_path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .ends_with("_harness.py")
        );

        artifacts.release().await;
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_drop_removes_unreleased_artifacts() {
        let scratch = tempfile::tempdir().unwrap();
        let runner = create_runner(Language::JavaScript, Language::JavaScript.default_command());

        let artifacts = materialize(runner.as_ref(), scratch.path(), "var f = 1;", "f")
            .await
            .unwrap();
        let source_path = artifacts.source_path().to_path_buf();
        assert!(source_path.exists());

        drop(artifacts);
        assert!(!source_path.exists());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_materialize_creates_scratch_dir() {
        let scratch = tempfile::tempdir().unwrap();
        let nested = scratch.path().join("a").join("b");
        let runner = create_runner(Language::Python, Language::Python.default_command());

        let artifacts = materialize(runner.as_ref(), &nested, "", "f").await.unwrap();
        assert!(artifacts.source_path().starts_with(&nested));
        artifacts.release().await;
    }
}
