use std::io::{self, ErrorKind};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::{Artifacts, SandboxError};

/// Upper bound on captured bytes per stream; the rest is drained and discarded
const MAX_CAPTURE_BYTES: u64 = 1 << 20;

/// How long pipes may stay open after the interpreter itself has exited
const PIPE_GRACE: Duration = Duration::from_millis(500);

/// Runs the harness of `artifacts` on one test case input
///
/// The input mapping is written to the interpreter's stdin as JSON, stdout and
/// stderr are collected concurrently, and the process is killed once `limit`
/// elapses. On success the parsed stdout is returned.
pub async fn run_harness(
    command: &[String],
    artifacts: &Artifacts,
    input: &Map<String, Value>,
    limit: Duration,
    work_dir: &Path,
) -> Result<Value, SandboxError> {
    let (program, args) = command.split_first().ok_or_else(|| SandboxError::Spawn {
        program: String::new(),
        source: io::Error::new(ErrorKind::InvalidInput, "empty interpreter command"),
    })?;
    let payload = serde_json::to_vec(input).map_err(io::Error::other)?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .arg(artifacts.harness_path())
        .current_dir(work_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| SandboxError::Spawn {
        program: program.clone(),
        source,
    })?;
    let start_time = Instant::now();
    log::debug!(
        "Spawned {program} (pid {:?}) for {}",
        child.id(),
        artifacts.id()
    );

    let stdin = child.stdin.take();
    let writer = tokio::spawn(async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await?;
        }
        Ok::<_, io::Error>(())
    });
    let stdout_reader = tokio::spawn(capture(child.stdout.take()));
    let stderr_reader = tokio::spawn(capture(child.stderr.take()));

    let status = match timeout(limit, child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            if let Err(e) = child.kill().await {
                log::error!("Failed to kill timed out process of {}: {e}", artifacts.id());
            }
            writer.abort();
            stdout_reader.abort();
            stderr_reader.abort();
            log::debug!(
                "Killed {} after {:?}",
                artifacts.id(),
                start_time.elapsed()
            );
            return Err(SandboxError::Timeout(limit));
        }
    };

    match writer.await.map_err(io::Error::other)? {
        Ok(()) => {}
        // The interpreter may exit before reading its input
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
        Err(e) => log::debug!("Failed to write input of {}: {e}", artifacts.id()),
    }

    let stdout = join_capture(stdout_reader, limit).await?;
    let stderr = join_capture(stderr_reader, limit).await?;

    log::debug!(
        "{} exited with {status} after {:?}",
        artifacts.id(),
        start_time.elapsed()
    );

    if !stderr.is_empty() {
        return Err(SandboxError::Runtime {
            detail: String::from_utf8_lossy(&stderr).trim_end().to_string(),
        });
    }
    if !status.success() {
        return Err(SandboxError::Runtime {
            detail: format!("interpreter exited with {status}"),
        });
    }

    serde_json::from_slice(&stdout).map_err(|source| SandboxError::OutputFormat {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        source,
    })
}

/// Reads a pipe to the end, keeping at most [`MAX_CAPTURE_BYTES`]
async fn capture<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(pipe) = pipe {
        let mut limited = pipe.take(MAX_CAPTURE_BYTES);
        limited.read_to_end(&mut buf).await?;
        tokio::io::copy(&mut limited.into_inner(), &mut tokio::io::sink()).await?;
    }
    Ok(buf)
}

/// Joins a capture task; pipes held open by leftover descendants count as a timeout
async fn join_capture(
    task: JoinHandle<io::Result<Vec<u8>>>,
    limit: Duration,
) -> Result<Vec<u8>, SandboxError> {
    let abort = task.abort_handle();
    match timeout(PIPE_GRACE, task).await {
        Ok(joined) => Ok(joined.map_err(io::Error::other)??),
        Err(_) => {
            abort.abort();
            Err(SandboxError::Timeout(limit))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::sandbox::{LanguageRunner, materialize};
    use serde_json::json;

    /// Runner whose "harness" is a shell script, so these tests only need `sh`
    struct Shell(Vec<String>);

    impl LanguageRunner for Shell {
        fn language(&self) -> crate::sandbox::Language {
            crate::sandbox::Language::Python
        }

        fn source_extension(&self) -> &'static str {
            "sh"
        }

        fn command(&self) -> &[String] {
            &self.0
        }

        fn render_harness(&self, spec: &crate::sandbox::HarnessSpec<'_>) -> String {
            format!(". '{}'\n", spec.source_path.display())
        }
    }

    async fn run_script(script: &str, limit: Duration) -> Result<Value, SandboxError> {
        let scratch = tempfile::tempdir().unwrap();
        let shell = Shell(vec!["sh".to_string()]);
        let artifacts = materialize(&shell, scratch.path(), script, "main")
            .await
            .unwrap();
        let input = json!({"nums": [2, 7, 11, 15], "target": 9});
        let result = run_harness(
            shell.command(),
            &artifacts,
            input.as_object().unwrap(),
            limit,
            scratch.path(),
        )
        .await;
        artifacts.release().await;
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
        result
    }

    #[tokio::test]
    async fn test_stdin_is_forwarded_and_stdout_parsed() {
        let value = run_script("cat\n", Duration::from_secs(5)).await.unwrap();
        assert_eq!(value, json!({"nums": [2, 7, 11, 15], "target": 9}));
    }

    #[tokio::test]
    async fn test_stderr_is_runtime_error() {
        let err = run_script("echo boom >&2\necho 1\n", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::Runtime { ref detail } if detail == "boom"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_runtime_error() {
        let err = run_script("exit 3\n", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.label(), "Runtime Error");
    }

    #[tokio::test]
    async fn test_invalid_json_is_output_format_error() {
        let err = run_script("echo not json\n", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::OutputFormat { ref stdout, .. } if stdout == "not json\n"));
    }

    #[tokio::test]
    async fn test_hang_is_killed_at_deadline() {
        let start = Instant::now();
        let err = run_script("while :; do :; done\n", Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::Timeout(_)));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_spawn_error() {
        let scratch = tempfile::tempdir().unwrap();
        let shell = Shell(vec!["definitely-not-an-interpreter-4242".to_string()]);
        let artifacts = materialize(&shell, scratch.path(), "", "main").await.unwrap();
        let err = run_harness(
            shell.command(),
            &artifacts,
            &Map::new(),
            Duration::from_secs(1),
            scratch.path(),
        )
        .await
        .unwrap_err();
        artifacts.release().await;
        assert!(matches!(err, SandboxError::Spawn { .. }));
        assert_eq!(err.label(), "System Error");
    }
}
