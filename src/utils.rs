// Subprocess helpers shared by resolver implementations

use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

/// Run a command to completion with a hard timeout, capturing stdout and
/// stderr. The child is killed on timeout.
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<std::process::Output, String> {
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to start {program}: {e}"))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| format!("failed to capture stdout from {program}"))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| format!("failed to capture stderr from {program}"))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("failed to read stdout: {e}"))?;
        Ok::<Vec<u8>, String>(buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("failed to read stderr: {e}"))?;
        Ok::<Vec<u8>, String>(buf)
    });

    let waited = timeout(Duration::from_secs(timeout_secs), child.wait()).await;
    match waited {
        Ok(status_res) => {
            let status = status_res.map_err(|e| format!("failed to wait for {program}: {e}"))?;
            let stdout = stdout_task
                .await
                .map_err(|e| format!("stdout task failed: {e}"))??;
            let stderr = stderr_task
                .await
                .map_err(|e| format!("stderr task failed: {e}"))??;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(format!("timed out after {timeout_secs}s"))
        }
    }
}
