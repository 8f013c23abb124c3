// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawns and reaps interactive agent CLI subprocesses (§4.3).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::Instrument;

use crate::env::spawn_env;
use crate::error::{RunnerError, RunnerResult};
use crate::strip::clean_stdout;

/// Wall-clock cap on a single agent invocation.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Hard cap on the bytes read from the child's stdout.
pub const STDOUT_CAP_BYTES: usize = 10 * 1024 * 1024;

/// A completed fire-and-wait invocation's cleaned output.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub stdout: String,
    pub pid: Option<u32>,
}

/// Spawns the agent CLI with a prompt file, an optional working directory,
/// and an optional resume-session-id, matching the contract the Executor
/// relies on for reconciliation.
pub struct ProcessRunner {
    agent_binary: PathBuf,
}

impl ProcessRunner {
    pub fn new(agent_binary: impl Into<PathBuf>) -> Self {
        Self { agent_binary: agent_binary.into() }
    }

    fn build_command(
        &self,
        prompt_file: &Path,
        cwd: Option<&Path>,
        resume_session_id: Option<&str>,
    ) -> Command {
        let mut cmd = Command::new(&self.agent_binary);
        cmd.arg("--prompt-file").arg(prompt_file);
        if let Some(session_id) = resume_session_id {
            cmd.arg("--resume").arg(session_id);
        }
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.env_clear();
        cmd.envs(spawn_env());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);
        cmd
    }

    fn build_std_command(
        &self,
        prompt_file: &Path,
        cwd: Option<&Path>,
        resume_session_id: Option<&str>,
    ) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.agent_binary);
        cmd.arg("--prompt-file").arg(prompt_file);
        if let Some(session_id) = resume_session_id {
            cmd.arg("--resume").arg(session_id);
        }
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.env_clear();
        cmd.envs(spawn_env());
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
        cmd
    }

    /// Fire-and-wait: spawns the agent, waits for exit or timeout, and
    /// returns its cleaned stdout. The prompt is written to a unique temp
    /// file that is unlinked on every exit path.
    pub async fn run(
        &self,
        prompt: &str,
        cwd: Option<&Path>,
        resume_session_id: Option<&str>,
        on_pid: impl FnOnce(u32) + Send,
    ) -> RunnerResult<RunOutput> {
        let span = tracing::info_span!(
            "runner.run",
            agent_binary = %self.agent_binary.display(),
            resuming = resume_session_id.is_some(),
        );
        self.run_inner(prompt, cwd, resume_session_id, on_pid)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        prompt: &str,
        cwd: Option<&Path>,
        resume_session_id: Option<&str>,
        on_pid: impl FnOnce(u32) + Send,
    ) -> RunnerResult<RunOutput> {
        let mut prompt_file = NamedTempFile::new()?;
        prompt_file.write_all(prompt.as_bytes())?;
        prompt_file.flush()?;

        let mut cmd = self.build_command(prompt_file.path(), cwd, resume_session_id);

        let start = std::time::Instant::now();
        let mut child = cmd.spawn()?;
        let pid = child.id();
        if let Some(pid) = pid {
            tracing::info!(pid, "spawned");
            on_pid(pid);
        }

        let result = tokio::time::timeout(RUN_TIMEOUT, drain_and_wait(&mut child)).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        // prompt_file drops (and unlinks) here regardless of outcome.
        match result {
            Ok(Ok((status, stdout_raw, stderr_raw))) => {
                let cleaned = clean_stdout(&stdout_raw, &self.agent_binary.to_string_lossy());
                if !status.success() && cleaned.trim().is_empty() {
                    let stderr_tail = tail(&stderr_raw, 2000);
                    tracing::warn!(elapsed_ms, %status, "agent failed with empty output");
                    return Err(RunnerError::CliError {
                        message: format!("agent exited with {status}"),
                        stderr_tail,
                    });
                }
                tracing::info!(elapsed_ms, %status, stdout_len = cleaned.len(), "completed");
                Ok(RunOutput { stdout: cleaned, pid })
            }
            Ok(Err(io_err)) => {
                tracing::error!(elapsed_ms, error = %io_err, "io error while draining child");
                Err(RunnerError::Spawn(io_err))
            }
            Err(_elapsed) => {
                let _ = child.start_kill();
                tracing::warn!(elapsed_ms, "timed out");
                Err(RunnerError::Timeout(RUN_TIMEOUT))
            }
        }
    }

    /// Fire-and-ignore: spawns the agent in interactive mode and does not
    /// wait for or consume its stdout; used when the agent is expected to
    /// make its own HTTP callbacks.
    pub fn spawn_interactive(
        &self,
        prompt: &str,
        cwd: Option<&Path>,
        resume_session_id: Option<&str>,
    ) -> RunnerResult<u32> {
        let mut prompt_file = NamedTempFile::new()?;
        prompt_file.write_all(prompt.as_bytes())?;
        prompt_file.flush()?;
        // Interactive mode isn't awaited here, so the usual drop-triggered
        // cleanup never runs; keep() hands ownership to the orchestration
        // script, which unlinks it once read.
        let (_, path) = prompt_file.keep().map_err(|e| RunnerError::Spawn(e.error))?;

        let mut cmd = self.build_std_command(&path, cwd, resume_session_id);
        let child = cmd.spawn().inspect_err(|_| {
            let _ = std::fs::remove_file(&path);
        })?;
        Ok(child.id())
    }
}

/// Reads stdout/stderr to completion (capped) and waits for exit.
async fn drain_and_wait(
    child: &mut Child,
) -> std::io::Result<(std::process::ExitStatus, Vec<u8>, Vec<u8>)> {
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    // Both pipes must drain concurrently: a sequential read can deadlock if
    // the child fills one pipe's OS buffer while waiting on the other.
    let (stdout_res, stderr_res) = tokio::join!(
        async {
            if let Some(s) = stdout.as_mut() {
                read_capped(s, &mut stdout_buf, STDOUT_CAP_BYTES).await
            } else {
                Ok(())
            }
        },
        async {
            if let Some(s) = stderr.as_mut() {
                read_capped(s, &mut stderr_buf, STDOUT_CAP_BYTES).await
            } else {
                Ok(())
            }
        },
    );
    stdout_res?;
    stderr_res?;

    let status = child.wait().await?;
    Ok((status, stdout_buf, stderr_buf))
}

async fn read_capped<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    cap: usize,
) -> std::io::Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        if buf.len() >= cap {
            break;
        }
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let remaining = cap - buf.len();
        buf.extend_from_slice(&chunk[..n.min(remaining)]);
    }
    Ok(())
}

fn tail(raw: &[u8], max_chars: usize) -> String {
    let text = String::from_utf8_lossy(raw);
    let len = text.chars().count();
    if len <= max_chars {
        text.into_owned()
    } else {
        text.chars().skip(len - max_chars).collect()
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
