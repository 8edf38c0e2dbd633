//! Spawning the Claude CLI and streaming one run's output

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::events::{parse_stream_line, StreamEvent};

/// Tools every session may use without confirmation
pub const BUILTIN_TOOLS: &[&str] = &[
    "Read",
    "Write",
    "Edit",
    "Glob",
    "Grep",
    "Bash",
    "WebSearch",
    "WebFetch",
];

/// Browser-control tools, appended when browser automation is requested
pub const BROWSER_TOOLS: &[&str] = &[
    "mcp__puppeteer__puppeteer_navigate",
    "mcp__puppeteer__puppeteer_screenshot",
    "mcp__puppeteer__puppeteer_click",
    "mcp__puppeteer__puppeteer_fill",
    "mcp__puppeteer__puppeteer_select",
    "mcp__puppeteer__puppeteer_hover",
    "mcp__puppeteer__puppeteer_evaluate",
];

/// The default allow-list, with browser tools appended on request
pub fn allowed_tools(with_browser: bool) -> Vec<String> {
    let mut tools: Vec<String> = BUILTIN_TOOLS.iter().map(|t| t.to_string()).collect();
    if with_browser {
        tools.extend(BROWSER_TOOLS.iter().map(|t| t.to_string()));
    }
    tools
}

/// Locate the Claude binary, honoring an explicit override
pub fn resolve_claude(claude_path: Option<&Path>) -> Result<PathBuf, SessionError> {
    let candidate = claude_path.unwrap_or(Path::new("claude"));
    which::which(candidate).map_err(|_| SessionError::CliNotFound(candidate.display().to_string()))
}

/// Everything one CLI run needs
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub prompt: String,
    pub project_dir: PathBuf,
    pub model: String,
    pub allowed_tools: Vec<String>,
    pub system_prompt: Option<String>,
    pub resume: Option<String>,
    pub claude_path: Option<PathBuf>,
}

impl RunSpec {
    /// The argument vector, in the exact shape the CLI expects
    fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.prompt.clone(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
            "--allowed-tools".to_string(),
            self.allowed_tools.join(","),
            "--permission-mode".to_string(),
            "bypassPermissions".to_string(),
            "--model".to_string(),
            self.model.clone(),
        ];
        if let Some(system_prompt) = &self.system_prompt {
            args.push("--system-prompt".to_string());
            args.push(system_prompt.clone());
        }
        if let Some(session_id) = &self.resume {
            args.push("--resume".to_string());
            args.push(session_id.clone());
        }
        args
    }
}

enum StreamPhase {
    /// stdout still open
    Streaming,
    /// stdout closed or failed; exit status not yet collected
    Draining,
    /// exit handled, sequence over
    Finished,
}

/// Event sequence for one CLI run.
///
/// Yields decoded events line by line. Once stdout closes, waits for the
/// child and yields one final error event if the exit status was non-zero,
/// carrying whatever stderr said. The child is killed on drop, so an
/// abandoned stream cannot leak a process.
pub struct TurnStream {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stderr_task: Option<JoinHandle<String>>,
    phase: StreamPhase,
}

impl TurnStream {
    /// Spawn the CLI for one turn
    pub fn spawn(spec: &RunSpec) -> Result<Self, SessionError> {
        let claude_path = spec.claude_path.as_deref().unwrap_or(Path::new("claude"));

        debug!(
            "Spawning {} in {} (model {}, resume: {})",
            claude_path.display(),
            spec.project_dir.display(),
            spec.model,
            spec.resume.is_some(),
        );

        let mut cmd = Command::new(claude_path);
        cmd.args(spec.to_args())
            .current_dir(&spec.project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(SessionError::SpawnFailed)?;

        let stdout = child.stdout.take().ok_or_else(|| {
            SessionError::SpawnFailed(io::Error::new(io::ErrorKind::Other, "stdout not captured"))
        })?;

        // Drain stderr from the start so a chatty child cannot fill the pipe
        // and stall while we are busy with stdout.
        let stderr_task = child.stderr.take().map(|pipe| {
            tokio::spawn(async move {
                let mut reader = BufReader::new(pipe);
                let mut buf = Vec::with_capacity(4096);
                let _ = reader.read_to_end(&mut buf).await;
                String::from_utf8_lossy(&buf).trim().to_string()
            })
        });

        Ok(Self {
            child,
            lines: BufReader::new(stdout).lines(),
            stderr_task,
            phase: StreamPhase::Streaming,
        })
    }

    /// Next event in the sequence, or `None` once the run is fully reaped
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            match self.phase {
                StreamPhase::Finished => return None,
                StreamPhase::Draining => {
                    let last = self.finish().await;
                    self.phase = StreamPhase::Finished;
                    return last;
                }
                StreamPhase::Streaming => match self.lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(event) = parse_stream_line(&line) {
                            return Some(event);
                        }
                    }
                    Ok(None) => {
                        self.phase = StreamPhase::Draining;
                    }
                    Err(err) => {
                        self.phase = StreamPhase::Draining;
                        return Some(StreamEvent::Error {
                            message: format!("Stream read error: {}", err),
                            exit_code: None,
                        });
                    }
                },
            }
        }
    }

    /// Wait for the child and surface a non-zero exit as a final error event
    async fn finish(&mut self) -> Option<StreamEvent> {
        let status = match self.child.wait().await {
            Ok(status) => status,
            Err(err) => {
                warn!("Failed to reap Claude process: {}", err);
                return Some(StreamEvent::Error {
                    message: format!("Failed to reap process: {}", err),
                    exit_code: None,
                });
            }
        };

        let stderr = match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if status.success() {
            if !stderr.is_empty() {
                debug!("Claude stderr on clean exit: {}", stderr);
            }
            return None;
        }

        let exit_code = status.code();
        warn!("Claude exited with {:?}: {}", exit_code, stderr);
        let message = if !stderr.is_empty() {
            stderr
        } else {
            match exit_code {
                Some(code) => format!("Claude exited with code {}", code),
                None => "Claude terminated by signal".to_string(),
            }
        };
        Some(StreamEvent::Error { message, exit_code })
    }

    /// Kill the child and reap it. For cancelling a turn mid-stream.
    pub async fn shutdown(&mut self) {
        if let Err(err) = self.child.kill().await {
            debug!("Kill on shutdown: {}", err);
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        self.phase = StreamPhase::Finished;
    }
}
