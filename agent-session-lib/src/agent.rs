//! The autonomous session loop

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{ClaudeClient, ClientOptions, DEFAULT_SYSTEM_PROMPT};
use crate::error::SessionError;
use crate::progress::{self, ProgressCounts};
use crate::prompts::PromptSource;
use crate::runner::allowed_tools;
use crate::turn::{run_turn, TurnObserver, TurnStatus};

/// Pause after every turn before the next session starts
pub const AUTO_CONTINUE_DELAY: Duration = Duration::from_secs(3);
/// Short breather between sessions, after the cooldown
const NEXT_SESSION_DELAY: Duration = Duration::from_secs(1);

/// Loop configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub project_dir: PathBuf,
    pub model: String,
    /// `None` runs until interrupted
    pub max_iterations: Option<u32>,
    pub with_browser: bool,
    /// Overrides [`DEFAULT_SYSTEM_PROMPT`] when set
    pub system_prompt: Option<String>,
    pub claude_path: Option<PathBuf>,
}

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStop {
    /// Configured iteration ceiling reached
    IterationLimit,
    /// Cancellation observed
    Interrupted,
}

/// Final report from a finished loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub iterations: u32,
    pub stop: LoopStop,
    pub progress: ProgressCounts,
}

/// Loop-level notifications layered on the per-turn stream
pub trait LoopReporter: TurnObserver {
    /// Loop is starting; `first_run` reflects the artifact probe
    fn on_loop_start(&mut self, first_run: bool, progress: ProgressCounts);
    /// A session is about to run
    fn on_session_start(&mut self, iteration: u32, initializer: bool);
    /// A session finished cleanly; the loop will continue after the cooldown
    fn on_session_continue(&mut self, progress: ProgressCounts);
    /// A session failed; the loop will retry with a fresh session
    fn on_session_retry(&mut self, detail: &str);
    /// Another session follows after the inter-session delay
    fn on_next_session(&mut self);
}

/// Drive sessions until the iteration ceiling or cancellation.
///
/// One child process exists at a time. Cancelling mid-turn kills and reaps
/// that child before the function returns, so no orphan survives the loop.
pub async fn run_agent_loop<R>(
    config: &AgentConfig,
    prompts: &dyn PromptSource,
    reporter: &mut R,
    cancel: &CancellationToken,
) -> Result<LoopSummary, SessionError>
where
    R: LoopReporter,
{
    tokio::fs::create_dir_all(&config.project_dir).await?;

    let first_run = !progress::has_feature_list(&config.project_dir);
    reporter.on_loop_start(first_run, progress::count_passing(&config.project_dir));
    if first_run {
        prompts.seed_project(&config.project_dir)?;
        info!("Seeded project at {}", config.project_dir.display());
    }

    let tools = allowed_tools(config.with_browser);
    let system_prompt = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

    let summarize = |iterations: u32, stop: LoopStop| LoopSummary {
        iterations,
        stop,
        progress: progress::count_passing(&config.project_dir),
    };

    let mut is_first_turn = first_run;
    let mut iteration: u32 = 0;

    loop {
        if let Some(max) = config.max_iterations {
            if iteration >= max {
                info!("Reached max iterations ({})", max);
                return Ok(summarize(iteration, LoopStop::IterationLimit));
            }
        }
        if cancel.is_cancelled() {
            return Ok(summarize(iteration, LoopStop::Interrupted));
        }
        iteration += 1;

        let initializer = is_first_turn;
        reporter.on_session_start(iteration, initializer);

        // Fresh client per iteration: context carries over only through the
        // resume token and whatever the agent left on disk.
        let mut client = ClaudeClient::new(ClientOptions {
            project_dir: config.project_dir.clone(),
            model: config.model.clone(),
            system_prompt: Some(system_prompt.clone()),
            allowed_tools: tools.clone(),
            claude_path: config.claude_path.clone(),
        });

        let prompt = if initializer {
            prompts.initializer_prompt()
        } else {
            prompts.continuation_prompt()
        };
        client.query(prompt);

        let outcome = tokio::select! {
            outcome = run_turn(&mut client, reporter) => outcome,
            _ = cancel.cancelled() => {
                client.shutdown().await;
                info!("Interrupted during session {}", iteration);
                return Ok(summarize(iteration, LoopStop::Interrupted));
            }
        };
        is_first_turn = false;

        if let Err(err) = progress::append_session_log(&config.project_dir, iteration, initializer)
        {
            warn!("Could not update {}: {}", progress::PROGRESS_LOG_FILE, err);
        }

        match outcome.status {
            TurnStatus::Continue => {
                debug!(
                    "Session {} finished with {} bytes of response",
                    iteration,
                    outcome.response_text.len()
                );
                reporter.on_session_continue(progress::count_passing(&config.project_dir));
            }
            TurnStatus::Error => {
                let detail = outcome
                    .error_detail
                    .unwrap_or_else(|| "unknown error".to_string());
                warn!("Session {} failed: {}", iteration, detail);
                reporter.on_session_retry(&detail);
            }
        }

        // Cooldown applies to success and failure alike
        tokio::select! {
            _ = sleep(AUTO_CONTINUE_DELAY) => {}
            _ = cancel.cancelled() => {
                return Ok(summarize(iteration, LoopStop::Interrupted));
            }
        }

        let more_planned = config.max_iterations.map_or(true, |max| iteration < max);
        if more_planned {
            reporter.on_next_session();
            tokio::select! {
                _ = sleep(NEXT_SESSION_DELAY) => {}
                _ = cancel.cancelled() => {
                    return Ok(summarize(iteration, LoopStop::Interrupted));
                }
            }
        }
    }
}
