//! Agent Session Library
//!
//! A library for driving unattended Claude Code sessions: spawn the CLI
//! once per turn, stream its line-delimited JSON output as typed events,
//! carry the resumable session id across turns, and loop with retry and an
//! optional iteration ceiling.
//!
//! # Overview
//!
//! The library provides:
//! - `StreamEvent` / `parse_stream_line` - typed wire model of the CLI's
//!   stream-json output
//! - `TurnStream` - one CLI run as an async event sequence, exit status
//!   included
//! - `ClaudeClient` - query/receive protocol with session-id capture and
//!   `--resume` continuity
//! - `run_turn` / `reduce_events` - reduce a turn to Continue or Error,
//!   streaming notifications to a `TurnObserver`
//! - `run_agent_loop` - the autonomous session loop with cooldowns, retry
//!   and an iteration ceiling
//!
//! # Example
//!
//! ```ignore
//! use agent_session_lib::{run_agent_loop, AgentConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig {
//!         project_dir: "generations/my_app".into(),
//!         model: "sonnet".to_string(),
//!         max_iterations: Some(10),
//!         with_browser: false,
//!         system_prompt: None,
//!         claude_path: None,
//!     };
//!
//!     let cancel = CancellationToken::new();
//!     let summary = run_agent_loop(&config, &my_prompts, &mut my_reporter, &cancel).await?;
//!     println!("ran {} sessions", summary.iterations);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod client;
pub mod error;
pub mod events;
pub mod progress;
pub mod prompts;
pub mod runner;
pub mod turn;

pub use agent::{
    run_agent_loop, AgentConfig, LoopReporter, LoopStop, LoopSummary, AUTO_CONTINUE_DELAY,
};
pub use client::{ClaudeClient, ClientOptions, DEFAULT_SYSTEM_PROMPT};
pub use error::SessionError;
pub use events::{parse_stream_line, ContentBlock, MessageBody, StreamEvent};
pub use progress::{
    count_passing, has_feature_list, ProgressCounts, FEATURE_LIST_FILE, PROGRESS_LOG_FILE,
};
pub use prompts::PromptSource;
pub use runner::{allowed_tools, resolve_claude, RunSpec, TurnStream, BROWSER_TOOLS, BUILTIN_TOOLS};
pub use turn::{
    reduce_events, run_turn, NullObserver, ToolResultKind, TurnObserver, TurnOutcome, TurnStatus,
};
