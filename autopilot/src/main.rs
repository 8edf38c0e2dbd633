mod prompts;
mod ui;

use std::path::PathBuf;

use agent_session_lib::{resolve_claude, run_agent_loop, AgentConfig, LoopStop};
use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use prompts::EmbeddedPrompts;
use ui::Console;

const DEFAULT_PROJECT_DIR: &str = "autopilot_project";

#[derive(Parser, Debug)]
#[command(name = "autopilot")]
#[command(about = "Unattended coding agent driving the Claude CLI - no API key required")]
struct Args {
    /// Directory for the generated project (relative paths land under generations/)
    #[arg(long, default_value = DEFAULT_PROJECT_DIR)]
    project_dir: PathBuf,

    /// Maximum number of agent sessions (default: unlimited)
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Claude model to use: sonnet, opus, haiku
    #[arg(long, default_value = "sonnet")]
    model: String,

    /// Also allow the browser-control (puppeteer) tools
    #[arg(long)]
    with_browser: bool,

    /// Explicit path to the claude binary
    #[arg(long, env = "CLAUDE_PATH")]
    claude_path: Option<PathBuf>,
}

/// Place relative project dirs under generations/ so runs stay collected
fn resolve_project_dir(project_dir: PathBuf) -> PathBuf {
    if project_dir.is_absolute() || project_dir.starts_with("generations") {
        project_dir
    } else {
        PathBuf::from("generations").join(project_dir)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    let claude = match resolve_claude(args.claude_path.as_deref()) {
        Ok(path) => path,
        Err(err) => {
            ui::print_cli_missing();
            return Err(err).context("Claude CLI check failed");
        }
    };
    debug!("Using claude at {}", claude.display());

    let project_dir = resolve_project_dir(args.project_dir);
    ui::print_startup_banner(&project_dir, &args.model, args.max_iterations);

    let config = AgentConfig {
        project_dir: project_dir.clone(),
        model: args.model,
        max_iterations: args.max_iterations,
        with_browser: args.with_browser,
        system_prompt: None,
        claude_path: Some(claude),
    };

    // Ctrl+C flips the token; the loop kills and reaps any running child
    // before unwinding.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for shutdown signal: {}", err);
            return;
        }
        signal_token.cancel();
    });

    let mut console = Console;
    let summary = run_agent_loop(&config, &EmbeddedPrompts, &mut console, &cancel)
        .await
        .context("Agent loop failed")?;

    match summary.stop {
        LoopStop::Interrupted => {
            ui::print_interrupted();
        }
        LoopStop::IterationLimit => {
            if let Some(max) = config.max_iterations {
                ui::print_iteration_limit(max);
            }
            ui::print_final_summary(&project_dir, &summary);
        }
    }

    Ok(())
}
