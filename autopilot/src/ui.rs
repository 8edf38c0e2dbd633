//! Terminal UI for the autopilot CLI.

use std::io::Write;
use std::path::Path;

use agent_session_lib::{
    LoopReporter, LoopSummary, ProgressCounts, ToolResultKind, TurnObserver, AUTO_CONTINUE_DELAY,
};
use colored::Colorize;

const WIDE_RULE: &str =
    "======================================================================";
const THIN_RULE: &str =
    "----------------------------------------------------------------------";

/// Print the startup banner with the run configuration
pub fn print_startup_banner(project_dir: &Path, model: &str, max_iterations: Option<u32>) {
    println!();
    println!("{}", WIDE_RULE.bright_blue());
    println!("{}", "  AUTONOMOUS CODING AGENT".bright_blue());
    println!("{}", WIDE_RULE.bright_blue());
    println!();
    println!(
        "{} {}",
        "Project directory:".dimmed(),
        project_dir.display().to_string().bright_white()
    );
    println!("{} {}", "Model:".dimmed(), model.bright_white());
    match max_iterations {
        Some(max) => println!("{} {}", "Max iterations:".dimmed(), max),
        None => println!(
            "{} {}",
            "Max iterations:".dimmed(),
            "Unlimited (will run until interrupted)"
        ),
    }
    println!();
    println!("NOTE: Using the Claude CLI - no API key required.");
    println!("      Make sure you are logged in: claude /connect");
    println!();
}

/// Print install guidance when the CLI is missing
pub fn print_cli_missing() {
    println!("{}", "Error: Claude CLI not found".bright_red());
    println!();
    println!("Install it with:");
    println!("  {}", "npm install -g @anthropic-ai/claude-code".bright_cyan());
    println!();
    println!("Then login with:");
    println!("  {}", "claude /connect".bright_cyan());
}

/// Print the final summary with instructions for the generated app
pub fn print_final_summary(project_dir: &Path, summary: &LoopSummary) {
    println!();
    println!("{}", WIDE_RULE.bright_green());
    println!("{}", "  SESSION COMPLETE".bright_green());
    println!("{}", WIDE_RULE.bright_green());
    println!();
    println!(
        "{} {}",
        "Project directory:".dimmed(),
        project_dir.display()
    );
    println!("{} {}", "Sessions run:".dimmed(), summary.iterations);
    print_progress_line(summary.progress);

    println!();
    println!("{}", THIN_RULE);
    println!("  TO RUN THE GENERATED APPLICATION:");
    println!("{}", THIN_RULE);
    println!();
    println!("  cd {}", project_dir.display());
    println!("  ./init.sh           # Run the setup script");
    println!("  # Or manually:");
    println!("  npm install && npm run dev");
    println!();
    println!("  Then open http://localhost:3000 (or check init.sh for the URL)");
    println!("{}", THIN_RULE);
    println!();
    println!("Done!");
}

/// Print the interrupt notice with the resume hint
pub fn print_interrupted() {
    println!();
    println!();
    println!("{}", "Interrupted by user".bright_yellow());
    println!("To resume, run the same command again");
}

fn print_progress_line(progress: ProgressCounts) {
    println!();
    println!("{} {}", "Progress:".dimmed(), progress.describe());
}

/// Renders loop and turn notifications on the terminal.
///
/// Assistant prose streams unbuffered; everything else gets its own line so
/// an operator can follow a session in real time.
#[derive(Debug, Default)]
pub struct Console;

impl TurnObserver for Console {
    fn on_text(&mut self, text: &str) {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }

    fn on_tool_use(&mut self, name: &str, input_preview: &str) {
        println!();
        println!("{}", format!("[Tool: {}]", name).bright_yellow());
        println!("   Input: {}", input_preview.dimmed());
    }

    fn on_tool_result(&mut self, kind: &ToolResultKind) {
        match kind {
            ToolResultKind::Blocked(content) => {
                println!("   {} {}", "[BLOCKED]".bright_red(), content);
            }
            ToolResultKind::Errored(excerpt) => {
                println!("   {} {}", "[Error]".bright_red(), excerpt);
            }
            ToolResultKind::Done => {
                println!("   {}", "[Done]".bright_green());
            }
        }
    }

    fn on_result(&mut self, text: &str) {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }

    fn on_error(&mut self, message: &str) {
        println!();
        println!("{} {}", "[Error]".bright_red(), message);
    }

    fn on_session_init(&mut self, id_preview: &str) {
        println!("{}", format!("[Session: {}...]", id_preview).dimmed());
    }
}

impl LoopReporter for Console {
    fn on_loop_start(&mut self, first_run: bool, progress: ProgressCounts) {
        if first_run {
            println!("Fresh start - will use initializer agent");
            println!();
            println!("{}", WIDE_RULE.bright_yellow());
            println!("  NOTE: The first session can take a long time.");
            println!("  The agent is generating a full test list before coding starts.");
            println!("  It may look stuck - watch for [Tool: ...] lines.");
            println!("{}", WIDE_RULE.bright_yellow());
            println!();
        } else {
            println!("Continuing existing project");
            print_progress_line(progress);
        }
    }

    fn on_session_start(&mut self, iteration: u32, initializer: bool) {
        let session_type = if initializer {
            "INITIALIZER"
        } else {
            "CODING AGENT"
        };
        println!();
        println!("{}", WIDE_RULE.bright_cyan());
        println!(
            "{}",
            format!("  SESSION {}: {}", iteration, session_type).bright_cyan()
        );
        println!("{}", WIDE_RULE.bright_cyan());
        println!();
        println!("Sending prompt to Claude CLI...");
        println!();
    }

    fn on_session_continue(&mut self, progress: ProgressCounts) {
        println!();
        println!("{}", THIN_RULE);
        println!();
        println!(
            "Agent will auto-continue in {}s...",
            AUTO_CONTINUE_DELAY.as_secs()
        );
        print_progress_line(progress);
    }

    fn on_session_retry(&mut self, _detail: &str) {
        // The failure itself was already streamed via on_error
        println!();
        println!("{}", "Session encountered an error".bright_red());
        println!("Will retry with a fresh session...");
    }

    fn on_next_session(&mut self) {
        println!();
        println!("Preparing next session...");
        println!();
    }
}

/// Print the iteration-ceiling notice
pub fn print_iteration_limit(max: u32) {
    println!();
    println!("Reached max iterations ({})", max);
    println!("To continue, run the same command again without --max-iterations");
}
