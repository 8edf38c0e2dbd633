//! Error types for agent-session-lib

/// Errors that can occur while driving sessions
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to spawn Claude process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Claude CLI not found: {0} (install with: npm install -g @anthropic-ai/claude-code)")]
    CliNotFound(String),

    #[error("Project directory error: {0}")]
    Io(#[from] std::io::Error),
}
