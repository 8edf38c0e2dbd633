//! Session-scoped client for the Claude CLI

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::SessionError;
use crate::events::StreamEvent;
use crate::runner::{RunSpec, TurnStream};

/// System prompt applied when the caller does not supply one
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an expert full-stack developer building a production-quality web application.";

/// Settings shared by every run a client performs
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub project_dir: PathBuf,
    pub model: String,
    pub system_prompt: Option<String>,
    pub allowed_tools: Vec<String>,
    pub claude_path: Option<PathBuf>,
}

/// One conversation with the CLI.
///
/// Each `receive` spawns a fresh process; continuity comes from the session
/// id captured off the first `system/init` event and passed back with
/// `--resume` on later runs. No child process outlives its turn.
pub struct ClaudeClient {
    options: ClientOptions,
    session_id: Option<String>,
    pending_prompt: Option<String>,
    turn: Option<TurnStream>,
}

impl ClaudeClient {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            session_id: None,
            pending_prompt: None,
            turn: None,
        }
    }

    /// Queue a prompt for the next `receive`
    pub fn query(&mut self, prompt: impl Into<String>) {
        self.pending_prompt = Some(prompt.into());
    }

    /// Spawn the CLI for the queued prompt.
    ///
    /// With nothing queued this is a no-op and the event sequence stays
    /// empty.
    pub fn receive(&mut self) -> Result<(), SessionError> {
        let Some(prompt) = self.pending_prompt.take() else {
            debug!("receive() with no pending prompt");
            self.turn = None;
            return Ok(());
        };
        let spec = RunSpec {
            prompt,
            project_dir: self.options.project_dir.clone(),
            model: self.options.model.clone(),
            allowed_tools: self.options.allowed_tools.clone(),
            system_prompt: self.options.system_prompt.clone(),
            resume: self.session_id.clone(),
            claude_path: self.options.claude_path.clone(),
        };
        self.turn = Some(TurnStream::spawn(&spec)?);
        Ok(())
    }

    /// Next event of the active turn, or `None` when the turn is over.
    ///
    /// Watches for the first `system/init` to capture the session id; later
    /// init events never overwrite it.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        let turn = self.turn.as_mut()?;
        match turn.next_event().await {
            Some(event) => {
                self.observe(&event);
                Some(event)
            }
            None => {
                self.turn = None;
                None
            }
        }
    }

    fn observe(&mut self, event: &StreamEvent) {
        if let StreamEvent::System {
            subtype,
            session_id: Some(id),
        } = event
        {
            if subtype == "init" && self.session_id.is_none() {
                info!("Captured session id {}", id);
                self.session_id = Some(id.clone());
            }
        }
    }

    /// Session id captured from this conversation, if any
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Kill and reap the active turn's process, if one is running
    pub async fn shutdown(&mut self) {
        if let Some(turn) = self.turn.as_mut() {
            turn.shutdown().await;
        }
        self.turn = None;
    }
}
