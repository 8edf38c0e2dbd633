//! Typed model of the Claude CLI stream-json output

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One record from the CLI's line-delimited output stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Lifecycle notice; `subtype == "init"` carries the session id
    System {
        #[serde(default)]
        subtype: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },

    /// Assistant output: ordered text and tool-use blocks
    Assistant { message: MessageBody },

    /// Tool results echoed back on the user channel
    User { message: MessageBody },

    /// Final response text for the turn
    Result {
        #[serde(default)]
        result: String,
    },

    /// Terminal failure, reported by the CLI or synthesized by the runner
    Error {
        #[serde(rename = "error")]
        message: String,
        #[serde(
            default,
            rename = "returncode",
            skip_serializing_if = "Option::is_none"
        )]
        exit_code: Option<i32>,
    },
}

/// Envelope carrying the ordered content blocks of a message
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// One block inside an assistant/user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Streamed response prose
    Text { text: String },

    /// Tool invocation with its JSON input
    ToolUse {
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    /// Outcome of an earlier tool invocation
    ToolResult {
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        content: serde_json::Value,
    },

    /// Block kinds this harness does not interpret (thinking, images, ...).
    /// Kept so one exotic block does not sink the whole record.
    #[serde(other)]
    Other,
}

/// Render a tool-result `content` payload as display text.
///
/// The CLI emits either a plain string or a list of content blocks here;
/// non-string payloads are shown in their JSON form.
pub fn render_result_content(content: &serde_json::Value) -> String {
    match content {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Decode one line of CLI output.
///
/// Blank lines and lines that do not decode as a known record are skipped;
/// the stream carries diagnostics and partial writes we have no use for.
pub fn parse_stream_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(err) => {
            debug!("Skipping undecodable stream line: {}", err);
            None
        }
    }
}
