//! Reducing one turn's event stream to an outcome

use tracing::debug;

use crate::client::ClaudeClient;
use crate::events::{render_result_content, ContentBlock, StreamEvent};

/// Longest tool-input preview forwarded to observers
const TOOL_INPUT_PREVIEW_LIMIT: usize = 200;
/// Longest tool-error excerpt forwarded to observers
const TOOL_ERROR_LIMIT: usize = 500;
/// Bytes of the session id shown in previews
const SESSION_ID_PREVIEW_LIMIT: usize = 8;

/// How a tool invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResultKind {
    /// A hook or policy refused the action; carries the rendered content
    Blocked(String),
    /// The tool failed; carries a truncated excerpt
    Errored(String),
    /// The tool completed
    Done,
}

/// Terminal classification of one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Continue,
    Error,
}

/// Result of reducing a turn's event stream
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub status: TurnStatus,
    pub response_text: String,
    pub error_detail: Option<String>,
}

impl TurnOutcome {
    fn error(response_text: String, detail: impl Into<String>) -> Self {
        Self {
            status: TurnStatus::Error,
            response_text,
            error_detail: Some(detail.into()),
        }
    }
}

/// Streaming notifications emitted while a turn runs.
///
/// Implementations render these for an operator. The reducer calls each
/// method the moment the event arrives; nothing is buffered to the end of
/// the turn. Observers travel inside the loop future, so they must be
/// `Send`.
pub trait TurnObserver: Send {
    /// A chunk of assistant prose, in stream order
    fn on_text(&mut self, text: &str);
    /// A tool invocation, with its input clipped for display
    fn on_tool_use(&mut self, name: &str, input_preview: &str);
    /// Classified completion of a tool invocation
    fn on_tool_result(&mut self, kind: &ToolResultKind);
    /// Final result text that was not already streamed
    fn on_result(&mut self, text: &str);
    /// Turn-ending failure, reported or synthesized
    fn on_error(&mut self, message: &str);
    /// Session id preview from the init event
    fn on_session_init(&mut self, id_preview: &str);
}

/// Observer that drops every notification
#[derive(Debug, Default)]
pub struct NullObserver;

impl TurnObserver for NullObserver {
    fn on_text(&mut self, _text: &str) {}
    fn on_tool_use(&mut self, _name: &str, _input_preview: &str) {}
    fn on_tool_result(&mut self, _kind: &ToolResultKind) {}
    fn on_result(&mut self, _text: &str) {}
    fn on_error(&mut self, _message: &str) {}
    fn on_session_init(&mut self, _id_preview: &str) {}
}

/// Boundary-safe prefix of at most `limit` bytes
fn clip(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut cut = limit;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

/// Clip with an ellipsis marker when something was cut
fn preview(text: &str, limit: usize) -> String {
    let clipped = clip(text, limit);
    if clipped.len() < text.len() {
        format!("{}...", clipped)
    } else {
        clipped.to_string()
    }
}

/// Classify a tool result. "blocked" anywhere in the content wins over the
/// error flag, since hooks report refusals as ordinary errors.
fn classify_tool_result(is_error: bool, content: &serde_json::Value) -> ToolResultKind {
    let rendered = render_result_content(content);
    if rendered.to_lowercase().contains("blocked") {
        ToolResultKind::Blocked(rendered)
    } else if is_error {
        ToolResultKind::Errored(clip(&rendered, TOOL_ERROR_LIMIT).to_string())
    } else {
        ToolResultKind::Done
    }
}

/// Incremental reduction of one turn. Fed events in stream order.
struct TurnReducer {
    response_text: String,
}

impl TurnReducer {
    fn new() -> Self {
        Self {
            response_text: String::new(),
        }
    }

    /// Apply one event. Returns the outcome when the turn ends early.
    fn handle(
        &mut self,
        event: &StreamEvent,
        observer: &mut dyn TurnObserver,
    ) -> Option<TurnOutcome> {
        match event {
            StreamEvent::System {
                subtype,
                session_id,
            } => {
                if subtype == "init" {
                    if let Some(id) = session_id {
                        observer.on_session_init(clip(id, SESSION_ID_PREVIEW_LIMIT));
                    }
                }
                None
            }
            StreamEvent::Assistant { message } => {
                for block in &message.content {
                    match block {
                        ContentBlock::Text { text } => {
                            self.response_text.push_str(text);
                            observer.on_text(text);
                        }
                        ContentBlock::ToolUse { name, input } => {
                            let rendered = input.to_string();
                            observer
                                .on_tool_use(name, &preview(&rendered, TOOL_INPUT_PREVIEW_LIMIT));
                        }
                        _ => {}
                    }
                }
                None
            }
            StreamEvent::User { message } => {
                for block in &message.content {
                    if let ContentBlock::ToolResult { is_error, content } = block {
                        let kind = classify_tool_result(*is_error, content);
                        observer.on_tool_result(&kind);
                    }
                }
                None
            }
            StreamEvent::Result { result } => {
                if !result.is_empty() && !self.response_text.contains(result.as_str()) {
                    self.response_text.push_str(result);
                    observer.on_result(result);
                }
                None
            }
            StreamEvent::Error { message, .. } => {
                observer.on_error(message);
                Some(TurnOutcome::error(
                    std::mem::take(&mut self.response_text),
                    message.clone(),
                ))
            }
        }
    }

    fn finish(self) -> TurnOutcome {
        TurnOutcome {
            status: TurnStatus::Continue,
            response_text: self.response_text,
            error_detail: None,
        }
    }
}

/// Reduce an already-materialized event sequence.
///
/// Events after the first `error` are never inspected.
pub fn reduce_events<'a, I>(events: I, observer: &mut dyn TurnObserver) -> TurnOutcome
where
    I: IntoIterator<Item = &'a StreamEvent>,
{
    let mut reducer = TurnReducer::new();
    for event in events {
        if let Some(outcome) = reducer.handle(event, observer) {
            return outcome;
        }
    }
    reducer.finish()
}

/// Run one full turn: spawn the queued prompt, reduce every event.
///
/// Spawn failures become an `Error` outcome rather than an `Err`, so the
/// loop's retry policy treats them like any other failed turn. On an early
/// error the remaining child process is killed and reaped before returning.
pub async fn run_turn(client: &mut ClaudeClient, observer: &mut dyn TurnObserver) -> TurnOutcome {
    if let Err(err) = client.receive() {
        let detail = err.to_string();
        observer.on_error(&detail);
        return TurnOutcome::error(String::new(), detail);
    }

    let mut reducer = TurnReducer::new();
    while let Some(event) = client.next_event().await {
        if let Some(outcome) = reducer.handle(&event, observer) {
            client.shutdown().await;
            return outcome;
        }
    }
    debug!("Turn stream ended");
    reducer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MessageBody;

    #[derive(Debug, Default)]
    struct Recording {
        texts: Vec<String>,
        tools: Vec<(String, String)>,
        tool_results: Vec<ToolResultKind>,
        results: Vec<String>,
        errors: Vec<String>,
        inits: Vec<String>,
    }

    impl TurnObserver for Recording {
        fn on_text(&mut self, text: &str) {
            self.texts.push(text.to_string());
        }
        fn on_tool_use(&mut self, name: &str, input_preview: &str) {
            self.tools.push((name.to_string(), input_preview.to_string()));
        }
        fn on_tool_result(&mut self, kind: &ToolResultKind) {
            self.tool_results.push(kind.clone());
        }
        fn on_result(&mut self, text: &str) {
            self.results.push(text.to_string());
        }
        fn on_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
        fn on_session_init(&mut self, id_preview: &str) {
            self.inits.push(id_preview.to_string());
        }
    }

    fn text_event(text: &str) -> StreamEvent {
        StreamEvent::Assistant {
            message: MessageBody {
                content: vec![ContentBlock::Text {
                    text: text.to_string(),
                }],
            },
        }
    }

    fn result_event(text: &str) -> StreamEvent {
        StreamEvent::Result {
            result: text.to_string(),
        }
    }

    fn tool_result_event(is_error: bool, content: serde_json::Value) -> StreamEvent {
        StreamEvent::User {
            message: MessageBody {
                content: vec![ContentBlock::ToolResult { is_error, content }],
            },
        }
    }

    #[test]
    fn test_hello_turn_deduplicates_result() {
        let events = vec![
            StreamEvent::System {
                subtype: "init".to_string(),
                session_id: Some("abc123-long-id".to_string()),
            },
            text_event("Hello"),
            result_event("Hello"),
        ];
        let mut obs = Recording::default();
        let outcome = reduce_events(&events, &mut obs);

        assert_eq!(outcome.status, TurnStatus::Continue);
        assert_eq!(outcome.response_text, "Hello");
        assert_eq!(outcome.error_detail, None);
        assert_eq!(obs.texts, ["Hello"]);
        assert!(obs.results.is_empty());
        assert_eq!(obs.inits, ["abc123-l"]);
    }

    #[test]
    fn test_tool_use_and_done_result() {
        let long_command = "x".repeat(150);
        let events = vec![
            StreamEvent::Assistant {
                message: MessageBody {
                    content: vec![ContentBlock::ToolUse {
                        name: "Bash".to_string(),
                        input: serde_json::json!({ "command": long_command }),
                    }],
                },
            },
            tool_result_event(false, serde_json::json!("ok")),
        ];
        let mut obs = Recording::default();
        let outcome = reduce_events(&events, &mut obs);

        assert_eq!(outcome.status, TurnStatus::Continue);
        assert_eq!(outcome.response_text, "");
        assert_eq!(obs.tools.len(), 1);
        assert_eq!(obs.tools[0].0, "Bash");
        // 164 bytes of rendered JSON fit the preview untruncated
        assert!(!obs.tools[0].1.ends_with("..."));
        assert_eq!(obs.tool_results, [ToolResultKind::Done]);
    }

    #[test]
    fn test_tool_input_preview_truncated() {
        let huge = "y".repeat(400);
        let events = vec![StreamEvent::Assistant {
            message: MessageBody {
                content: vec![ContentBlock::ToolUse {
                    name: "Write".to_string(),
                    input: serde_json::json!({ "content": huge }),
                }],
            },
        }];
        let mut obs = Recording::default();
        reduce_events(&events, &mut obs);

        let preview = &obs.tools[0].1;
        assert!(preview.ends_with("..."));
        assert_eq!(preview.len(), TOOL_INPUT_PREVIEW_LIMIT + 3);
    }

    #[test]
    fn test_error_event_short_circuits() {
        let events = vec![
            text_event("working"),
            StreamEvent::Error {
                message: "boom".to_string(),
                exit_code: Some(2),
            },
            text_event("never seen"),
        ];
        let mut obs = Recording::default();
        let outcome = reduce_events(&events, &mut obs);

        assert_eq!(outcome.status, TurnStatus::Error);
        assert_eq!(outcome.error_detail.as_deref(), Some("boom"));
        assert_eq!(outcome.response_text, "working");
        assert_eq!(obs.texts, ["working"]);
        assert_eq!(obs.errors, ["boom"]);
    }

    #[test]
    fn test_blocked_beats_is_error() {
        let events = vec![tool_result_event(
            true,
            serde_json::json!("Command BLOCKED by security hook"),
        )];
        let mut obs = Recording::default();
        reduce_events(&events, &mut obs);

        assert_eq!(
            obs.tool_results,
            [ToolResultKind::Blocked(
                "Command BLOCKED by security hook".to_string()
            )]
        );
    }

    #[test]
    fn test_tool_error_excerpt_clipped() {
        let long_error = "e".repeat(900);
        let events = vec![tool_result_event(true, serde_json::json!(long_error))];
        let mut obs = Recording::default();
        reduce_events(&events, &mut obs);

        let ToolResultKind::Errored(excerpt) = &obs.tool_results[0] else {
            panic!("expected Errored");
        };
        assert_eq!(excerpt.len(), TOOL_ERROR_LIMIT);
    }

    #[test]
    fn test_result_appended_once() {
        let events = vec![result_event("World"), result_event("World")];
        let mut obs = Recording::default();
        let outcome = reduce_events(&events, &mut obs);

        assert_eq!(outcome.response_text, "World");
        assert_eq!(obs.results, ["World"]);
    }

    #[test]
    fn test_empty_result_ignored() {
        let events = vec![result_event("")];
        let mut obs = Recording::default();
        let outcome = reduce_events(&events, &mut obs);

        assert_eq!(outcome.response_text, "");
        assert!(obs.results.is_empty());
    }

    #[test]
    fn test_novel_result_appended_and_notified() {
        let events = vec![text_event("progress so far"), result_event("Summary: done")];
        let mut obs = Recording::default();
        let outcome = reduce_events(&events, &mut obs);

        assert_eq!(outcome.response_text, "progress so farSummary: done");
        assert_eq!(obs.results, ["Summary: done"]);
    }

    #[test]
    fn test_text_blocks_accumulate_in_order() {
        let events = vec![text_event("foo"), text_event("bar")];
        let mut obs = Recording::default();
        let outcome = reduce_events(&events, &mut obs);

        assert_eq!(outcome.response_text, "foobar");
        assert_eq!(obs.texts, ["foo", "bar"]);
    }

    #[test]
    fn test_stream_without_result_still_continues() {
        let events = vec![
            text_event("just chatting"),
            tool_result_event(false, serde_json::json!("fine")),
        ];
        let mut obs = Recording::default();
        let outcome = reduce_events(&events, &mut obs);

        assert_eq!(outcome.status, TurnStatus::Continue);
        assert_eq!(outcome.response_text, "just chatting");
    }

    #[test]
    fn test_unknown_blocks_are_ignored() {
        let events = vec![StreamEvent::Assistant {
            message: MessageBody {
                content: vec![ContentBlock::Other],
            },
        }];
        let mut obs = Recording::default();
        let outcome = reduce_events(&events, &mut obs);

        assert_eq!(outcome.status, TurnStatus::Continue);
        assert!(obs.texts.is_empty());
    }

    #[test]
    fn test_preview_respects_utf8_boundaries() {
        let mut text = "a".repeat(TOOL_INPUT_PREVIEW_LIMIT - 1);
        text.push('€');
        let clipped = preview(&text, TOOL_INPUT_PREVIEW_LIMIT);
        assert!(clipped.ends_with("..."));
        assert_eq!(clipped.len(), TOOL_INPUT_PREVIEW_LIMIT - 1 + 3);
    }

    #[test]
    fn test_blocked_is_case_insensitive() {
        for content in ["blocked", "BLOCKED", "Request Blocked by policy"] {
            let kind = classify_tool_result(false, &serde_json::json!(content));
            assert!(matches!(kind, ToolResultKind::Blocked(_)), "{}", content);
        }
    }
}
