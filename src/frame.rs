// Frame parser - normalizes backend stream payloads into semantic events
//
// The backend emits heterogeneous SSE data payloads: a completion sentinel,
// explicit error objects, incremental text deltas, and two "full text"
// fallback shapes that duplicate content already streamed incrementally.
// Everything downstream works with the small closed set of `StreamEvent`
// variants this module produces, so the rest of the client stays
// shape-agnostic.
//
// Accepted payloads (data portion of one SSE event):
// - literal "[DONE]"                                      -> Done
// - {"error": "..."}                                      -> Error
// - {"type":"stream_event","event":{"type":"content_block_delta",
//    "delta":{"type":"text_delta","text":"..."}}}         -> Delta
// - {"type":"assistant","message":{"content":[{"text":"..."}]}}
//                                                         -> Delta (fallback)
// - {"type":"result","result":"..."}                      -> Delta (fallback)
// - anything else, including unparseable JSON             -> Ignorable
//
// Fallback shapes carry the complete response text. They are honored only
// while no text has been applied yet for this turn; once any shape has
// supplied text, later fallbacks are suppressed so a terminal "result" frame
// can never re-append content that already streamed in.

use serde_json::Value;

/// Sentinel payload marking the end of a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Semantic classification of one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Stream completed normally
    Done,
    /// Backend reported an explicit error; terminates the stream
    Error(String),
    /// Incremental displayable text
    Delta(String),
    /// Structurally valid but not displayable, or unparseable; skipped
    Ignorable,
}

/// Per-stream frame classifier.
///
/// Holds the "text already applied" flag that implements the first-shape-wins
/// tie-break, so it must live exactly as long as one stream.
#[derive(Debug, Default)]
pub struct FrameParser {
    text_applied: bool,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one raw frame payload.
    ///
    /// Never fails: malformed payloads classify as `Ignorable` and must not
    /// disturb processing of subsequent frames.
    pub fn classify(&mut self, raw: &str) -> StreamEvent {
        let raw = raw.trim();

        if raw == DONE_SENTINEL {
            return StreamEvent::Done;
        }

        let payload: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!("Discarding unparseable frame: {}", err);
                return StreamEvent::Ignorable;
            }
        };

        if let Some(message) = payload.get("error").and_then(Value::as_str) {
            return StreamEvent::Error(message.to_string());
        }

        match payload.get("type").and_then(Value::as_str) {
            Some("stream_event") => self.classify_stream_event(&payload),
            Some("assistant") => {
                let text = payload
                    .get("message")
                    .and_then(|m| m.get("content"))
                    .and_then(|c| c.get(0))
                    .and_then(|block| block.get("text"))
                    .and_then(Value::as_str);
                self.fallback_text(text)
            }
            Some("result") => {
                let text = payload.get("result").and_then(Value::as_str);
                self.fallback_text(text)
            }
            other => {
                tracing::trace!("Ignoring frame of type {:?}", other);
                StreamEvent::Ignorable
            }
        }
    }

    /// Primary shape: nested content_block_delta / text_delta.
    fn classify_stream_event(&mut self, payload: &Value) -> StreamEvent {
        let Some(event) = payload.get("event") else {
            return StreamEvent::Ignorable;
        };
        if event.get("type").and_then(Value::as_str) != Some("content_block_delta") {
            return StreamEvent::Ignorable;
        }
        let Some(delta) = event.get("delta") else {
            return StreamEvent::Ignorable;
        };
        if delta.get("type").and_then(Value::as_str) != Some("text_delta") {
            return StreamEvent::Ignorable;
        }
        match delta.get("text").and_then(Value::as_str) {
            Some(text) => {
                if !text.is_empty() {
                    self.text_applied = true;
                }
                StreamEvent::Delta(text.to_string())
            }
            None => StreamEvent::Ignorable,
        }
    }

    /// Fallback full-text shapes apply only while no text has been applied.
    fn fallback_text(&mut self, text: Option<&str>) -> StreamEvent {
        match text {
            Some(text) if !text.is_empty() && !self.text_applied => {
                self.text_applied = true;
                StreamEvent::Delta(text.to_string())
            }
            Some(_) => StreamEvent::Ignorable,
            None => StreamEvent::Ignorable,
        }
    }
}
