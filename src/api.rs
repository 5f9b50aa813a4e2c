// Backend API client
//
// Thin reqwest wrapper over the chat backend's three endpoints:
//   POST   /api/chat                    -> { session_id }
//   GET    /api/stream/{id}?message=..  -> SSE stream of frames
//   DELETE /api/sessions/{id}           -> best-effort cleanup
//
// The wire shapes are fixed by the backend; field names here must not drift.
// SSE decoding uses eventsource-stream over reqwest's byte stream.

use anyhow::{Context, Result};
use eventsource_stream::{Event as SseEvent, EventStreamError, Eventsource};
use futures::Stream;
use serde::{Deserialize, Serialize};

/// Request body for POST /api/chat.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    /// None asks the backend for a new session
    session_id: Option<&'a str>,
}

/// Response body from POST /api/chat.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
}

/// One SSE frame, or a transport-level decode error.
pub type FrameResult = std::result::Result<SseEvent, EventStreamError<reqwest::Error>>;

/// Client for the chat backend.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Register a message with the backend; returns the session id to stream
    /// against. A None session id requests a new session.
    pub async fn create_chat(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&ChatRequest {
                message,
                session_id,
            })
            .send()
            .await
            .context("Failed to send chat request")?
            .error_for_status()
            .context("Chat request rejected by backend")?;

        response
            .json::<ChatResponse>()
            .await
            .context("Failed to parse chat response")
    }

    /// Open the SSE response stream for a session.
    ///
    /// The returned stream yields raw SSE events; classification into
    /// semantic stream events is the FrameParser's job.
    pub async fn open_stream(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<impl Stream<Item = FrameResult>> {
        let url = format!("{}/api/stream/{}", self.base_url, session_id);
        let response = self
            .http
            .get(&url)
            .query(&[("message", message)])
            .send()
            .await
            .context("Failed to open response stream")?
            .error_for_status()
            .context("Stream request rejected by backend")?;

        Ok(response.bytes_stream().eventsource())
    }

    /// Delete a backend session. Best-effort: failures are logged by the
    /// caller and never block starting a new session.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let url = format!("{}/api/sessions/{}", self.base_url, session_id);
        self.http
            .delete(&url)
            .send()
            .await
            .context("Failed to delete session")?
            .error_for_status()
            .context("Session delete rejected by backend")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_normalized() {
        let client = ChatClient::new("http://localhost:8000/");
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_chat_request_wire_shape() {
        let body = ChatRequest {
            message: "hello",
            session_id: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        // session_id must serialize as an explicit null for a new session
        assert_eq!(
            json,
            serde_json::json!({ "message": "hello", "session_id": null })
        );

        let body = ChatRequest {
            message: "again",
            session_id: Some("abc-123"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["session_id"], "abc-123");
    }

    #[test]
    fn test_chat_response_parses() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{ "session_id": "xyz", "message": "created" }"#).unwrap();
        assert_eq!(parsed.session_id, "xyz");
    }
}
