// Stream session orchestration
//
// One StreamSession covers one request/stream pair: register the message
// (POST), then subscribe to the SSE response and forward classified events to
// the app loop over an mpsc channel. All conversation state mutation happens
// on the app loop; the session task only performs I/O and classification.
//
// Cancellation is advisory. Every update carries the generation number of the
// stream that produced it, and the app ignores updates whose generation no
// longer matches the active stream. Aborting the task stops the I/O, but the
// generation check is what actually protects state: a frame that was already
// in the channel when the user hit "new chat" must be a no-op.

use crate::api::ChatClient;
use crate::frame::{FrameParser, StreamEvent};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Updates a stream session sends to the app loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    /// The backend assigned (or confirmed) a session id
    SessionOpened(String),
    /// Incremental response text
    Delta(String),
    /// Stream completed normally ([DONE])
    Completed,
    /// The backend reported an error mid-stream
    StreamError(String),
    /// The request or the stream connection itself failed
    TransportError(String),
}

/// A stream update tagged with the generation that produced it.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub generation: u64,
    pub update: StreamUpdate,
}

/// Handle to a running stream task.
#[derive(Debug)]
pub struct StreamHandle {
    pub generation: u64,
    task: JoinHandle<()>,
}

impl StreamHandle {
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Top-level session state: current backend session id and the active stream.
///
/// Owned by the app; fields are replaced atomically on "new chat" rather than
/// mutated piecemeal from multiple call sites.
#[derive(Debug, Default)]
pub struct AppContext {
    pub session_id: Option<String>,
    active: Option<StreamHandle>,
    next_generation: u64,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a stream is currently active. This is the concurrency gate:
    /// input stays disabled exactly while this is true.
    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// Start a new stream session for `prompt`, cancelling any active one
    /// first (exactly one stream may be open at a time).
    pub fn begin_stream(
        &mut self,
        client: &ChatClient,
        prompt: String,
        tx: mpsc::Sender<SessionEvent>,
    ) -> u64 {
        self.cancel_active();

        let generation = self.next_generation;
        self.next_generation += 1;

        let task = spawn_stream_task(
            client.clone(),
            self.session_id.clone(),
            prompt,
            generation,
            tx,
        );
        self.active = Some(StreamHandle { generation, task });
        generation
    }

    /// Install a pre-spawned stream handle (used by demo mode).
    pub fn attach_stream(&mut self, task: JoinHandle<()>) -> u64 {
        self.cancel_active();
        let generation = self.next_generation;
        self.next_generation += 1;
        self.active = Some(StreamHandle { generation, task });
        generation
    }

    /// Reserve the generation number the next stream will get.
    /// Needed when the task must know its own generation before spawning.
    pub fn peek_generation(&self) -> u64 {
        self.next_generation
    }

    /// True if `generation` identifies the currently active stream.
    /// Checked before every mutation driven by a stream update.
    pub fn accepts(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .map(|handle| handle.generation == generation)
            .unwrap_or(false)
    }

    /// Mark the active stream finished (terminal or error update applied).
    pub fn finish_stream(&mut self, generation: u64) {
        if self.accepts(generation) {
            self.active = None;
        }
    }

    /// Abort and forget the active stream, if any.
    pub fn cancel_active(&mut self) {
        if let Some(handle) = self.active.take() {
            tracing::debug!("Cancelling stream generation {}", handle.generation);
            handle.abort();
        }
    }

    /// Reset for a new chat: cancel any stream and give back the old session
    /// id so the caller can issue the best-effort backend delete.
    pub fn reset(&mut self) -> Option<String> {
        self.cancel_active();
        self.session_id.take()
    }
}

/// Spawn the I/O task for one stream session.
fn spawn_stream_task(
    client: ChatClient,
    session_id: Option<String>,
    prompt: String,
    generation: u64,
    tx: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let send = |update: StreamUpdate| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(SessionEvent { generation, update }).await;
            }
        };

        // Register the message; this is the only true suspension point
        // before the long-lived subscription.
        let session_id = match client.create_chat(&prompt, session_id.as_deref()).await {
            Ok(response) => response.session_id,
            Err(err) => {
                tracing::error!("Chat request failed: {:#}", err);
                send(StreamUpdate::TransportError(format!(
                    "Connection failed: {err:#}"
                )))
                .await;
                return;
            }
        };
        send(StreamUpdate::SessionOpened(session_id.clone())).await;

        let mut frames = match client.open_stream(&session_id, &prompt).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!("Stream open failed: {:#}", err);
                send(StreamUpdate::TransportError(format!(
                    "Connection failed: {err:#}"
                )))
                .await;
                return;
            }
        };

        let mut parser = FrameParser::new();
        loop {
            match frames.next().await {
                Some(Ok(frame)) => match parser.classify(&frame.data) {
                    StreamEvent::Delta(text) => send(StreamUpdate::Delta(text)).await,
                    StreamEvent::Done => {
                        send(StreamUpdate::Completed).await;
                        return;
                    }
                    StreamEvent::Error(message) => {
                        tracing::warn!("Backend stream error: {}", message);
                        send(StreamUpdate::StreamError(message)).await;
                        return;
                    }
                    StreamEvent::Ignorable => {}
                },
                Some(Err(err)) => {
                    tracing::error!("SSE decode error: {}", err);
                    send(StreamUpdate::TransportError(format!("Stream error: {err}"))).await;
                    return;
                }
                // Stream closed without a terminal frame
                None => {
                    tracing::warn!("Stream closed before [DONE]");
                    send(StreamUpdate::TransportError(
                        "Connection closed before the response completed".to_string(),
                    ))
                    .await;
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_task() -> JoinHandle<()> {
        tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        })
    }

    #[tokio::test]
    async fn test_generation_gating() {
        let mut ctx = AppContext::new();
        assert!(!ctx.is_streaming());
        assert!(!ctx.accepts(0));

        let generation = ctx.attach_stream(idle_task());
        assert!(ctx.is_streaming());
        assert!(ctx.accepts(generation));
        assert!(!ctx.accepts(generation + 1));
    }

    #[tokio::test]
    async fn test_finish_only_matching_generation() {
        let mut ctx = AppContext::new();
        let first = ctx.attach_stream(idle_task());
        let second = ctx.attach_stream(idle_task());
        assert_ne!(first, second);

        // A stale terminal event must not clear the newer stream
        ctx.finish_stream(first);
        assert!(ctx.is_streaming());
        assert!(ctx.accepts(second));

        ctx.finish_stream(second);
        assert!(!ctx.is_streaming());
    }

    #[tokio::test]
    async fn test_reset_returns_session_and_cancels() {
        let mut ctx = AppContext::new();
        ctx.session_id = Some("old-session".to_string());
        ctx.attach_stream(idle_task());

        let old = ctx.reset();
        assert_eq!(old, Some("old-session".to_string()));
        assert!(!ctx.is_streaming());
        assert!(ctx.session_id.is_none());
    }

    #[tokio::test]
    async fn test_stale_events_rejected_after_reset() {
        let mut ctx = AppContext::new();
        let generation = ctx.attach_stream(idle_task());
        ctx.reset();
        // Frames from the cancelled stream are no-ops
        assert!(!ctx.accepts(generation));
    }
}
