// Demo mode - a scripted stream with no backend
//
// Plays a canned response through the same classification path the real
// stream uses, so every downstream piece (frame parsing, reveal pacing,
// incremental markdown, completion handling) is exercised end to end.
// The script deliberately includes a malformed frame and a duplicate
// fallback-shaped frame; neither may leak into the transcript.

use crate::frame::{FrameParser, StreamEvent};
use crate::session::{SessionEvent, StreamUpdate};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Raw frames exactly as a backend would send them.
const DEMO_FRAMES: &[&str] = &[
    r#"{"type":"system","subtype":"init"}"#,
    r#"{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"Hello! This is **demo mode** - no backend required.\n\n"}}}"#,
    r#"{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"Streaming text reveals at a steady pace, and markdown renders incrementally:\n\n"}}}"#,
    r#"{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"- *Italics* and **bold**\n- `inline code`\n- Lists, quotes, headings\n\n"}}}"#,
    r#"{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"```rust\nfn main() {\n"}}}"#,
    // Not JSON at all; classification shrugs and moves on
    "this frame is garbage",
    r#"{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"    println!(\"open fences stay balanced while streaming\");\n}\n```\n\n"}}}"#,
    r#"{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"Try the turn commands: `c` copy, `e` edit, `r` regenerate, `d` delete."}}}"#,
    // Full-text fallback duplicating what already streamed; must be ignored
    r#"{"type":"result","result":"Hello! This is **demo mode** - no backend required."}"#,
    "[DONE]",
];

/// Pause between frames, long enough to watch the reveal in action.
const FRAME_INTERVAL: Duration = Duration::from_millis(350);

/// Spawn a task that plays the demo script as a stream session.
pub fn spawn_demo_stream(generation: u64, tx: mpsc::Sender<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let send = |update: StreamUpdate| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(SessionEvent { generation, update }).await;
            }
        };

        send(StreamUpdate::SessionOpened("demo-session".to_string())).await;

        let mut parser = FrameParser::new();
        for raw in DEMO_FRAMES {
            tokio::time::sleep(FRAME_INTERVAL).await;
            match parser.classify(raw) {
                StreamEvent::Delta(text) => send(StreamUpdate::Delta(text)).await,
                StreamEvent::Done => {
                    send(StreamUpdate::Completed).await;
                    return;
                }
                StreamEvent::Error(message) => {
                    send(StreamUpdate::StreamError(message)).await;
                    return;
                }
                StreamEvent::Ignorable => {}
            }
        }
    })
}
