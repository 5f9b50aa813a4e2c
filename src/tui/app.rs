// Application state and update logic
//
// App owns all conversation state and is mutated from exactly one place: the
// event loop in tui::run_event_loop. Stream tasks never touch it directly -
// they send SessionEvents over a channel, and apply_update() checks the
// event's generation against the active stream before mutating anything.
// A frame from a cancelled stream that was already queued is a no-op.

use crate::api::ChatClient;
use crate::config::Config;
use crate::conversation::{ConversationLog, LifecycleError, Role, TurnId};
use crate::demo;
use crate::lifecycle::{self, TurnCommand};
use crate::logging::LogBuffer;
use crate::reveal::RevealScheduler;
use crate::session::{AppContext, SessionEvent, StreamUpdate};
use crate::tui::clipboard;
use crate::tui::input::InputBox;
use crate::tui::render::{IncrementalRenderer, MarkdownSurface};
use crate::tui::theme::Theme;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// What the keyboard is currently driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Typing into the compose box
    Compose,
    /// Navigating transcript turns (Esc from compose)
    Select { index: usize },
    /// Editing an existing user turn in the compose box
    EditTurn { id: TurnId },
}

/// Status bar severity, mapped to a theme style when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Idle,
    Busy,
    Error,
}

/// The reveal state for the turn currently streaming.
pub struct ActiveReveal {
    pub turn: TurnId,
    pub scheduler: RevealScheduler,
}

pub struct App {
    pub theme: Theme,
    pub log: ConversationLog,
    pub ctx: AppContext,
    pub client: ChatClient,
    pub renderer: IncrementalRenderer<MarkdownSurface>,
    pub reveal: Option<ActiveReveal>,
    pub input: InputBox,
    pub mode: Mode,
    pub status: String,
    pub status_kind: StatusKind,
    pub scroll_offset: u16,
    /// Follow the bottom of the transcript while new text arrives
    pub follow: bool,
    pub show_logs: bool,
    pub log_buffer: LogBuffer,
    pub should_quit: bool,
    /// Channel the stream tasks report into
    updates: mpsc::Sender<SessionEvent>,
    reveal_speed: Duration,
    demo_mode: bool,
    last_tick: Instant,
}

impl App {
    pub fn new(
        config: &Config,
        log_buffer: LogBuffer,
        updates: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let theme = Theme::default();
        Self {
            renderer: IncrementalRenderer::new(MarkdownSurface::new(theme.clone()), &theme),
            theme,
            log: ConversationLog::new(),
            ctx: AppContext::new(),
            client: ChatClient::new(&config.server_url),
            reveal: None,
            input: InputBox::new(),
            mode: Mode::Compose,
            status: "Ready".to_string(),
            status_kind: StatusKind::Idle,
            scroll_offset: 0,
            follow: true,
            show_logs: false,
            log_buffer,
            should_quit: false,
            updates,
            reveal_speed: config.reveal_speed(),
            demo_mode: config.demo_mode,
            last_tick: Instant::now(),
        }
    }

    /// Input is disabled exactly while a stream is active.
    pub fn input_enabled(&self) -> bool {
        !self.ctx.is_streaming()
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = text.into();
        self.status_kind = kind;
    }

    // ---- sending ----

    /// Send whatever is in the compose box as a new user turn.
    pub fn send_current_input(&mut self) {
        if !self.input_enabled() || self.input.is_empty() {
            return;
        }
        let text = self.input.take().trim().to_string();
        self.log.push_user(&text);
        self.start_stream(text);
    }

    /// Open a stream for `prompt` with a fresh assistant turn to receive it.
    ///
    /// Precondition: the last turn in the log is the user turn carrying
    /// `prompt` (send, edit-save and regenerate all arrange this).
    fn start_stream(&mut self, prompt: String) {
        let turn = match self.log.push_assistant_streaming() {
            Ok(turn) => turn,
            Err(err) => {
                tracing::error!("Cannot open response turn: {}", err);
                self.set_status(StatusKind::Error, format!("Internal error: {err}"));
                return;
            }
        };

        self.reveal = Some(ActiveReveal {
            turn,
            scheduler: RevealScheduler::new(self.reveal_speed),
        });

        if self.demo_mode {
            let generation = self.ctx.peek_generation();
            let task = demo::spawn_demo_stream(generation, self.updates.clone());
            self.ctx.attach_stream(task);
        } else {
            self.ctx
                .begin_stream(&self.client, prompt, self.updates.clone());
        }
        self.follow = true;
        self.set_status(StatusKind::Busy, "Sending...");
    }

    // ---- stream updates ----

    /// Apply one update from a stream task. Updates from any stream other
    /// than the active one are dropped here, unconditionally.
    pub fn apply_update(&mut self, event: SessionEvent) {
        if !self.ctx.accepts(event.generation) {
            tracing::debug!(
                "Dropping stale update from generation {}",
                event.generation
            );
            return;
        }

        match event.update {
            StreamUpdate::SessionOpened(session_id) => {
                tracing::info!("Session opened: {}", session_id);
                self.ctx.session_id = Some(session_id);
                self.set_status(StatusKind::Busy, "Claude is thinking...");
            }
            StreamUpdate::Delta(text) => {
                if let Some(reveal) = &mut self.reveal {
                    reveal.scheduler.append(&text);
                }
            }
            StreamUpdate::Completed => {
                if let Some(mut reveal) = self.reveal.take() {
                    reveal.scheduler.finish();
                    // The accumulated buffer becomes the turn's raw text
                    self.log.finalize(reveal.turn, reveal.scheduler.buffer());
                }
                self.ctx.finish_stream(event.generation);
                self.set_status(StatusKind::Idle, "Ready");
            }
            StreamUpdate::StreamError(message) => {
                tracing::warn!("Stream reported an error: {}", message);
                if let Some(reveal) = self.reveal.take() {
                    // The backend aborted the response; show the error where
                    // the response would have been.
                    self.log.finalize(reveal.turn, format!("⚠ {message}"));
                }
                self.ctx.finish_stream(event.generation);
                self.set_status(StatusKind::Error, message);
            }
            StreamUpdate::TransportError(message) => {
                tracing::error!("Transport error: {}", message);
                if let Some(reveal) = self.reveal.take() {
                    // Keep whatever arrived before the connection dropped
                    let partial = reveal.scheduler.buffer();
                    if partial.is_empty() {
                        self.log.finalize(reveal.turn, format!("⚠ {message}"));
                    } else {
                        self.log.finalize(reveal.turn, partial);
                    }
                }
                self.ctx.finish_stream(event.generation);
                self.set_status(StatusKind::Error, message);
            }
        }
    }

    // ---- tick ----

    /// Advance time-driven state: the reveal watermark and pending deletions.
    pub fn on_tick(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;

        if let Some(reveal) = &mut self.reveal {
            reveal.scheduler.tick(elapsed);
        }

        if self.log.expire_deletions(now) > 0 {
            self.clamp_selection();
        }

        // The streaming turn can be deleted out from under the stream;
        // once it expires, the stream has nowhere to deliver.
        if let Some(reveal) = &self.reveal {
            if self.log.get(reveal.turn).is_none() {
                tracing::debug!("Streaming turn removed; cancelling stream");
                self.reveal = None;
                self.ctx.cancel_active();
                self.set_status(StatusKind::Idle, "Ready");
            }
        }
    }

    /// The visible prefix for the streaming turn, if `id` is it.
    pub fn streaming_visible(&self, id: TurnId) -> Option<&str> {
        match &self.reveal {
            Some(reveal) if reveal.turn == id => Some(reveal.scheduler.visible()),
            _ => None,
        }
    }

    // ---- turn commands ----

    pub fn execute_command(&mut self, command: TurnCommand, id: TurnId) {
        match command {
            TurnCommand::Copy => self.copy_turn(id),
            TurnCommand::Edit => self.begin_edit(id),
            TurnCommand::Regenerate => self.regenerate(id),
            TurnCommand::Delete => self.delete_turn(id),
        }
    }

    fn copy_turn(&mut self, id: TurnId) {
        // While streaming, copy what has arrived so far
        let text = match self.streaming_visible(id) {
            Some(visible) => visible.to_string(),
            None => match self.log.get(id) {
                Some(turn) => turn.raw_text.clone(),
                None => return,
            },
        };
        match clipboard::copy_to_clipboard(&text) {
            Ok(()) => self.set_status(StatusKind::Idle, "Copied to clipboard"),
            Err(err) => {
                tracing::warn!("Clipboard copy failed: {:#}", err);
                self.set_status(StatusKind::Error, "Copy failed (no clipboard access)");
            }
        }
    }

    fn begin_edit(&mut self, id: TurnId) {
        // Starting an edit cancels any in-flight response first,
        // keeping whatever text already arrived
        if self.ctx.is_streaming() {
            self.abandon_active_stream();
        }
        match lifecycle::begin_edit(&mut self.log, id) {
            Ok(text) => {
                self.input.set_text(text);
                self.mode = Mode::EditTurn { id };
                self.set_status(StatusKind::Idle, "Editing - Enter saves, Esc cancels");
            }
            Err(err) => self.set_status(StatusKind::Error, err.to_string()),
        }
    }

    /// Save the compose box contents as the edited turn's new text.
    /// A real change truncates everything after the turn and resends.
    pub fn save_edit_from_input(&mut self) {
        let Mode::EditTurn { id } = self.mode else {
            return;
        };
        let text = self.input.take();
        self.mode = Mode::Compose;
        match lifecycle::save_edit(&mut self.log, id, &text) {
            Ok(Some(prompt)) => self.start_stream(prompt),
            Ok(None) => self.set_status(StatusKind::Idle, "Ready"),
            Err(err) => self.set_status(StatusKind::Error, err.to_string()),
        }
    }

    pub fn cancel_edit(&mut self) {
        if let Mode::EditTurn { id } = self.mode {
            lifecycle::cancel_edit(&mut self.log, id);
            self.input.take();
            self.mode = Mode::Compose;
            self.set_status(StatusKind::Idle, "Ready");
        }
    }

    fn regenerate(&mut self, id: TurnId) {
        // Capture the prompt before touching stream state: abandoning an
        // in-flight stream with no text removes its turn, and regenerate
        // must still resend in that case.
        let predecessor = self
            .log
            .predecessor(id)
            .map(|turn| (turn.id, turn.role, turn.raw_text.clone()));

        // Regenerating cancels any in-flight response first
        if self.ctx.is_streaming() {
            self.abandon_active_stream();
        }

        if self.log.get(id).is_some() {
            match lifecycle::regenerate(&mut self.log, id) {
                Ok(prompt) => {
                    // A regenerated response invalidates everything after its
                    // prompt, same as an edit.
                    if let Some((prev, _, _)) = predecessor {
                        self.log.truncate_after(prev);
                    }
                    self.mode = Mode::Compose;
                    self.start_stream(prompt);
                }
                Err(err) => self.set_status(StatusKind::Error, err.to_string()),
            }
        } else {
            // The turn was the empty in-flight response and the abandon
            // already removed it; resend its prompt directly.
            match predecessor {
                Some((prev, Role::User, prompt)) => {
                    self.log.truncate_after(prev);
                    self.mode = Mode::Compose;
                    self.start_stream(prompt);
                }
                _ => self.set_status(
                    StatusKind::Error,
                    LifecycleError::NoPrecedingUserTurn.to_string(),
                ),
            }
        }
    }

    fn delete_turn(&mut self, id: TurnId) {
        // Deleting the streaming turn cancels its stream immediately;
        // the turn itself lingers in Deleting until the delay passes.
        if self.streaming_visible(id).is_some() {
            self.reveal = None;
            self.ctx.cancel_active();
        }
        match lifecycle::delete(&mut self.log, id, Instant::now()) {
            Ok(()) => {
                self.set_status(StatusKind::Idle, "Deleted");
                self.mode = Mode::Compose;
            }
            Err(err) => self.set_status(StatusKind::Error, err.to_string()),
        }
    }

    // ---- stream/session teardown ----

    /// Cancel the active stream, keeping whatever text already arrived.
    pub fn abandon_active_stream(&mut self) {
        self.ctx.cancel_active();
        if let Some(mut reveal) = self.reveal.take() {
            reveal.scheduler.finish();
            let partial = reveal.scheduler.buffer();
            if partial.is_empty() {
                self.log.remove(reveal.turn);
            } else {
                self.log.finalize(reveal.turn, partial);
            }
        }
        self.set_status(StatusKind::Idle, "Ready");
    }

    /// Start over: drop the transcript and ask the backend to forget the
    /// session. The delete is best-effort and must not block the new chat.
    pub fn new_chat(&mut self) {
        self.abandon_active_stream();
        if let Some(old_session) = self.ctx.reset() {
            let client = self.client.clone();
            tokio::spawn(async move {
                if let Err(err) = client.delete_session(&old_session).await {
                    tracing::warn!("Session cleanup failed: {:#}", err);
                }
            });
        }
        self.log.clear();
        self.input.take();
        self.mode = Mode::Compose;
        self.follow = true;
        self.scroll_offset = 0;
        self.set_status(StatusKind::Idle, "New chat");
    }

    // ---- selection ----

    pub fn enter_select_mode(&mut self) {
        if self.log.is_empty() {
            return;
        }
        self.mode = Mode::Select {
            index: self.log.len() - 1,
        };
    }

    pub fn select_prev(&mut self) {
        if let Mode::Select { index } = &mut self.mode {
            *index = index.saturating_sub(1);
        }
    }

    pub fn select_next(&mut self) {
        let last = self.log.len().saturating_sub(1);
        if let Mode::Select { index } = &mut self.mode {
            *index = (*index + 1).min(last);
        }
    }

    /// The turn the selection cursor is on, if in select mode.
    pub fn selected_turn(&self) -> Option<TurnId> {
        match self.mode {
            Mode::Select { index } => self.log.turns().get(index).map(|turn| turn.id),
            _ => None,
        }
    }

    /// The turn a command applies to: the selected one, or the last
    /// command-appropriate turn when composing.
    pub fn command_target(&self, command: TurnCommand) -> Option<TurnId> {
        if let Some(id) = self.selected_turn() {
            return Some(id);
        }
        let wanted = match command {
            TurnCommand::Edit => Role::User,
            _ => Role::Assistant,
        };
        self.log
            .turns()
            .iter()
            .rev()
            .find(|turn| turn.role == wanted)
            .map(|turn| turn.id)
    }

    fn clamp_selection(&mut self) {
        if let Mode::Select { index } = &mut self.mode {
            if self.log.is_empty() {
                self.mode = Mode::Compose;
            } else {
                *index = (*index).min(self.log.len() - 1);
            }
        }
    }

    // ---- scrolling ----

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
        self.follow = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }
}
