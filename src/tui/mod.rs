// TUI module - Terminal User Interface
//
// This module manages the terminal UI using ratatui. It handles:
// - Terminal initialization and cleanup
// - Event loop (keyboard input, timer ticks, stream updates)
// - Rendering the transcript, compose box and status line

pub mod app;
pub mod clipboard;
pub mod input;
pub mod markdown;
pub mod render;
pub mod theme;
pub mod ui;

use crate::config::Config;
use crate::lifecycle::TurnCommand;
use crate::logging::LogBuffer;
use crate::session::SessionEvent;
use anyhow::{Context, Result};
use app::{App, Mode};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Run the TUI
///
/// Sets up the terminal, runs the event loop, and restores the terminal when
/// done - including on error, so a failure never leaves the shell in raw mode.
pub async fn run_tui(
    config: Config,
    log_buffer: LogBuffer,
    updates_tx: mpsc::Sender<SessionEvent>,
    mut updates_rx: mpsc::Receiver<SessionEvent>,
) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let mut app = App::new(&config, log_buffer, updates_tx);

    let result = run_event_loop(&mut terminal, &mut app, &mut updates_rx).await;

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

/// Main event loop
///
/// tokio::select! multiplexes three sources:
/// 1. Keyboard and mouse input
/// 2. Timer ticks (reveal pacing, deletion expiry, redraw)
/// 3. Stream updates from the active session task
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    updates_rx: &mut mpsc::Receiver<SessionEvent>,
) -> Result<()> {
    // 50ms keeps the reveal smooth at the default 12ms/char speed
    let mut tick_interval = tokio::time::interval(Duration::from_millis(50));

    loop {
        terminal
            .draw(|frame| ui::draw(frame, app))
            .context("Failed to draw terminal")?;

        tokio::select! {
            // Keyboard or mouse input
            _ = async {
                if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                    match event::read() {
                        Ok(Event::Key(key_event)) => handle_key_event(app, key_event),
                        Ok(Event::Mouse(mouse_event)) => handle_mouse_event(app, mouse_event),
                        _ => {}
                    }
                }
            } => {}

            // Periodic tick: advance the reveal and expire pending deletions
            _ = tick_interval.tick() => {
                app.on_tick(Instant::now());
            }

            // Updates from the stream task
            Some(session_event) = updates_rx.recv() => {
                app.apply_update(session_event);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle keyboard input
/// Layered dispatch: global keys, then logs overlay, then mode-specific.
fn handle_key_event(app: &mut App, key_event: KeyEvent) {
    if key_event.kind != KeyEventKind::Press {
        return;
    }

    if handle_global_keys(app, &key_event) {
        return;
    }

    // The logs overlay swallows everything else while open
    if app.show_logs {
        if matches!(key_event.code, KeyCode::Esc | KeyCode::Char('q')) {
            app.show_logs = false;
        }
        return;
    }

    match app.mode {
        Mode::Compose => handle_compose_key(app, key_event),
        Mode::Select { .. } => handle_select_key(app, key_event),
        Mode::EditTurn { .. } => handle_edit_key(app, key_event),
    }
}

/// Keys that work in every mode. Returns true if the key was consumed.
fn handle_global_keys(app: &mut App, key_event: &KeyEvent) -> bool {
    let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
    match key_event.code {
        KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            true
        }
        KeyCode::Char('n') if ctrl => {
            app.new_chat();
            true
        }
        KeyCode::Char('l') if ctrl => {
            app.show_logs = !app.show_logs;
            true
        }
        KeyCode::PageUp => {
            app.scroll_up(10);
            true
        }
        KeyCode::PageDown => {
            app.scroll_down(10);
            true
        }
        _ => false,
    }
}

fn handle_compose_key(app: &mut App, key_event: KeyEvent) {
    let alt = key_event.modifiers.contains(KeyModifiers::ALT);
    match key_event.code {
        KeyCode::Enter if alt => app.input.insert_newline(),
        KeyCode::Enter => app.send_current_input(),
        KeyCode::Esc => {
            if app.ctx.is_streaming() {
                // Stop generating; keep whatever text already arrived
                app.abandon_active_stream();
            } else {
                app.enter_select_mode();
            }
        }
        _ => handle_text_key(app, key_event),
    }
}

fn handle_select_key(app: &mut App, key_event: KeyEvent) {
    let command = match key_event.code {
        KeyCode::Esc => {
            app.mode = Mode::Compose;
            return;
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.select_prev();
            return;
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.select_next();
            return;
        }
        KeyCode::Char('c') => TurnCommand::Copy,
        KeyCode::Char('e') => TurnCommand::Edit,
        KeyCode::Char('r') => TurnCommand::Regenerate,
        KeyCode::Char('d') => TurnCommand::Delete,
        _ => return,
    };
    if let Some(id) = app.command_target(command) {
        app.execute_command(command, id);
    }
}

fn handle_edit_key(app: &mut App, key_event: KeyEvent) {
    let alt = key_event.modifiers.contains(KeyModifiers::ALT);
    match key_event.code {
        KeyCode::Enter if alt => app.input.insert_newline(),
        KeyCode::Enter => app.save_edit_from_input(),
        KeyCode::Esc => app.cancel_edit(),
        _ => handle_text_key(app, key_event),
    }
}

/// Plain text-editing keys, shared by compose and edit modes.
fn handle_text_key(app: &mut App, key_event: KeyEvent) {
    // Ignore typing while the compose box is disabled mid-stream, except
    // navigation of the transcript.
    let editing = matches!(app.mode, Mode::EditTurn { .. });
    let enabled = app.input_enabled() || editing;

    match key_event.code {
        KeyCode::Char(ch) if enabled => app.input.insert_char(ch),
        KeyCode::Backspace if enabled => app.input.backspace(),
        KeyCode::Delete if enabled => app.input.delete(),
        KeyCode::Left => app.input.move_left(),
        KeyCode::Right => app.input.move_right(),
        KeyCode::Home => app.input.move_home(),
        KeyCode::End => app.input.move_end(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        _ => {}
    }
}

fn handle_mouse_event(app: &mut App, mouse_event: MouseEvent) {
    match mouse_event.kind {
        MouseEventKind::ScrollUp => app.scroll_up(3),
        MouseEventKind::ScrollDown => app.scroll_down(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogBuffer;

    fn test_app() -> App {
        let (tx, _rx) = mpsc::channel(8);
        App::new(&Config::default(), LogBuffer::new(), tx)
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[tokio::test]
    async fn test_typing_and_alt_enter_newline() {
        let mut app = test_app();
        handle_key_event(&mut app, press(KeyCode::Char('h'), KeyModifiers::NONE));
        handle_key_event(&mut app, press(KeyCode::Char('i'), KeyModifiers::NONE));
        handle_key_event(&mut app, press(KeyCode::Enter, KeyModifiers::ALT));
        handle_key_event(&mut app, press(KeyCode::Char('!'), KeyModifiers::NONE));
        assert_eq!(app.input.text(), "hi\n!");
    }

    #[tokio::test]
    async fn test_ctrl_c_quits() {
        let mut app = test_app();
        handle_key_event(&mut app, press(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_esc_enters_select_mode_and_commands_dispatch() {
        let mut app = test_app();
        app.log.push_user("question");
        let turn = app.log.push_assistant_streaming().unwrap();
        app.log.finalize(turn, "answer");

        handle_key_event(&mut app, press(KeyCode::Esc, KeyModifiers::NONE));
        assert!(matches!(app.mode, Mode::Select { .. }));

        handle_key_event(&mut app, press(KeyCode::Char('d'), KeyModifiers::NONE));
        assert!(app.log.get(turn).unwrap().is_deleting());
    }

    #[tokio::test]
    async fn test_logs_overlay_swallows_input() {
        let mut app = test_app();
        handle_key_event(&mut app, press(KeyCode::Char('l'), KeyModifiers::CONTROL));
        assert!(app.show_logs);

        handle_key_event(&mut app, press(KeyCode::Char('x'), KeyModifiers::NONE));
        assert_eq!(app.input.text(), "");

        handle_key_event(&mut app, press(KeyCode::Esc, KeyModifiers::NONE));
        assert!(!app.show_logs);
    }

    #[tokio::test]
    async fn test_enter_on_empty_input_sends_nothing() {
        let mut app = test_app();
        handle_key_event(&mut app, press(KeyCode::Enter, KeyModifiers::NONE));
        assert!(app.log.is_empty());
    }
}
