// Layout and drawing
//
// Pure rendering over App state; no mutation here except clamping the scroll
// offset to the freshly computed transcript height.

use super::app::{App, Mode, StatusKind};
use crate::conversation::{Role, Turn};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

/// Tallest the compose box grows before the text scrolls internally.
const MAX_INPUT_LINES: u16 = 5;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let input_lines = (app.input.line_count() as u16).min(MAX_INPUT_LINES);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),               // title
            Constraint::Min(3),                  // transcript
            Constraint::Length(1),               // status
            Constraint::Length(input_lines + 2), // compose box
        ])
        .split(frame.area());

    draw_title(frame, app, chunks[0]);
    draw_transcript(frame, app, chunks[1]);
    draw_status(frame, app, chunks[2]);
    draw_input(frame, app, chunks[3]);

    if app.show_logs {
        draw_logs_overlay(frame, app);
    }
}

fn draw_title(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" cchat ", app.theme.title),
        Span::styled(
            format!("v{} ", crate::config::VERSION),
            app.theme.hint,
        ),
    ];
    if let Some(session) = &app.ctx.session_id {
        spans.push(Span::styled(
            format!("· session {session} "),
            app.theme.hint,
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_transcript(frame: &mut Frame, app: &mut App, area: Rect) {
    if app.log.is_empty() {
        draw_welcome(frame, app, area);
        return;
    }

    let selected = app.selected_turn();
    let mut lines: Vec<Line<'static>> = Vec::new();
    for turn in app.log.turns() {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(turn_header(app, turn, selected == Some(turn.id)));

        let mut body = match app.streaming_visible(turn.id) {
            Some(visible) => app.renderer.render_streaming(visible),
            None => app.renderer.render_final(&turn.raw_text),
        };
        if turn.is_deleting() {
            for line in &mut body.lines {
                let spans = std::mem::take(&mut line.spans);
                line.spans = spans
                    .into_iter()
                    .map(|span| Span::styled(span.content, app.theme.deleting))
                    .collect();
            }
        }
        lines.extend(body.lines);
    }

    // Follow the bottom while streaming; otherwise honor manual scrolling,
    // clamped so the view can never run past the end.
    let total_rows = wrapped_rows(&lines, area.width);
    let max_offset = total_rows.saturating_sub(area.height);
    if app.follow {
        app.scroll_offset = max_offset;
    } else {
        app.scroll_offset = app.scroll_offset.min(max_offset);
        if app.scroll_offset == max_offset {
            app.follow = true;
        }
    }

    let transcript = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset, 0));
    frame.render_widget(transcript, area);
}

fn turn_header(app: &App, turn: &Turn, selected: bool) -> Line<'static> {
    let label_style = match turn.role {
        Role::User => app.theme.user_label,
        Role::Assistant => app.theme.assistant_label,
    };
    let mut spans = Vec::new();
    if selected {
        spans.push(Span::styled("▶ ", app.theme.selection));
    }
    spans.push(Span::styled(turn.role.label().to_string(), label_style));
    if turn.is_deleting() {
        spans.push(Span::styled(" (deleting)", app.theme.hint));
    }
    Line::from(spans)
}

fn draw_welcome(frame: &mut Frame, app: &App, area: Rect) {
    let lines = vec![
        Line::default(),
        Line::from(Span::styled("Start a conversation", app.theme.title)),
        Line::default(),
        Line::from(Span::styled(
            "Type a message and press Enter. Alt+Enter inserts a newline.",
            app.theme.hint,
        )),
        Line::from(Span::styled(
            "Esc selects a turn: c copy · e edit · r regenerate · d delete",
            app.theme.hint,
        )),
        Line::from(Span::styled(
            "Ctrl+N new chat · Ctrl+L logs · Ctrl+C quit",
            app.theme.hint,
        )),
    ];
    frame.render_widget(
        Paragraph::new(lines).alignment(ratatui::layout::Alignment::Center),
        area,
    );
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let style = match app.status_kind {
        StatusKind::Idle => app.theme.status_idle,
        StatusKind::Busy => app.theme.status_busy,
        StatusKind::Error => app.theme.status_error,
    };
    let hint = match app.mode {
        Mode::Compose => "Enter send · Esc select",
        Mode::Select { .. } => "↑/↓ move · c/e/r/d act · Esc back",
        Mode::EditTurn { .. } => "Enter save · Esc cancel",
    };
    let line = Line::from(vec![
        Span::styled(format!(" {}", app.status), style),
        Span::styled(format!("  ·  {hint}"), app.theme.hint),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let editing = matches!(app.mode, Mode::EditTurn { .. });
    let enabled = app.input_enabled();
    let border = if enabled {
        app.theme.input_border
    } else {
        app.theme.input_border_disabled
    };
    let title = if editing {
        " Edit message "
    } else if enabled {
        " Message "
    } else {
        " Waiting for response... "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(title, border));
    let inner = block.inner(area);

    // Keep the cursor's line in view when the text outgrows the box
    let (line, column) = app.input.cursor_position();
    let scroll = (line as u16).saturating_sub(inner.height.saturating_sub(1));

    let text_style = if enabled {
        app.theme.text
    } else {
        app.theme.hint
    };
    let paragraph = Paragraph::new(app.input.text().to_string())
        .style(text_style)
        .scroll((scroll, 0))
        .block(block);
    frame.render_widget(paragraph, area);

    if enabled && !matches!(app.mode, Mode::Select { .. }) {
        frame.set_cursor_position((
            inner.x + (column as u16).min(inner.width.saturating_sub(1)),
            inner.y + (line as u16).saturating_sub(scroll),
        ));
    }
}

fn draw_logs_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect(80, 70, frame.area());
    frame.render_widget(Clear, area);

    let entries = app.log_buffer.entries();
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = entries
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|entry| {
            let level_style = match entry.level {
                tracing::Level::ERROR => app.theme.status_error,
                tracing::Level::WARN => app.theme.status_busy,
                _ => app.theme.hint,
            };
            Line::from(vec![
                Span::styled(
                    format!("{} ", entry.timestamp.format("%H:%M:%S%.3f")),
                    app.theme.hint,
                ),
                Span::styled(format!("{:5} ", entry.level), level_style),
                Span::styled(entry.message.clone(), app.theme.text),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.input_border)
        .title(" Logs (Ctrl+L to close) ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Display rows `lines` will occupy at `width` once wrapped.
fn wrapped_rows(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|line| {
            let cols: usize = line
                .spans
                .iter()
                .map(|span| span.content.as_ref().width())
                .sum();
            (cols.max(1).div_ceil(width)) as u16
        })
        .sum()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::logging::LogBuffer;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use tokio::sync::mpsc;

    fn test_app() -> App {
        let (tx, _rx) = mpsc::channel(8);
        App::new(&Config::default(), LogBuffer::new(), tx)
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[tokio::test]
    async fn test_welcome_screen_renders() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| draw(frame, &mut app)).unwrap();
        let screen = buffer_text(&terminal);
        assert!(screen.contains("Start a conversation"));
        assert!(screen.contains("Ready"));
    }

    #[tokio::test]
    async fn test_transcript_shows_turn_labels() {
        let mut app = test_app();
        app.log.push_user("What is Rust?");
        let turn = app.log.push_assistant_streaming().unwrap();
        app.log.finalize(turn, "A systems language.");

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| draw(frame, &mut app)).unwrap();
        let screen = buffer_text(&terminal);
        assert!(screen.contains("You"));
        assert!(screen.contains("Claude"));
        assert!(screen.contains("What is Rust?"));
        assert!(screen.contains("A systems language."));
    }

    #[tokio::test]
    async fn test_wrapped_rows_counts_long_lines() {
        let lines = vec![
            Line::from("short"),
            Line::from("x".repeat(25)),
            Line::default(),
        ];
        // At width 10: 1 + 3 + 1 rows
        assert_eq!(wrapped_rows(&lines, 10), 5);
    }
}
