// Color theme for the chat TUI
//
// One dark palette tuned for readable transcripts. Kept as a struct of
// ratatui Styles so components never hard-code colors.

use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    /// Default body text
    pub text: Style,
    /// "You" header above user turns
    pub user_label: Style,
    /// "Claude" header above assistant turns
    pub assistant_label: Style,
    /// Inline code spans
    pub inline_code: Style,
    /// Fenced code block body
    pub code_block: Style,
    /// Code block language tag line
    pub code_lang: Style,
    /// Headings
    pub heading: Style,
    /// Bold text
    pub strong: Style,
    /// Italic text
    pub emphasis: Style,
    /// Blockquote body
    pub quote: Style,
    /// Link text
    pub link: Style,
    /// Streaming cursor marker
    pub cursor: Style,
    /// Inline error text inside a turn
    pub error: Style,
    /// Turn awaiting its delete transition
    pub deleting: Style,
    /// Selected turn highlight
    pub selection: Style,
    /// Status bar: idle
    pub status_idle: Style,
    /// Status bar: busy (sending / streaming)
    pub status_busy: Style,
    /// Status bar: error
    pub status_error: Style,
    /// Input box border
    pub input_border: Style,
    /// Input box border while disabled (stream active)
    pub input_border_disabled: Style,
    /// Title bar
    pub title: Style,
    /// Dim hint text (key help, welcome screen)
    pub hint: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text: Style::default().fg(Color::Gray),
            user_label: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            assistant_label: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            inline_code: Style::default().fg(Color::Yellow).bg(Color::Rgb(40, 40, 40)),
            code_block: Style::default()
                .fg(Color::Rgb(220, 220, 170))
                .bg(Color::Rgb(30, 30, 30)),
            code_lang: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            heading: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
            strong: Style::default().add_modifier(Modifier::BOLD),
            emphasis: Style::default().add_modifier(Modifier::ITALIC),
            quote: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            cursor: Style::default().fg(Color::White),
            error: Style::default().fg(Color::Red),
            deleting: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT),
            selection: Style::default().bg(Color::Rgb(50, 50, 70)),
            status_idle: Style::default().fg(Color::Green),
            status_busy: Style::default().fg(Color::Yellow),
            status_error: Style::default().fg(Color::Red),
            input_border: Style::default().fg(Color::Cyan),
            input_border_disabled: Style::default().fg(Color::DarkGray),
            title: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            hint: Style::default().fg(Color::DarkGray),
        }
    }
}
