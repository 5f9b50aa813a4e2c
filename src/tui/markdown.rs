// Markdown rendering for the transcript
//
// Single-pass conversion from markdown to styled ratatui lines using
// pulldown-cmark. Covers what chat responses actually contain: paragraphs,
// headings, bold/italic/strikethrough, inline code, fenced code blocks with a
// language tag, nested lists, blockquotes, links, and rules.
//
// Wrapping is left to the Paragraph widget; this module only decides line
// breaks that are structural in the markdown itself.

use super::theme::Theme;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::Style;
use ratatui::text::{Line, Span};

/// Render markdown into styled lines.
pub fn render_markdown(text: &str, theme: &Theme) -> Vec<Line<'static>> {
    MarkdownWriter::new(theme).run(text)
}

/// Incremental state while walking pulldown-cmark events.
struct MarkdownWriter<'t> {
    theme: &'t Theme,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    /// Nested inline emphasis state
    bold: bool,
    italic: bool,
    strikethrough: bool,
    in_link: bool,
    /// Blockquote nesting depth
    quote_depth: usize,
    /// Active code block language, Some while inside a block
    code_block: Option<String>,
    code_content: String,
    /// Heading level while inside a heading
    heading: Option<u8>,
    /// Target of the link currently being rendered
    link_url: String,
    /// List stack: next ordinal for ordered lists, None for bullets
    list_stack: Vec<Option<u64>>,
}

impl<'t> MarkdownWriter<'t> {
    fn new(theme: &'t Theme) -> Self {
        Self {
            theme,
            lines: Vec::new(),
            spans: Vec::new(),
            bold: false,
            italic: false,
            strikethrough: false,
            in_link: false,
            quote_depth: 0,
            code_block: None,
            code_content: String::new(),
            heading: None,
            link_url: String::new(),
            list_stack: Vec::new(),
        }
    }

    fn run(mut self, text: &str) -> Vec<Line<'static>> {
        let options = Options::ENABLE_STRIKETHROUGH;
        for event in Parser::new_ext(text, options) {
            self.handle(event);
        }
        self.flush_line();
        // Drop a trailing structural blank so turns don't end with dead space
        while self
            .lines
            .last()
            .map(|line| line.spans.is_empty())
            .unwrap_or(false)
        {
            self.lines.pop();
        }
        self.lines
    }

    /// Current style for plain text given the inline state.
    fn text_style(&self) -> Style {
        let mut style = if self.heading.is_some() {
            self.theme.heading
        } else if self.quote_depth > 0 {
            self.theme.quote
        } else if self.in_link {
            self.theme.link
        } else {
            self.theme.text
        };
        if self.bold {
            style = style.patch(self.theme.strong);
        }
        if self.italic {
            style = style.patch(self.theme.emphasis);
        }
        if self.strikethrough {
            style = style.patch(
                Style::default().add_modifier(ratatui::style::Modifier::CROSSED_OUT),
            );
        }
        style
    }

    fn push_span(&mut self, content: String, style: Style) {
        if content.is_empty() {
            return;
        }
        self.spans.push(Span::styled(content, style));
    }

    /// Emit the pending spans as one line, prefixed with quote markers.
    fn flush_line(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let mut spans = Vec::with_capacity(self.spans.len() + 1);
        if self.quote_depth > 0 {
            spans.push(Span::styled(
                "▌ ".repeat(self.quote_depth),
                self.theme.quote,
            ));
        }
        spans.append(&mut self.spans);
        self.lines.push(Line::from(spans));
    }

    fn blank_line(&mut self) {
        self.flush_line();
        if !self.lines.is_empty() {
            self.lines.push(Line::default());
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Text(text) => {
                if self.code_block.is_some() {
                    self.code_content.push_str(&text);
                } else {
                    self.push_span(text.to_string(), self.text_style());
                }
            }
            Event::Code(code) => {
                self.push_span(format!(" {code} "), self.theme.inline_code);
            }

            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => self.blank_line(),

            Event::Start(Tag::Heading { level, .. }) => {
                self.flush_line();
                let level = match level {
                    HeadingLevel::H1 => 1,
                    HeadingLevel::H2 => 2,
                    HeadingLevel::H3 => 3,
                    HeadingLevel::H4 => 4,
                    HeadingLevel::H5 => 5,
                    HeadingLevel::H6 => 6,
                };
                self.heading = Some(level);
                self.push_span("#".repeat(level as usize) + " ", self.theme.heading);
            }
            Event::End(TagEnd::Heading(_)) => {
                self.heading = None;
                self.blank_line();
            }

            Event::Start(Tag::Strong) => self.bold = true,
            Event::End(TagEnd::Strong) => self.bold = false,
            Event::Start(Tag::Emphasis) => self.italic = true,
            Event::End(TagEnd::Emphasis) => self.italic = false,
            Event::Start(Tag::Strikethrough) => self.strikethrough = true,
            Event::End(TagEnd::Strikethrough) => self.strikethrough = false,

            Event::Start(Tag::Link { dest_url, .. }) => {
                self.in_link = true;
                // Remember the target; appended after the link text
                self.link_url = dest_url.to_string();
            }
            Event::End(TagEnd::Link) => {
                self.in_link = false;
                let url = std::mem::take(&mut self.link_url);
                self.push_span(format!(" ({url})"), self.theme.hint);
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                self.flush_line();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => lang.to_string(),
                    _ => String::new(),
                };
                self.lines.push(Line::from(Span::styled(
                    format!("┌─ {lang}"),
                    self.theme.code_lang,
                )));
                self.code_block = Some(lang);
                self.code_content.clear();
            }
            Event::End(TagEnd::CodeBlock) => {
                let content = std::mem::take(&mut self.code_content);
                for code_line in content.lines() {
                    self.lines.push(Line::from(vec![
                        Span::styled("│ ", self.theme.code_lang),
                        Span::styled(code_line.to_string(), self.theme.code_block),
                    ]));
                }
                self.lines
                    .push(Line::from(Span::styled("└─", self.theme.code_lang)));
                self.lines.push(Line::default());
                self.code_block = None;
            }

            Event::Start(Tag::List(start)) => {
                self.flush_line();
                self.list_stack.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            Event::Start(Tag::Item) => {
                self.flush_line();
                let depth = self.list_stack.len().saturating_sub(1);
                let marker = match self.list_stack.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{}{}. ", "  ".repeat(depth), number);
                        *number += 1;
                        marker
                    }
                    _ => format!("{}• ", "  ".repeat(depth)),
                };
                self.push_span(marker, self.theme.text);
            }
            Event::End(TagEnd::Item) => self.flush_line(),

            Event::Start(Tag::BlockQuote) => {
                self.flush_line();
                self.quote_depth += 1;
            }
            Event::End(TagEnd::BlockQuote) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 {
                    self.blank_line();
                }
            }

            Event::Rule => {
                self.flush_line();
                self.lines
                    .push(Line::from(Span::styled("─".repeat(40), self.theme.hint)));
                self.lines.push(Line::default());
            }

            Event::SoftBreak => {
                if self.code_block.is_some() {
                    self.code_content.push('\n');
                } else {
                    self.flush_line();
                }
            }
            Event::HardBreak => self.flush_line(),

            // Raw HTML and everything else renders as plain text
            Event::Html(html) | Event::InlineHtml(html) => {
                self.push_span(html.to_string(), self.theme.text);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_plain(markdown: &str) -> String {
        let theme = Theme::default();
        render_markdown(markdown, &theme)
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_plain_paragraph() {
        assert_eq!(render_plain("Hello world"), "Hello world");
    }

    #[test]
    fn test_heading_keeps_marker() {
        let text = render_plain("## Section");
        assert!(text.contains("## Section"));
    }

    #[test]
    fn test_fenced_code_block_framed() {
        let text = render_plain("```rust\nfn main() {}\n```");
        assert!(text.contains("┌─ rust"));
        assert!(text.contains("│ fn main() {}"));
        assert!(text.contains("└─"));
    }

    #[test]
    fn test_inline_code_padded() {
        let text = render_plain("run `cargo test` now");
        assert!(text.contains(" cargo test "));
    }

    #[test]
    fn test_unordered_list_markers() {
        let text = render_plain("- first\n- second");
        assert!(text.contains("• first"));
        assert!(text.contains("• second"));
    }

    #[test]
    fn test_ordered_list_numbers_advance() {
        let text = render_plain("1. one\n2. two\n3. three");
        assert!(text.contains("1. one"));
        assert!(text.contains("2. two"));
        assert!(text.contains("3. three"));
    }

    #[test]
    fn test_nested_list_indented() {
        let text = render_plain("- outer\n  - inner");
        assert!(text.contains("• outer"));
        assert!(text.contains("  • inner"));
    }

    #[test]
    fn test_blockquote_prefixed() {
        let text = render_plain("> quoted words");
        assert!(text.contains("▌ quoted words"));
    }

    #[test]
    fn test_link_shows_target() {
        let text = render_plain("[docs](https://example.com)");
        assert!(text.contains("docs"));
        assert!(text.contains("(https://example.com)"));
    }

    #[test]
    fn test_no_trailing_blank_lines() {
        let theme = Theme::default();
        let lines = render_markdown("some text\n", &theme);
        assert!(!lines.last().unwrap().spans.is_empty());
    }

    #[test]
    fn test_empty_input_renders_nothing() {
        let theme = Theme::default();
        assert!(render_markdown("", &theme).is_empty());
    }
}
