// Incremental rendering of a partially revealed response
//
// Re-parsing markdown from an incomplete prefix is safe except for fenced
// code blocks: an odd number of ``` delimiters means the prefix ends inside
// an open fence, and rendering it as-is would style the rest of the turn as
// code. The fix is a synthetic closing fence appended for rendering only -
// it never enters the buffer or the turn's raw text.
//
// Rendering is a pure function of the prefix, so re-rendering the same prefix
// is idempotent: exactly one cursor marker, never stacked.
//
// The markup surface is a trait so the fence/cursor logic tests without
// pulling in a real markdown pipeline, and so a render failure can fall back
// to plain text instead of escaping this boundary.

use super::markdown;
use super::theme::Theme;
use anyhow::Result;
use ratatui::text::{Line, Span, Text};

/// Fenced code block delimiter.
const FENCE: &str = "```";

/// Cursor marker appended to the last display line while streaming.
pub const CURSOR: &str = "▌";

/// External markup-rendering capability.
pub trait RenderSurface {
    fn render(&self, text: &str) -> Result<Vec<Line<'static>>>;
}

/// Production surface: markdown to styled lines.
#[derive(Debug, Clone, Default)]
pub struct MarkdownSurface {
    theme: Theme,
}

impl MarkdownSurface {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }
}

impl RenderSurface for MarkdownSurface {
    fn render(&self, text: &str) -> Result<Vec<Line<'static>>> {
        Ok(markdown::render_markdown(text, &self.theme))
    }
}

/// Renders a revealed prefix safely at every reveal tick.
#[derive(Debug)]
pub struct IncrementalRenderer<S> {
    surface: S,
    cursor_style: ratatui::style::Style,
    text_style: ratatui::style::Style,
}

impl<S: RenderSurface> IncrementalRenderer<S> {
    pub fn new(surface: S, theme: &Theme) -> Self {
        Self {
            surface,
            cursor_style: theme.cursor,
            text_style: theme.text,
        }
    }

    /// Render a mid-stream prefix: balance an open fence, append the cursor.
    pub fn render_streaming(&self, prefix: &str) -> Text<'static> {
        let open_fence = prefix.matches(FENCE).count() % 2 == 1;
        let mut lines = if open_fence {
            // Synthetic close, for rendering only
            let balanced = format!("{prefix}\n{FENCE}");
            self.render_or_fallback(&balanced)
        } else {
            self.render_or_fallback(prefix)
        };

        // Exactly one cursor marker, on the last line
        let cursor = Span::styled(CURSOR, self.cursor_style);
        match lines.last_mut() {
            Some(last) => last.spans.push(cursor),
            None => lines.push(Line::from(cursor)),
        }
        Text::from(lines)
    }

    /// Render the complete, finalized text: no synthetic fence, no cursor.
    pub fn render_final(&self, full_text: &str) -> Text<'static> {
        Text::from(self.render_or_fallback(full_text))
    }

    /// Never let a surface failure escape: degrade to plain text.
    fn render_or_fallback(&self, text: &str) -> Vec<Line<'static>> {
        match self.surface.render(text) {
            Ok(lines) => lines,
            Err(err) => {
                tracing::warn!("Markup rendering failed, falling back to plain text: {err:#}");
                text.lines()
                    .map(|line| Line::from(Span::styled(line.to_string(), self.text_style)))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    /// Surface that echoes its input verbatim, one Line per input line.
    struct EchoSurface;

    impl RenderSurface for EchoSurface {
        fn render(&self, text: &str) -> Result<Vec<Line<'static>>> {
            Ok(text
                .lines()
                .map(|line| Line::from(line.to_string()))
                .collect())
        }
    }

    /// Surface that always fails, to exercise the fallback path.
    struct BrokenSurface;

    impl RenderSurface for BrokenSurface {
        fn render(&self, _text: &str) -> Result<Vec<Line<'static>>> {
            Err(anyhow!("surface exploded"))
        }
    }

    fn plain(text: &Text<'_>) -> String {
        text.lines
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

    fn renderer() -> IncrementalRenderer<EchoSurface> {
        IncrementalRenderer::new(EchoSurface, &Theme::default())
    }

    #[test]
    fn test_open_fence_gets_synthetic_close() {
        let rendered = renderer().render_streaming("text\n```rust\nlet x = 1;");
        let output = plain(&rendered);
        // The synthetic close appears in display output...
        assert_eq!(output.matches(FENCE).count() % 2, 0);
        // ...after the partial code line
        assert!(output.contains("let x = 1;"));
    }

    #[test]
    fn test_balanced_fences_untouched() {
        let input = "```\ncode\n```\nafter";
        let rendered = renderer().render_streaming(input);
        let output = plain(&rendered);
        assert_eq!(output.matches(FENCE).count(), 2);
    }

    #[test]
    fn test_exactly_one_cursor_marker() {
        let renderer = renderer();
        let first = renderer.render_streaming("partial tex");
        assert_eq!(plain(&first).matches(CURSOR).count(), 1);

        // Re-rendering the same prefix yields one marker again, never two
        let second = renderer.render_streaming("partial tex");
        assert_eq!(plain(&second).matches(CURSOR).count(), 1);
        assert_eq!(plain(&first), plain(&second));
    }

    #[test]
    fn test_cursor_on_empty_prefix() {
        let rendered = renderer().render_streaming("");
        assert_eq!(plain(&rendered), CURSOR);
    }

    #[test]
    fn test_final_render_has_no_cursor_or_synthetic_fence() {
        let renderer = renderer();
        let rendered = renderer.render_final("done\n```\nstill open");
        let output = plain(&rendered);
        assert!(!output.contains(CURSOR));
        // The final pass renders the authoritative text as-is
        assert_eq!(output.matches(FENCE).count(), 1);
    }

    #[test]
    fn test_surface_failure_falls_back_to_plain_text() {
        let renderer = IncrementalRenderer::new(BrokenSurface, &Theme::default());
        let rendered = renderer.render_streaming("plain\nlines");
        let output = plain(&rendered);
        assert!(output.contains("plain"));
        assert!(output.contains("lines"));
        assert_eq!(output.matches(CURSOR).count(), 1);
    }

    #[test]
    fn test_markdown_surface_end_to_end() {
        let renderer = IncrementalRenderer::new(
            MarkdownSurface::new(Theme::default()),
            &Theme::default(),
        );
        // A prefix that ends inside a fence must still produce framed code
        let rendered = renderer.render_streaming("Intro\n\n```python\nprint(1)");
        let output = plain(&rendered);
        assert!(output.contains("┌─ python"));
        assert!(output.contains("│ print(1)"));
        assert_eq!(output.matches(CURSOR).count(), 1);
    }
}
