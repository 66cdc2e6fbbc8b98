use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::text::Text;
use unicode_width::UnicodeWidthStr;

use crate::text::TokenLine;

/// Layout options for [`render_token_lines`].
#[derive(Clone, Debug)]
pub struct CodeRenderOptions {
    /// Whether to show 1-based line numbers.
    pub show_line_numbers: bool,
    /// The line number of the first rendered line (1-based).
    pub line_number_start: usize,
    /// Separator after the line number gutter (e.g. `" │ "`).
    pub line_number_separator: &'static str,
    /// Line numbers (same numbering as the gutter) that get the highlight style.
    pub highlighted_lines: Vec<usize>,
}

impl Default for CodeRenderOptions {
    fn default() -> Self {
        Self {
            show_line_numbers: false,
            line_number_start: 1,
            line_number_separator: " │ ",
            highlighted_lines: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CodeRenderStyles {
    /// Base style applied to code spans (patched onto token styles). Usually the theme's
    /// pre style.
    pub base: Style,
    /// Style used for the line number gutter.
    pub gutter: Style,
    /// Line style for highlighted lines.
    pub highlight: Style,
}

#[derive(Clone, Debug)]
pub struct RenderedCode {
    pub lines: Vec<Line<'static>>,
    /// Maximum display width (in terminal cell units) across all rendered lines.
    pub content_width: u32,
    pub content_height: u32,
}

impl RenderedCode {
    pub fn into_text(self) -> Text<'static> {
        Text::from(self.lines)
    }
}

/// Renders highlighted token lines into styled [`Line`]s.
///
/// This is a rendering core; it does not own any viewport or scroll state. Cache the result and
/// re-render when the token lines, styles, or options change.
pub fn render_token_lines(
    lines: &[TokenLine],
    styles: CodeRenderStyles,
    options: &CodeRenderOptions,
) -> RenderedCode {
    if lines.is_empty() {
        return RenderedCode {
            lines: vec![Line::from(vec![Span::styled(String::new(), styles.base)])],
            content_width: 0,
            content_height: 1,
        };
    }

    let line_number_w = if options.show_line_numbers {
        digits(
            options
                .line_number_start
                .saturating_add(lines.len().saturating_sub(1)),
        )
    } else {
        0
    };

    let mut out: Vec<Line<'static>> = Vec::with_capacity(lines.len());
    let mut max_w = 0u32;

    for (idx, tokens) in lines.iter().enumerate() {
        let n = options.line_number_start.saturating_add(idx);
        let mut spans: Vec<Span<'static>> = Vec::with_capacity(tokens.len() + 1);

        if options.show_line_numbers {
            let gutter = format!(
                "{n:>width$}{}",
                options.line_number_separator,
                width = line_number_w
            );
            spans.push(Span::styled(gutter, styles.gutter));
        }

        for token in tokens {
            let mut token = token.clone();
            token.style = styles.base.patch(token.style);
            spans.push(token);
        }

        let w: usize = spans
            .iter()
            .map(|s| UnicodeWidthStr::width(s.content.as_ref()))
            .sum();
        max_w = max_w.max(w as u32);

        let mut line = Line::from(spans);
        if options.highlighted_lines.contains(&n) {
            line = line.style(styles.highlight);
        }
        out.push(line);
    }

    RenderedCode {
        content_width: max_w,
        content_height: out.len() as u32,
        lines: out,
    }
}

fn digits(mut n: usize) -> usize {
    if n == 0 {
        return 1;
    }
    let mut d = 0;
    while n > 0 {
        n /= 10;
        d += 1;
    }
    d
}
