use std::collections::HashMap;

use ratatui::style::Color;
use ratatui::style::Style;
use ratatui::text::Span;

use crate::error::HighlightError;

/// A contiguous run of source text tagged with the style the backend assigned to it.
pub type Token = Span<'static>;

/// One renderable row of tokens. Never contains newline characters.
pub type TokenLine = Vec<Token>;

/// Language id used when the requested language cannot be loaded.
pub const PLAIN_TEXT: &str = "plaintext";

pub fn is_plain_text(language: &str) -> bool {
    matches!(
        language.to_ascii_lowercase().as_str(),
        "plaintext" | "text" | "txt" | "plain"
    )
}

/// Container colours advertised by a highlighting theme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThemeColors {
    pub background: Option<Color>,
    pub foreground: Option<Color>,
}

impl ThemeColors {
    /// Style for the element wrapping the highlighted lines, or `None` when the theme has no
    /// container colours.
    pub fn pre_style(&self) -> Option<Style> {
        if self.background.is_none() && self.foreground.is_none() {
            return None;
        }
        let mut style = Style::default();
        if let Some(bg) = self.background {
            style = style.bg(bg);
        }
        if let Some(fg) = self.foreground {
            style = style.fg(fg);
        }
        Some(style)
    }
}

/// Theme colour overrides: every token or container colour equal to a key is swapped for its
/// value.
pub type ColorReplacements = HashMap<Color, Color>;

pub fn replace_style_colors(style: Style, replacements: &ColorReplacements) -> Style {
    let swap = |c: Option<Color>| c.map(|c| replacements.get(&c).copied().unwrap_or(c));
    Style {
        fg: swap(style.fg),
        bg: swap(style.bg),
        ..style
    }
}

pub fn apply_color_replacements(lines: &mut [TokenLine], replacements: &ColorReplacements) {
    if replacements.is_empty() {
        return;
    }
    for token in lines.iter_mut().flatten() {
        token.style = replace_style_colors(token.style, replacements);
    }
}

/// An incremental tokenizer fed with successive chunks of one growing text.
///
/// Stable tokens are final. Unstable tokens cover the input whose styling may still change once
/// more text arrives (typically the trailing, unterminated line) and are replaced on every
/// [`StreamTokenizer::enqueue`].
pub trait StreamTokenizer {
    fn enqueue(&mut self, chunk: &str) -> Result<(), HighlightError>;

    fn stable_tokens(&self) -> &[Token];

    fn unstable_tokens(&self) -> &[Token];

    /// Drops all internal state, as if nothing had been enqueued.
    fn clear(&mut self);

    fn merged_tokens(&self) -> Vec<Token> {
        let stable = self.stable_tokens();
        let unstable = self.unstable_tokens();
        let mut out = Vec::with_capacity(stable.len() + unstable.len());
        out.extend_from_slice(stable);
        out.extend_from_slice(unstable);
        out
    }
}

/// The highlighting capability a streaming session is built on.
pub trait HighlighterBackend {
    /// Makes `language` available, or fails with [`HighlightError::UnsupportedLanguage`].
    fn load_language(&self, language: &str) -> Result<(), HighlightError>;

    /// Resolves theme metadata. Unknown themes fail with [`HighlightError::Load`].
    fn theme_colors(&self, theme: &str) -> Result<ThemeColors, HighlightError>;

    fn tokenizer(
        &self,
        language: &str,
        theme: &str,
    ) -> Result<Box<dyn StreamTokenizer + Send>, HighlightError>;
}

/// Partitions a flat token sequence into lines.
///
/// - A token that is exactly `"\n"` ends the current line and is dropped.
/// - A token with embedded newlines is split; empty pieces are dropped and each newline starts
///   a new line. Pieces keep the token's style.
/// - An empty input yields exactly one empty line.
pub fn tokens_to_lines(tokens: &[Token]) -> Vec<TokenLine> {
    let mut lines: Vec<TokenLine> = Vec::new();
    let mut current: TokenLine = Vec::new();

    for token in tokens {
        let content = token.content.as_ref();

        if content == "\n" {
            lines.push(std::mem::take(&mut current));
            continue;
        }

        if !content.contains('\n') {
            current.push(token.clone());
            continue;
        }

        let mut segments = content.split('\n').peekable();
        while let Some(segment) = segments.next() {
            if !segment.is_empty() {
                current.push(Span::styled(segment.to_string(), token.style));
            }
            if segments.peek().is_some() {
                lines.push(std::mem::take(&mut current));
            }
        }
    }

    lines.push(current);
    lines
}

/// Joins lines back into text, one `'\n'` between rows.
pub fn lines_to_text(lines: &[TokenLine]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for token in line {
            out.push_str(token.content.as_ref());
        }
    }
    out
}
