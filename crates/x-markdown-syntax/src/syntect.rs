use std::sync::Arc;

use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Span;
use syntect::highlighting::FontStyle;
use syntect::highlighting::HighlightIterator;
use syntect::highlighting::HighlightState;
use syntect::highlighting::Highlighter;
use syntect::highlighting::Style as SynStyle;
use syntect::highlighting::Theme;
use syntect::highlighting::ThemeSet;
use syntect::parsing::ParseState;
use syntect::parsing::ScopeStack;
use syntect::parsing::SyntaxReference;
use syntect::parsing::SyntaxSet;
use x_markdown_core::error::HighlightError;
use x_markdown_core::text::HighlighterBackend;
use x_markdown_core::text::StreamTokenizer;
use x_markdown_core::text::ThemeColors;
use x_markdown_core::text::Token;
use x_markdown_core::text::is_plain_text;

/// Theme names commonly requested by markdown front-ends, mapped onto syntect's bundled themes.
const THEME_ALIASES: &[(&str, &str)] = &[
    ("slack-dark", "base16-ocean.dark"),
    ("vitesse-dark", "base16-ocean.dark"),
    ("github-dark", "base16-eighties.dark"),
    ("vitesse-light", "InspiredGitHub"),
    ("github-light", "InspiredGitHub"),
    ("solarized-dark", "Solarized (dark)"),
    ("solarized-light", "Solarized (light)"),
];

#[derive(Clone)]
pub struct SyntectBackend {
    syntax_set: Arc<SyntaxSet>,
    theme_set: Arc<ThemeSet>,
}

impl SyntectBackend {
    pub fn new() -> Self {
        Self::with_sets(SyntaxSet::load_defaults_newlines(), ThemeSet::load_defaults())
    }

    /// `syntax_set` must be built for lines that keep their trailing newline.
    pub fn with_sets(syntax_set: SyntaxSet, theme_set: ThemeSet) -> Self {
        Self {
            syntax_set: Arc::new(syntax_set),
            theme_set: Arc::new(theme_set),
        }
    }

    fn theme(&self, name: &str) -> Option<&Theme> {
        self.theme_set.themes.get(name).or_else(|| {
            THEME_ALIASES
                .iter()
                .find(|(alias, _)| *alias == name)
                .and_then(|(_, target)| self.theme_set.themes.get(*target))
        })
    }

    fn syntax_for(&self, language: &str) -> Option<&SyntaxReference> {
        if is_plain_text(language) {
            return Some(self.syntax_set.find_syntax_plain_text());
        }
        self.syntax_set
            .find_syntax_by_extension(language)
            .or_else(|| self.syntax_set.find_syntax_by_token(language))
    }
}

impl Default for SyntectBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlighterBackend for SyntectBackend {
    fn load_language(&self, language: &str) -> Result<(), HighlightError> {
        self.syntax_for(language)
            .map(|_| ())
            .ok_or_else(|| HighlightError::UnsupportedLanguage(language.to_string()))
    }

    fn theme_colors(&self, theme: &str) -> Result<ThemeColors, HighlightError> {
        let theme = self
            .theme(theme)
            .ok_or_else(|| HighlightError::Load(format!("theme not found: {theme}")))?;
        Ok(ThemeColors {
            background: theme.settings.background.map(syn_color_to_ratatui),
            foreground: theme.settings.foreground.map(syn_color_to_ratatui),
        })
    }

    fn tokenizer(
        &self,
        language: &str,
        theme: &str,
    ) -> Result<Box<dyn StreamTokenizer + Send>, HighlightError> {
        let syntax = self
            .syntax_for(language)
            .ok_or_else(|| HighlightError::UnsupportedLanguage(language.to_string()))?
            .clone();
        let theme = self
            .theme(theme)
            .ok_or_else(|| HighlightError::Load(format!("theme not found: {theme}")))?
            .clone();
        Ok(Box::new(SyntectStreamTokenizer::new(
            Arc::clone(&self.syntax_set),
            syntax,
            theme,
        )))
    }
}

/// Line-granular streaming tokenizer.
///
/// Complete lines are highlighted once and become stable; parser state is carried across them.
/// The unterminated tail is re-highlighted from a copy of that state on every enqueue.
pub struct SyntectStreamTokenizer {
    syntax_set: Arc<SyntaxSet>,
    syntax: SyntaxReference,
    theme: Theme,
    parse_state: ParseState,
    highlight_state: HighlightState,
    pending: String,
    stable: Vec<Token>,
    unstable: Vec<Token>,
}

impl SyntectStreamTokenizer {
    pub fn new(syntax_set: Arc<SyntaxSet>, syntax: SyntaxReference, theme: Theme) -> Self {
        let parse_state = ParseState::new(&syntax);
        let highlight_state = HighlightState::new(&Highlighter::new(&theme), ScopeStack::new());
        Self {
            syntax_set,
            syntax,
            theme,
            parse_state,
            highlight_state,
            pending: String::new(),
            stable: Vec::new(),
            unstable: Vec::new(),
        }
    }
}

impl StreamTokenizer for SyntectStreamTokenizer {
    fn enqueue(&mut self, chunk: &str) -> Result<(), HighlightError> {
        self.pending.push_str(chunk);
        let highlighter = Highlighter::new(&self.theme);

        while let Some(idx) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=idx).collect();
            let tokens = highlight_line(
                &mut self.parse_state,
                &mut self.highlight_state,
                &highlighter,
                &self.syntax_set,
                &line,
            )?;
            self.stable.extend(tokens);
        }

        self.unstable = if self.pending.is_empty() {
            Vec::new()
        } else {
            highlight_line(
                &mut self.parse_state.clone(),
                &mut self.highlight_state.clone(),
                &highlighter,
                &self.syntax_set,
                &self.pending,
            )?
        };
        Ok(())
    }

    fn stable_tokens(&self) -> &[Token] {
        &self.stable
    }

    fn unstable_tokens(&self) -> &[Token] {
        &self.unstable
    }

    fn clear(&mut self) {
        self.parse_state = ParseState::new(&self.syntax);
        self.highlight_state =
            HighlightState::new(&Highlighter::new(&self.theme), ScopeStack::new());
        self.pending.clear();
        self.stable.clear();
        self.unstable.clear();
    }
}

fn highlight_line(
    parse_state: &mut ParseState,
    highlight_state: &mut HighlightState,
    highlighter: &Highlighter<'_>,
    syntax_set: &SyntaxSet,
    line: &str,
) -> Result<Vec<Token>, HighlightError> {
    let ops = parse_state
        .parse_line(line, syntax_set)
        .map_err(|e| HighlightError::Tokenize(e.to_string()))?;
    let out = HighlightIterator::new(highlight_state, &ops, line, highlighter)
        .filter(|(_, s)| !s.is_empty())
        .map(|(style, s)| Span::styled(s.to_string(), syn_style_to_ratatui(style)))
        .collect();
    Ok(out)
}

fn syn_color_to_ratatui(c: syntect::highlighting::Color) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

fn syn_style_to_ratatui(s: SynStyle) -> Style {
    let mut out = Style::default().fg(syn_color_to_ratatui(s.foreground));

    if s.font_style.contains(FontStyle::BOLD) {
        out = out.add_modifier(Modifier::BOLD);
    }
    if s.font_style.contains(FontStyle::ITALIC) {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if s.font_style.contains(FontStyle::UNDERLINE) {
        out = out.add_modifier(Modifier::UNDERLINED);
    }

    out
}
