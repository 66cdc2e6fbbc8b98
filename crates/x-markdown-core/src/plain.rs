use ratatui::text::Span;

use crate::error::HighlightError;
use crate::text::HighlighterBackend;
use crate::text::StreamTokenizer;
use crate::text::ThemeColors;
use crate::text::Token;
use crate::text::is_plain_text;

/// Backend that only knows plain text. Every theme resolves, with no container colours.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextBackend;

impl HighlighterBackend for PlainTextBackend {
    fn load_language(&self, language: &str) -> Result<(), HighlightError> {
        if is_plain_text(language) {
            Ok(())
        } else {
            Err(HighlightError::UnsupportedLanguage(language.to_string()))
        }
    }

    fn theme_colors(&self, _theme: &str) -> Result<ThemeColors, HighlightError> {
        Ok(ThemeColors::default())
    }

    fn tokenizer(
        &self,
        language: &str,
        _theme: &str,
    ) -> Result<Box<dyn StreamTokenizer + Send>, HighlightError> {
        self.load_language(language)?;
        Ok(Box::new(PlainTokenizer::default()))
    }
}

/// Unstyled tokenizer: each complete line (newline included) is one stable token, the trailing
/// partial line is the single unstable token.
#[derive(Clone, Debug, Default)]
pub struct PlainTokenizer {
    pending: String,
    stable: Vec<Token>,
    unstable: Vec<Token>,
}

impl StreamTokenizer for PlainTokenizer {
    fn enqueue(&mut self, chunk: &str) -> Result<(), HighlightError> {
        self.pending.push_str(chunk);
        while let Some(idx) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=idx).collect();
            self.stable.push(Span::raw(line));
        }
        self.unstable.clear();
        if !self.pending.is_empty() {
            self.unstable.push(Span::raw(self.pending.clone()));
        }
        Ok(())
    }

    fn stable_tokens(&self) -> &[Token] {
        &self.stable
    }

    fn unstable_tokens(&self) -> &[Token] {
        &self.unstable
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.stable.clear();
        self.unstable.clear();
    }
}
