use std::fmt;
use std::sync::Arc;

use ratatui::style::Style;
use x_markdown_core::error::HighlightError;
use x_markdown_core::text::ColorReplacements;
use x_markdown_core::text::HighlighterBackend;
use x_markdown_core::text::PLAIN_TEXT;
use x_markdown_core::text::StreamTokenizer;
use x_markdown_core::text::TokenLine;
use x_markdown_core::text::apply_color_replacements;
use x_markdown_core::text::is_plain_text;
use x_markdown_core::text::replace_style_colors;
use x_markdown_core::text::tokens_to_lines;

pub const DEFAULT_LANGUAGE: &str = "text";
pub const DEFAULT_THEME: &str = "slack-dark";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HighlightOptions {
    /// Requested language id. Empty means [`DEFAULT_LANGUAGE`].
    pub language: String,
    /// Requested theme name. Empty means [`DEFAULT_THEME`].
    pub theme: String,
    /// Applied to token colours and the pre style.
    pub color_replacements: ColorReplacements,
}

impl HighlightOptions {
    pub fn new(language: impl Into<String>, theme: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            theme: theme.into(),
            color_replacements: ColorReplacements::new(),
        }
    }

    pub fn color_replacements(mut self, replacements: ColorReplacements) -> Self {
        self.color_replacements = replacements;
        self
    }

    pub fn effective_language(&self) -> &str {
        if self.language.is_empty() {
            DEFAULT_LANGUAGE
        } else {
            &self.language
        }
    }

    pub fn effective_theme(&self) -> &str {
        if self.theme.is_empty() {
            DEFAULT_THEME
        } else {
            &self.theme
        }
    }
}

/// Which language the session is actually tokenizing with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LanguageMode {
    Normal { language: String },
    /// The requested language failed to load; the session runs on plain text.
    Degraded { requested: String },
    /// A retry for `requested` is rebuilding the session.
    Recovering { requested: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No session (disposed, or loading failed).
    Inactive,
    /// Nothing new to tokenize; the previous lines were kept.
    Skipped,
    /// Only the appended suffix was tokenized.
    Incremental,
    /// The session was cleared and the full text re-tokenized.
    Reset,
    /// Tokenizing failed; the previous lines were kept and the next update starts over.
    Retained,
    /// A previously unavailable language loaded and the session was rebuilt with it.
    LanguageRecovered { language: String },
}

/// Immutable view of the latest highlight result.
///
/// `lines` is shared with the highlighter until the next change, so consumers can cache
/// rendered output keyed by [`Arc::ptr_eq`] or [`HighlightSnapshot::revision`].
#[derive(Clone, Debug)]
pub struct HighlightSnapshot {
    pub lines: Arc<Vec<TokenLine>>,
    pub pre_style: Option<Style>,
    /// The replacements already applied to `lines` and `pre_style`.
    pub color_replacements: ColorReplacements,
    pub revision: u64,
}

struct HighlightSession {
    language: String,
    theme: String,
    tokenizer: Box<dyn StreamTokenizer + Send>,
    committed: String,
    needs_reset: bool,
}

/// Incrementally highlights one growing text (typically a code block being streamed in).
///
/// The session tokenizes only what was appended since the previous [`StreamingHighlighter::update`];
/// anything else (an edit, a language or theme change) rebuilds from scratch.
pub struct StreamingHighlighter {
    backend: Arc<dyn HighlighterBackend + Send + Sync>,
    options: HighlightOptions,
    mode: LanguageMode,
    session: Option<HighlightSession>,
    text: String,
    lines: Arc<Vec<TokenLine>>,
    pre_style: Option<Style>,
    revision: u64,
    is_loading: bool,
    error: Option<HighlightError>,
    disposed: bool,
}

impl fmt::Debug for StreamingHighlighter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingHighlighter")
            .field("options", &self.options)
            .field("mode", &self.mode)
            .field("committed", &self.committed_text())
            .field("lines", &self.lines.len())
            .field("revision", &self.revision)
            .field("error", &self.error)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl StreamingHighlighter {
    /// Creates a session over `text` and tokenizes it in full.
    ///
    /// A missing theme or backend failure is reported through [`StreamingHighlighter::error`];
    /// an unsupported language silently degrades to plain text.
    pub fn attach(
        backend: Arc<dyn HighlighterBackend + Send + Sync>,
        text: impl Into<String>,
        options: HighlightOptions,
    ) -> Self {
        let language = options.effective_language().to_string();
        let mut this = Self {
            backend,
            options,
            mode: LanguageMode::Normal { language },
            session: None,
            text: text.into(),
            lines: Arc::new(vec![Vec::new()]),
            pre_style: None,
            revision: 0,
            is_loading: false,
            error: None,
            disposed: false,
        };
        this.init();
        this
    }

    pub fn options(&self) -> &HighlightOptions {
        &self.options
    }

    pub fn lines(&self) -> &[TokenLine] {
        &self.lines
    }

    pub fn snapshot(&self) -> HighlightSnapshot {
        HighlightSnapshot {
            lines: Arc::clone(&self.lines),
            pre_style: self.pre_style,
            color_replacements: self.options.color_replacements.clone(),
            revision: self.revision,
        }
    }

    pub fn pre_style(&self) -> Option<Style> {
        self.pre_style
    }

    /// Bumped every time `lines` changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&HighlightError> {
        self.error.as_ref()
    }

    pub fn mode(&self) -> &LanguageMode {
        &self.mode
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.mode, LanguageMode::Degraded { .. })
    }

    /// The language the tokenizer actually runs with, if a session exists.
    pub fn effective_language(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.language.as_str())
    }

    pub fn requested_language(&self) -> &str {
        self.options.effective_language()
    }

    pub fn theme(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.theme.as_str())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The prefix of [`StreamingHighlighter::text`] already fed to the tokenizer.
    pub fn committed_text(&self) -> &str {
        self.session
            .as_ref()
            .map(|s| s.committed.as_str())
            .unwrap_or("")
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Brings the highlight up to date with `text`.
    pub fn update(&mut self, text: &str) -> UpdateOutcome {
        if self.disposed {
            return UpdateOutcome::Inactive;
        }
        if self.text != text {
            self.text.clear();
            self.text.push_str(text);
        }
        if let Some(outcome) = self.retry_requested_language() {
            return outcome;
        }
        let text = std::mem::take(&mut self.text);
        let outcome = self.update_tokens(&text, false);
        self.text = text;
        outcome
    }

    /// Applies a new language tag, e.g. once a streamed fence's info string is complete.
    pub fn set_language(&mut self, language: impl Into<String>) -> UpdateOutcome {
        if self.disposed {
            return UpdateOutcome::Inactive;
        }
        let language = language.into();
        if language == self.options.language {
            return UpdateOutcome::Skipped;
        }
        self.options.language = language;

        if self.is_fallback() {
            let requested = self.options.effective_language().to_string();
            if !is_plain_text(&requested) {
                self.mode = LanguageMode::Degraded { requested };
                return self
                    .retry_requested_language()
                    .unwrap_or(UpdateOutcome::Skipped);
            }
        }

        self.reinit()
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) -> UpdateOutcome {
        let theme = theme.into();
        if theme == self.options.theme {
            return UpdateOutcome::Skipped;
        }
        let language = self.options.language.clone();
        self.change_language_or_theme(language, theme)
    }

    /// Replacements apply to already highlighted lines too, so a change rebuilds the session.
    pub fn set_color_replacements(&mut self, replacements: ColorReplacements) -> UpdateOutcome {
        if self.disposed {
            return UpdateOutcome::Inactive;
        }
        if replacements == self.options.color_replacements {
            return UpdateOutcome::Skipped;
        }
        self.options.color_replacements = replacements;
        self.reinit()
    }

    /// Tears down the session and rebuilds it over the current full text.
    pub fn change_language_or_theme(
        &mut self,
        language: impl Into<String>,
        theme: impl Into<String>,
    ) -> UpdateOutcome {
        if self.disposed {
            return UpdateOutcome::Inactive;
        }
        self.options.language = language.into();
        self.options.theme = theme.into();
        self.reinit()
    }

    /// Releases the tokenizer. Further calls are no-ops.
    pub fn dispose(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.tokenizer.clear();
            tracing::debug!(language = %session.language, "disposed highlight session");
        }
        self.disposed = true;
    }

    fn reinit(&mut self) -> UpdateOutcome {
        if self.init() {
            UpdateOutcome::Reset
        } else {
            UpdateOutcome::Inactive
        }
    }

    fn init(&mut self) -> bool {
        self.is_loading = true;
        self.error = None;
        if let Some(mut old) = self.session.take() {
            old.tokenizer.clear();
        }

        let language = self.options.effective_language().to_string();
        let theme = self.options.effective_theme().to_string();
        let ok = match self.build_session(&language, &theme) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(%language, %theme, error = %err, "streaming highlighter initialization failed");
                self.error = Some(err);
                false
            }
        };

        self.is_loading = false;
        ok
    }

    fn build_session(&mut self, language: &str, theme: &str) -> Result<(), HighlightError> {
        let colors = self.backend.theme_colors(theme)?;

        let effective = match self.backend.load_language(language) {
            Ok(()) => {
                self.mode = LanguageMode::Normal {
                    language: language.to_string(),
                };
                language.to_string()
            }
            Err(HighlightError::UnsupportedLanguage(_)) => {
                tracing::warn!(%language, "language unavailable, falling back to plain text");
                self.mode = LanguageMode::Degraded {
                    requested: language.to_string(),
                };
                PLAIN_TEXT.to_string()
            }
            Err(err) => return Err(err),
        };

        let tokenizer = self.backend.tokenizer(&effective, theme)?;
        tracing::debug!(language = %effective, %theme, "built highlight session");

        self.session = Some(HighlightSession {
            language: effective,
            theme: theme.to_string(),
            tokenizer,
            committed: String::new(),
            needs_reset: false,
        });
        self.pre_style = colors
            .pre_style()
            .map(|style| replace_style_colors(style, &self.options.color_replacements));

        let text = std::mem::take(&mut self.text);
        if text.is_empty() {
            self.set_lines(vec![Vec::new()]);
        } else {
            self.update_tokens(&text, true);
        }
        self.text = text;
        Ok(())
    }

    /// While degraded, tries the requested language again. `None` means nothing changed and the
    /// caller should carry on with the plain-text session.
    fn retry_requested_language(&mut self) -> Option<UpdateOutcome> {
        let LanguageMode::Degraded { requested } = &self.mode else {
            return None;
        };
        if is_plain_text(requested) {
            return None;
        }
        let requested = requested.clone();
        self.mode = LanguageMode::Recovering {
            requested: requested.clone(),
        };

        match self.backend.load_language(&requested) {
            Ok(()) => {
                tracing::debug!(language = %requested, "language now available, re-highlighting");
                if !self.init() {
                    return Some(UpdateOutcome::Inactive);
                }
                match &self.mode {
                    LanguageMode::Normal { language } => Some(UpdateOutcome::LanguageRecovered {
                        language: language.clone(),
                    }),
                    _ => Some(UpdateOutcome::Reset),
                }
            }
            Err(_) => {
                self.mode = LanguageMode::Degraded { requested };
                None
            }
        }
    }

    fn update_tokens(&mut self, next: &str, force_reset: bool) -> UpdateOutcome {
        let Some(session) = self.session.as_mut() else {
            return UpdateOutcome::Inactive;
        };

        let force_reset = force_reset || session.needs_reset;
        if force_reset {
            session.tokenizer.clear();
            session.committed.clear();
            session.needs_reset = false;
        }

        let can_append = !force_reset && next.starts_with(session.committed.as_str());
        let (chunk, outcome) = if can_append {
            (&next[session.committed.len()..], UpdateOutcome::Incremental)
        } else {
            if !force_reset {
                session.tokenizer.clear();
            }
            (next, UpdateOutcome::Reset)
        };

        session.committed.clear();
        session.committed.push_str(next);

        if chunk.is_empty() {
            if outcome == UpdateOutcome::Incremental {
                tracing::trace!("no new text, reusing previous highlight");
                return UpdateOutcome::Skipped;
            }
            let lines = tokens_to_lines(&session.tokenizer.merged_tokens());
            self.set_lines(lines);
            return outcome;
        }

        match session.tokenizer.enqueue(chunk) {
            Ok(()) => {
                let lines = tokens_to_lines(&session.tokenizer.merged_tokens());
                self.set_lines(lines);
                outcome
            }
            Err(err) => {
                tracing::warn!(error = %err, "streaming highlighting failed, keeping previous lines");
                session.needs_reset = true;
                UpdateOutcome::Retained
            }
        }
    }

    fn set_lines(&mut self, mut lines: Vec<TokenLine>) {
        apply_color_replacements(&mut lines, &self.options.color_replacements);
        self.lines = Arc::new(lines);
        self.revision = self.revision.wrapping_add(1);
    }
}

impl Drop for StreamingHighlighter {
    fn drop(&mut self) {
        self.dispose();
    }
}
