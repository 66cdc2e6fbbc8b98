use thiserror::Error;

/// Failures surfaced by highlighter backends and streaming tokenizers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HighlightError {
    /// A required capability (backend, theme) is unavailable. Fatal for the current session.
    #[error("failed to load highlighter support: {0}")]
    Load(String),
    /// The requested language is not available; callers degrade to plain text.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    /// Tokenizing a chunk failed.
    #[error("tokenization failed: {0}")]
    Tokenize(String),
}
