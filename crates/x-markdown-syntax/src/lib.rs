//! Streaming syntax highlighting for `x-markdown`.
//!
//! [`stream::StreamingHighlighter`] keeps one incremental tokenizer session per code block and
//! re-tokenizes only what was appended since the last update. Backends plug in through
//! [`x_markdown_core::text::HighlighterBackend`]:
//! - [`x_markdown_core::plain::PlainTextBackend`] (always available)
//! - `syntect` (feature: `syntect`)
//!
//! The facade crate `x-markdown` re-exports this crate, so most apps can just enable
//! `x-markdown/syntect`.
pub mod stream;

#[cfg(feature = "syntect")]
pub mod syntect;

pub use stream::HighlightOptions;
pub use stream::StreamingHighlighter;
