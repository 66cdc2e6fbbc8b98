//! `x-markdown-core` provides the small, runtime-agnostic building blocks shared by the
//! `x-markdown` crates.
//!
//! Heavier functionality (syntect highlighting, diagram render coordination) lives in separate
//! crates that depend on this one.
//!
//! ## Design goals
//!
//! - Event-loop agnostic: you drive input, time, and rendering from your app.
//! - No async runtime: state machines are plain structs mutated on the caller's thread.
//! - Backends are trait objects: highlighters and renderers are injected by the caller.
//!
//! Useful entry points:
//! - [`text::tokens_to_lines`]: partition a flat token stream into renderable rows.
//! - [`text::HighlighterBackend`] / [`text::StreamTokenizer`]: the incremental tokenizer seam.
//! - [`plain::PlainTextBackend`]: always-available fallback backend.
//! - [`zoom::ZoomPan`]: pan/zoom/fullscreen interaction state for a rendered diagram.
//! - [`code_render::render_token_lines`]: render core for highlighted code blocks.
pub mod error;

pub mod text;

pub mod plain;

#[cfg(feature = "crossterm")]
pub mod crossterm_input;

pub mod input;
pub mod throttle;
pub mod zoom;

pub mod code_render;
