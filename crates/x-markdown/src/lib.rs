//! Streaming code highlighting and diagram coordination for Markdown front-ends.
//!
//! This is the umbrella crate. Enable backends with features:
//!
//! - `syntect`: the syntect highlighting backend
//! - `mermaid`: the diagram render queue and pan/zoom handle
//! - `crossterm`: conversion of crossterm mouse events into pointer events
pub use x_markdown_core::code_render;
pub use x_markdown_core::error;
pub use x_markdown_core::input;
pub use x_markdown_core::plain;
pub use x_markdown_core::text;
pub use x_markdown_core::throttle;
pub use x_markdown_core::zoom;

#[cfg(feature = "crossterm")]
pub use x_markdown_core::crossterm_input;

pub use x_markdown_syntax as syntax;
pub use x_markdown_syntax::HighlightOptions;
pub use x_markdown_syntax::StreamingHighlighter;

#[cfg(feature = "mermaid")]
pub use x_markdown_mermaid as mermaid;
