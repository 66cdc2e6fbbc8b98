//! Mermaid diagram support for `x-markdown`.
//!
//! Diagram engines are usually not safe to invoke concurrently, so every render goes through a
//! [`coordinator::RenderCoordinator`]: one FIFO queue, one render in flight, and per-source
//! coalescing so a diagram that is still streaming in does not flood the queue with stale
//! intermediate renders.
//!
//! [`diagram::MermaidDiagram`] is the per-instance handle most apps want: it owns the source
//! registration, tracks the latest render result, and carries the pan/zoom state for the
//! rendered image.
pub mod coordinator;
pub mod diagram;
pub mod error;
pub mod renderer;

pub use coordinator::RenderCoordinator;
pub use diagram::MermaidDiagram;
pub use error::RenderError;
pub use renderer::DiagramRenderer;
pub use renderer::RenderConfig;
