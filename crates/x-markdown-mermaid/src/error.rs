use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The source failed the renderer's syntax check. The request never reached the queue.
    #[error("Mermaid parse error: {0}")]
    Syntax(String),
    /// The renderer failed while rendering a queued job.
    #[error("Mermaid render error: {0}")]
    Failure(String),
}
