use std::collections::BTreeMap;

use x_markdown_core::zoom::ContainerId;

/// Options handed to the diagram engine before each render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    pub theme: String,
    pub security_level: String,
    pub suppress_error_rendering: bool,
    pub start_on_load: bool,
    /// Engine-specific overrides, passed through untouched.
    pub extra: BTreeMap<String, String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            security_level: "loose".to_string(),
            suppress_error_rendering: true,
            start_on_load: false,
            extra: BTreeMap::new(),
        }
    }
}

impl RenderConfig {
    pub fn with_theme(theme: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            ..Self::default()
        }
    }
}

/// The external diagram engine.
///
/// The coordinator never calls [`DiagramRenderer::configure`] or [`DiagramRenderer::render`]
/// concurrently. [`DiagramRenderer::validate`] runs outside the queue and may overlap a render.
pub trait DiagramRenderer {
    fn validate(&self, source: &str) -> bool;

    fn configure(&self, config: &RenderConfig);

    /// Renders `source` into `container`, returning the SVG markup.
    fn render(&self, render_id: &str, source: &str, container: ContainerId)
    -> Result<String, String>;
}
