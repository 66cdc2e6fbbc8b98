use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use x_markdown_core::input::PointerEvent;
use x_markdown_core::zoom::ContainerId;
use x_markdown_core::zoom::FullscreenHost;
use x_markdown_core::zoom::VisualSurface;
use x_markdown_core::zoom::ZoomOptions;
use x_markdown_core::zoom::ZoomPan;

use crate::coordinator::JobId;
use crate::coordinator::JobState;
use crate::coordinator::RenderCoordinator;
use crate::coordinator::RenderRequest;
use crate::coordinator::RenderStatus;
use crate::coordinator::RequestStatus;
use crate::coordinator::SourceId;
use crate::error::RenderError;
use crate::renderer::RenderConfig;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MermaidOptions {
    /// Render id prefix. Falls back to the coordinator's.
    pub id: Option<String>,
    /// Engine theme. Empty means `"default"`.
    pub theme: String,
    /// Engine-specific overrides.
    pub config: BTreeMap<String, String>,
    pub zoom: ZoomOptions,
}

impl MermaidOptions {
    pub fn render_config(&self) -> RenderConfig {
        let mut config = RenderConfig {
            extra: self.config.clone(),
            ..RenderConfig::default()
        };
        if !self.theme.is_empty() {
            config.theme = self.theme.clone();
        }
        config
    }
}

/// One diagram on screen: its source text, latest render, and pan/zoom state.
///
/// Dropping the handle unregisters it, so late results for it are discarded.
pub struct MermaidDiagram {
    coordinator: RenderCoordinator,
    source: SourceId,
    options: MermaidOptions,
    target: Option<ContainerId>,
    content: String,
    requested: Option<(ContainerId, String, RenderConfig)>,
    seen_revision: u64,
    status: RenderStatus,
    zoom: ZoomPan,
}

impl MermaidDiagram {
    pub fn new(coordinator: RenderCoordinator, options: MermaidOptions) -> Self {
        let source = coordinator.register();
        let zoom = ZoomPan::with_options(options.zoom.clone());
        Self {
            coordinator,
            source,
            options,
            target: None,
            content: String::new(),
            requested: None,
            seen_revision: 0,
            status: RenderStatus::default(),
            zoom,
        }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn options(&self) -> &MermaidOptions {
        &self.options
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Where the engine should render. Content set before a target exists is submitted here.
    ///
    /// The setters below return `None` when nothing was submitted: no target yet, or the
    /// content and config match the last submission.
    pub fn set_render_target(
        &mut self,
        target: ContainerId,
        now: Instant,
    ) -> Option<RequestStatus> {
        self.target = Some(target);
        self.request(now)
    }

    /// Replaces the diagram source, typically with the next prefix of a streamed block.
    pub fn set_content(
        &mut self,
        content: impl Into<String>,
        now: Instant,
    ) -> Option<RequestStatus> {
        self.content = content.into();
        self.request(now)
    }

    pub fn set_options(&mut self, options: MermaidOptions, now: Instant) -> Option<RequestStatus> {
        if self.options.zoom != options.zoom {
            self.zoom = ZoomPan::with_options(options.zoom.clone());
        }
        self.options = options;
        self.request(now)
    }

    /// Drives the shared queue and picks up this diagram's latest result.
    ///
    /// Returns `true` when the image or error changed.
    pub fn pump(&mut self, now: Instant) -> bool {
        self.coordinator.pump(now);
        self.refresh()
    }

    /// Re-reads this diagram's status without driving the queue.
    ///
    /// A new image detaches the pan/zoom surface; attach the fresh one with
    /// [`MermaidDiagram::attach_surface`].
    pub fn refresh(&mut self) -> bool {
        let Some(status) = self.coordinator.status(self.source) else {
            return false;
        };
        let changed = status.revision != self.seen_revision;
        if changed && status.image != self.status.image {
            self.zoom.replace_surface(None);
        }
        self.seen_revision = status.revision;
        self.status = status;
        changed
    }

    pub fn image(&self) -> Option<Arc<str>> {
        self.status.image.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.status.loading
    }

    pub fn error(&self) -> Option<&RenderError> {
        self.status.error.as_ref()
    }

    pub fn last_job(&self) -> Option<&(JobId, JobState)> {
        self.status.last_job.as_ref()
    }

    /// Binds pan/zoom to the surface showing the current image.
    pub fn attach_surface(
        &mut self,
        container: ContainerId,
        surface: Box<dyn VisualSurface + Send>,
    ) {
        self.zoom.replace_surface(Some(surface));
        self.zoom.initialize(container);
    }

    pub fn zoom(&self) -> &ZoomPan {
        &self.zoom
    }

    pub fn zoom_mut(&mut self) -> &mut ZoomPan {
        &mut self.zoom
    }

    pub fn handle_event(&mut self, event: &PointerEvent) -> bool {
        self.zoom.handle_event(event)
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        self.zoom.tick(now)
    }

    pub fn zoom_in(&mut self) {
        self.zoom.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.zoom.zoom_out();
    }

    pub fn reset_zoom(&mut self) {
        self.zoom.reset();
    }

    pub fn toggle_fullscreen(&self, host: &mut dyn FullscreenHost) {
        self.zoom.fullscreen(host);
    }

    /// Earliest instant at which [`MermaidDiagram::pump`] or [`MermaidDiagram::tick`] has work.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.coordinator.next_deadline(), self.zoom.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Unregisters from the coordinator and tears down pan/zoom. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        self.coordinator.unregister(self.source);
        self.zoom.destroy();
    }

    fn request(&mut self, now: Instant) -> Option<RequestStatus> {
        let Some(target) = self.target else {
            tracing::debug!(source = ?self.source, "no render target yet");
            return None;
        };
        let config = self.options.render_config();
        let key = (target, self.content.clone(), config.clone());
        if self.requested.as_ref() == Some(&key) {
            return None;
        }
        self.requested = Some(key);

        let mut request = RenderRequest::new(self.content.clone(), target).config(config);
        if let Some(id) = &self.options.id {
            request = request.id_prefix(id.clone());
        }
        let status = self.coordinator.request_render(self.source, request, now);
        self.refresh();
        Some(status)
    }
}

impl Drop for MermaidDiagram {
    fn drop(&mut self) {
        self.dispose();
    }
}
