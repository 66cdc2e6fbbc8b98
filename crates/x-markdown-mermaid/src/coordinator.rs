use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::OnceLock;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use x_markdown_core::zoom::ContainerId;

use crate::error::RenderError;
use crate::renderer::DiagramRenderer;
use crate::renderer::RenderConfig;

pub const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(100);
pub const DEFAULT_ID_PREFIX: &str = "mermaid";

#[derive(Clone, Debug)]
pub struct CoordinatorOptions {
    /// How long a source's first pending request waits for newer text before it is queued.
    pub coalesce_window: Duration,
    /// Render id prefix for requests that don't carry their own.
    pub id_prefix: String,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            coalesce_window: DEFAULT_COALESCE_WINDOW,
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
        }
    }
}

/// A registered diagram instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed(RenderError),
    /// Skipped because its source asked for something newer before the job started.
    Superseded,
}

#[derive(Clone, Debug)]
pub struct RenderRequest {
    pub text: String,
    pub container: ContainerId,
    pub config: RenderConfig,
    pub id_prefix: Option<String>,
}

impl RenderRequest {
    pub fn new(text: impl Into<String>, container: ContainerId) -> Self {
        Self {
            text: text.into(),
            container,
            config: RenderConfig::default(),
            id_prefix: None,
        }
    }

    pub fn config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Some(prefix.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    /// Blank input: the source's image and error were cleared.
    Cleared,
    /// Failed the syntax check. Nothing was queued.
    Rejected(RenderError),
    /// Waiting for the coalescing window to close.
    Pending { due: Instant },
    UnknownSource,
}

/// What the coordinator knows about a source's latest output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderStatus {
    pub image: Option<Arc<str>>,
    pub error: Option<RenderError>,
    pub loading: bool,
    pub last_job: Option<(JobId, JobState)>,
    /// Bumped whenever `image` or `error` changes.
    pub revision: u64,
}

impl RenderStatus {
    fn set_output(&mut self, image: Option<Arc<str>>, error: Option<RenderError>) {
        if self.image != image || self.error != error {
            self.image = image;
            self.error = error;
            self.revision += 1;
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub enqueued: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub superseded: usize,
}

struct Pending {
    generation: u64,
    request: RenderRequest,
    due: Instant,
    /// Call order of the request that opened the window.
    seq: u64,
}

#[derive(Default)]
struct SourceEntry {
    generation: u64,
    pending: Option<Pending>,
    status: RenderStatus,
}

struct Job {
    id: JobId,
    source: SourceId,
    generation: u64,
    request: RenderRequest,
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<Job>,
    running: bool,
    next_job: u64,
    next_source: u64,
    next_seq: u64,
    sources: BTreeMap<SourceId, SourceEntry>,
    invocations: u64,
}

impl QueueState {
    fn enqueue_due(&mut self, now: Instant, report: &mut PumpReport) {
        let mut due: Vec<(Instant, u64, SourceId)> = self
            .sources
            .iter()
            .filter_map(|(id, entry)| {
                entry
                    .pending
                    .as_ref()
                    .filter(|p| p.due <= now)
                    .map(|p| (p.due, p.seq, *id))
            })
            .collect();
        due.sort();

        for (_, _, source) in due {
            let Some(entry) = self.sources.get_mut(&source) else {
                continue;
            };
            let Some(pending) = entry.pending.take() else {
                continue;
            };
            self.next_job += 1;
            let id = JobId(self.next_job);
            entry.status.last_job = Some((id, JobState::Queued));
            self.queue.push_back(Job {
                id,
                source,
                generation: pending.generation,
                request: pending.request,
            });
            report.enqueued += 1;
        }
    }

    /// Pops the next job whose source still wants it, marking it running.
    fn start_next(&mut self, report: &mut PumpReport) -> Option<Job> {
        while let Some(job) = self.queue.pop_front() {
            let Some(entry) = self.sources.get_mut(&job.source) else {
                report.superseded += 1;
                continue;
            };
            if entry.generation != job.generation {
                tracing::debug!(job = job.id.0, "skipping superseded render");
                if entry.status.last_job.as_ref().is_some_and(|(id, _)| *id == job.id) {
                    entry.status.last_job = Some((job.id, JobState::Superseded));
                }
                report.superseded += 1;
                continue;
            }
            entry.status.last_job = Some((job.id, JobState::Running));
            self.invocations += 1;
            return Some(job);
        }
        None
    }

    fn finish(&mut self, job: &Job, result: Result<String, String>, report: &mut PumpReport) {
        let state = match &result {
            Ok(_) => {
                report.succeeded += 1;
                JobState::Succeeded
            }
            Err(msg) => {
                report.failed += 1;
                JobState::Failed(RenderError::Failure(msg.clone()))
            }
        };

        let Some(entry) = self.sources.get_mut(&job.source) else {
            return;
        };
        if entry.status.last_job.as_ref().is_some_and(|(id, _)| *id == job.id) {
            entry.status.last_job = Some((job.id, state));
        }
        if entry.generation != job.generation {
            tracing::debug!(job = job.id.0, "discarding result of superseded render");
            return;
        }

        match result {
            Ok(svg) => entry.status.set_output(Some(svg.into()), None),
            Err(msg) => {
                tracing::warn!(job = job.id.0, error = %msg, "diagram render failed");
                entry.status.set_output(None, Some(RenderError::Failure(msg)));
            }
        }
        entry.status.loading = entry.pending.is_some();
    }
}

struct Shared {
    renderer: Arc<dyn DiagramRenderer + Send + Sync>,
    options: CoordinatorOptions,
    state: Mutex<QueueState>,
}

/// Serializes diagram renders across every registered source.
///
/// Requests are coalesced per source, queued FIFO, and executed one at a time from
/// [`RenderCoordinator::pump`]. The coordinator never spawns threads; whichever caller finds the
/// queue idle drains it, and concurrent callers return immediately.
#[derive(Clone)]
pub struct RenderCoordinator {
    shared: Arc<Shared>,
}

static GLOBAL: OnceLock<RenderCoordinator> = OnceLock::new();

impl RenderCoordinator {
    pub fn new(renderer: Arc<dyn DiagramRenderer + Send + Sync>) -> Self {
        Self::with_options(renderer, CoordinatorOptions::default())
    }

    pub fn with_options(
        renderer: Arc<dyn DiagramRenderer + Send + Sync>,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                renderer,
                options,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// The process-wide coordinator, built by `init` on first use.
    ///
    /// Later calls return the existing instance and never run `init`.
    pub fn global_or_init(init: impl FnOnce() -> RenderCoordinator) -> &'static RenderCoordinator {
        GLOBAL.get_or_init(init)
    }

    pub fn global() -> Option<&'static RenderCoordinator> {
        GLOBAL.get()
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.shared.options
    }

    pub fn register(&self) -> SourceId {
        let mut state = self.lock();
        state.next_source += 1;
        let id = SourceId(state.next_source);
        state.sources.insert(id, SourceEntry::default());
        id
    }

    /// Forgets `source`. Its queued jobs are skipped and an in-flight result is dropped.
    pub fn unregister(&self, source: SourceId) {
        self.lock().sources.remove(&source);
    }

    pub fn is_registered(&self, source: SourceId) -> bool {
        self.lock().sources.contains_key(&source)
    }

    /// Records `request` as the latest wanted output for `source`.
    ///
    /// Blank text clears the source. Text that fails [`DiagramRenderer::validate`] is rejected
    /// immediately and never reaches the queue. Anything else becomes the source's pending
    /// request; it is queued by the first [`RenderCoordinator::pump`] after the coalescing
    /// window that started with the source's oldest unqueued request.
    pub fn request_render(
        &self,
        source: SourceId,
        request: RenderRequest,
        now: Instant,
    ) -> RequestStatus {
        let trimmed = request.text.trim();
        let valid = trimmed.is_empty() || self.shared.renderer.validate(trimmed);

        let mut state = self.lock();
        state.next_seq += 1;
        let seq = state.next_seq;
        let Some(entry) = state.sources.get_mut(&source) else {
            tracing::warn!(?source, "render requested for unknown source");
            return RequestStatus::UnknownSource;
        };
        entry.generation += 1;

        if trimmed.is_empty() {
            entry.pending = None;
            entry.status.loading = false;
            entry.status.set_output(None, None);
            return RequestStatus::Cleared;
        }

        if !valid {
            let err = RenderError::Syntax("invalid diagram syntax".to_string());
            tracing::debug!(?source, "diagram failed syntax check");
            entry.pending = None;
            entry.status.loading = false;
            entry.status.set_output(None, Some(err.clone()));
            return RequestStatus::Rejected(err);
        }

        let (due, seq) = entry
            .pending
            .as_ref()
            .map_or((now + self.shared.options.coalesce_window, seq), |p| {
                (p.due, p.seq)
            });
        entry.pending = Some(Pending {
            generation: entry.generation,
            request,
            due,
            seq,
        });
        entry.status.loading = true;
        RequestStatus::Pending { due }
    }

    /// Queues every pending request whose window has closed, then drains the queue unless
    /// another caller already is.
    pub fn pump(&self, now: Instant) -> PumpReport {
        let mut report = PumpReport::default();
        {
            let mut state = self.lock();
            state.enqueue_due(now, &mut report);
            if state.running {
                return report;
            }
            state.running = true;
        }

        loop {
            let job = {
                let mut state = self.lock();
                match state.start_next(&mut report) {
                    Some(job) => job,
                    None => {
                        state.running = false;
                        break;
                    }
                }
            };
            let result = self.run(&job);
            self.lock().finish(&job, result, &mut report);
        }
        report
    }

    /// Earliest instant at which [`RenderCoordinator::pump`] has work to queue.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.lock()
            .sources
            .values()
            .filter_map(|entry| entry.pending.as_ref().map(|p| p.due))
            .min()
    }

    pub fn status(&self, source: SourceId) -> Option<RenderStatus> {
        self.lock()
            .sources
            .get(&source)
            .map(|entry| entry.status.clone())
    }

    pub fn queue_len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Number of renders started so far.
    pub fn render_count(&self) -> u64 {
        self.lock().invocations
    }

    fn run(&self, job: &Job) -> Result<String, String> {
        let prefix = job
            .request
            .id_prefix
            .as_deref()
            .unwrap_or(&self.shared.options.id_prefix);
        let render_id = format!("{prefix}-{}", job.id.0);
        let renderer = &self.shared.renderer;

        tracing::debug!(%render_id, "rendering diagram");
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            renderer.configure(&job.request.config);
            renderer.render(&render_id, &job.request.text, job.request.container)
        }));
        outcome.unwrap_or_else(|panic| {
            let msg = panic_message(panic.as_ref());
            tracing::error!(%render_id, error = %msg, "diagram renderer panicked");
            Err(msg)
        })
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "renderer panicked".to_string()
    }
}
