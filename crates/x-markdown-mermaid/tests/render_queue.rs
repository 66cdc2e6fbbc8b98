use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use rstest::rstest;
use x_markdown_core::zoom::ContainerId;
use x_markdown_mermaid::coordinator::CoordinatorOptions;
use x_markdown_mermaid::coordinator::JobState;
use x_markdown_mermaid::coordinator::RenderRequest;
use x_markdown_mermaid::coordinator::SourceId;
use x_markdown_mermaid::DiagramRenderer;
use x_markdown_mermaid::RenderConfig;
use x_markdown_mermaid::RenderCoordinator;

/// Records render order and the peak number of overlapping renders.
#[derive(Default)]
struct Tracking {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    order: Mutex<Vec<String>>,
    delay: Duration,
}

impl DiagramRenderer for Tracking {
    fn validate(&self, source: &str) -> bool {
        !source.contains("invalid")
    }

    fn configure(&self, _config: &RenderConfig) {
        assert!(self.in_flight.load(Ordering::SeqCst) == 0);
    }

    fn render(&self, _id: &str, source: &str, _c: ContainerId) -> Result<String, String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.order.lock().expect("lock").push(source.to_string());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(format!("<svg>{source}</svg>"))
    }
}

fn immediate(renderer: Arc<Tracking>) -> RenderCoordinator {
    RenderCoordinator::with_options(
        renderer,
        CoordinatorOptions {
            coalesce_window: Duration::ZERO,
            ..CoordinatorOptions::default()
        },
    )
}

#[test]
fn renders_never_overlap_across_threads() {
    let renderer = Arc::new(Tracking {
        delay: Duration::from_millis(2),
        ..Tracking::default()
    });
    let coord = immediate(renderer.clone());

    thread::scope(|s| {
        for t in 0..8 {
            let coord = coord.clone();
            s.spawn(move || {
                let source = coord.register();
                for i in 0..5 {
                    let now = Instant::now();
                    coord.request_render(
                        source,
                        RenderRequest::new(format!("graph TD; t{t}-{i}"), ContainerId(t)),
                        now,
                    );
                    coord.pump(now);
                }
            });
        }
    });

    assert_eq!(renderer.peak.load(Ordering::SeqCst), 1);
    assert!(!coord.is_running());
    assert_eq!(coord.queue_len(), 0);
    // Every thread's final text was rendered.
    let order = renderer.order.lock().expect("lock").clone();
    for t in 0..8 {
        assert!(order.contains(&format!("graph TD; t{t}-4")), "missing t{t}");
    }
}

#[test]
fn sources_are_served_in_request_order() {
    let renderer = Arc::new(Tracking::default());
    let coord = RenderCoordinator::new(renderer.clone());
    let sources: Vec<SourceId> = (0..3).map(|_| coord.register()).collect();
    let t0 = Instant::now();

    // Equal deadlines keep call order; earlier windows go first.
    coord.request_render(sources[2], RenderRequest::new("graph c", ContainerId(2)), t0);
    coord.request_render(sources[0], RenderRequest::new("graph a", ContainerId(0)), t0);
    coord.request_render(
        sources[1],
        RenderRequest::new("graph b", ContainerId(1)),
        t0 + Duration::from_millis(10),
    );

    let report = coord.pump(t0 + Duration::from_secs(1));
    assert_eq!(report.enqueued, 3);
    assert_eq!(
        renderer.order.lock().expect("lock").clone(),
        vec!["graph c", "graph a", "graph b"]
    );
}

#[rstest]
#[case("graph TD; invalid")]
#[case("invalid")]
fn invalid_syntax_renders_nothing(#[case] text: &str) {
    let renderer = Arc::new(Tracking::default());
    let coord = immediate(renderer.clone());
    let source = coord.register();
    let now = Instant::now();
    coord.request_render(source, RenderRequest::new(text, ContainerId(0)), now);
    coord.pump(now);
    assert_eq!(coord.render_count(), 0);
    assert!(renderer.order.lock().expect("lock").is_empty());
}

/// Submits a newer request for the same source while the first render is in flight.
struct Interrupting {
    target: OnceLock<(RenderCoordinator, SourceId)>,
    fired: AtomicUsize,
}

impl DiagramRenderer for Interrupting {
    fn validate(&self, _source: &str) -> bool {
        true
    }

    fn configure(&self, _config: &RenderConfig) {}

    fn render(&self, _id: &str, source: &str, c: ContainerId) -> Result<String, String> {
        let first = self.fired.fetch_add(1, Ordering::SeqCst) == 0;
        if let Some((coord, src)) = self.target.get().filter(|_| first) {
            coord.request_render(*src, RenderRequest::new("graph newer", c), Instant::now());
        }
        Ok(format!("<svg>{source}</svg>"))
    }
}

#[test]
fn result_of_superseded_running_job_is_discarded() {
    let renderer = Arc::new(Interrupting {
        target: OnceLock::new(),
        fired: AtomicUsize::new(0),
    });
    let coord = RenderCoordinator::with_options(
        renderer.clone(),
        CoordinatorOptions {
            coalesce_window: Duration::ZERO,
            ..CoordinatorOptions::default()
        },
    );
    let source = coord.register();
    assert!(renderer.target.set((coord.clone(), source)).is_ok());

    let now = Instant::now();
    coord.request_render(source, RenderRequest::new("graph older", ContainerId(0)), now);
    let first = coord.pump(now);
    assert_eq!(first.succeeded, 1);

    let status = coord.status(source).expect("status");
    assert_eq!(status.image, None);
    assert!(status.loading);

    let second = coord.pump(Instant::now());
    assert_eq!(second.succeeded, 1);
    let status = coord.status(source).expect("status");
    assert_eq!(status.image.as_deref(), Some("<svg>graph newer</svg>"));
    assert!(matches!(status.last_job, Some((_, JobState::Succeeded))));
    assert!(!status.loading);
}

#[test]
fn global_is_initialized_once() {
    let first = RenderCoordinator::global_or_init(|| {
        RenderCoordinator::new(Arc::new(Tracking::default()))
    });
    let second = RenderCoordinator::global_or_init(|| unreachable!("already initialized"));
    assert!(std::ptr::eq(first, second));
    assert!(RenderCoordinator::global().is_some());
}
