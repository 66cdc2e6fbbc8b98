use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use ratatui::text::Line;
use tracing_subscriber::EnvFilter;
use x_markdown::HighlightOptions;
use x_markdown::StreamingHighlighter;
use x_markdown::code_render::CodeRenderOptions;
use x_markdown::code_render::CodeRenderStyles;
use x_markdown::code_render::render_token_lines;
use x_markdown::mermaid::DiagramRenderer;
use x_markdown::mermaid::MermaidDiagram;
use x_markdown::mermaid::RenderConfig;
use x_markdown::mermaid::RenderCoordinator;
use x_markdown::mermaid::diagram::MermaidOptions;
use x_markdown::syntax::syntect::SyntectBackend;
use x_markdown::zoom::ContainerId;

const SAMPLE_CODE: &str = r#"fn main() {
    let greeting = "hello";
    for i in 0..3 {
        println!("{greeting} #{i}");
    }
}
"#;

const SAMPLE_DIAGRAM: &str = "graph TD;\n  A[Prompt] --> B[Model];\n  B --> C[Answer];\n";

/// Stand-in engine: accepts anything starting with `graph` and echoes a tiny SVG.
struct EchoRenderer;

impl DiagramRenderer for EchoRenderer {
    fn validate(&self, source: &str) -> bool {
        source.starts_with("graph")
    }

    fn configure(&self, config: &RenderConfig) {
        tracing::info!(theme = %config.theme, "configure");
    }

    fn render(
        &self,
        render_id: &str,
        source: &str,
        _container: ContainerId,
    ) -> Result<String, String> {
        Ok(format!(
            "<svg id=\"{render_id}\"><!-- {} lines --></svg>",
            source.lines().count()
        ))
    }
}

fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let backend = Arc::new(SyntectBackend::new());
    let mut highlighter =
        StreamingHighlighter::attach(backend, "", HighlightOptions::new("rust", "slack-dark"));

    // Feed the block a few characters at a time, the way a model streams it.
    let chars: Vec<char> = SAMPLE_CODE.chars().collect();
    let mut acc = String::new();
    for piece in chars.chunks(7) {
        acc.extend(piece);
        let outcome = highlighter.update(&acc);
        tracing::debug!(?outcome, lines = highlighter.lines().len(), "update");
    }

    let rendered = render_token_lines(
        highlighter.lines(),
        CodeRenderStyles {
            base: highlighter.pre_style().unwrap_or_default(),
            ..Default::default()
        },
        &CodeRenderOptions {
            show_line_numbers: true,
            ..Default::default()
        },
    );
    for line in &rendered.lines {
        println!("{}", line_text(line));
    }
    println!(
        "{} lines, {} columns wide\n",
        rendered.content_height, rendered.content_width
    );

    let coordinator = RenderCoordinator::global_or_init(|| {
        RenderCoordinator::new(Arc::new(EchoRenderer))
    });
    let mut diagram = MermaidDiagram::new(coordinator.clone(), MermaidOptions::default());
    let mut now = Instant::now();
    diagram.set_render_target(ContainerId(1), now);

    let mut acc = String::new();
    for ch in SAMPLE_DIAGRAM.chars() {
        acc.push(ch);
        now += Duration::from_millis(5);
        diagram.set_content(acc.clone(), now);
        if diagram.pump(now) {
            tracing::info!(image = ?diagram.image(), error = ?diagram.error(), "diagram changed");
        }
    }
    while let Some(deadline) = diagram.next_deadline() {
        now = now.max(deadline);
        diagram.pump(now);
    }

    match (diagram.image(), diagram.error()) {
        (Some(svg), _) => println!("{svg}"),
        (None, Some(err)) => println!("diagram failed: {err}"),
        (None, None) => println!("no diagram"),
    }
}
