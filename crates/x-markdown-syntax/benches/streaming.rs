use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use std::sync::Arc;
use x_markdown_core::plain::PlainTextBackend;
use x_markdown_core::text::HighlighterBackend;
use x_markdown_syntax::HighlightOptions;
use x_markdown_syntax::StreamingHighlighter;

fn sample_code(lines: usize) -> String {
    let mut s = String::new();
    s.push_str("fn main() {\n");
    for i in 0..lines {
        s.push_str(&format!("    let x{i} = {i} + 1; // comment {i}\n"));
    }
    s.push_str("    println!(\"done\");\n");
    s.push_str("}\n");
    s
}

fn chunks(s: &str, n_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    for ch in s.chars() {
        cur.push(ch);
        if cur.chars().count() >= n_chars {
            out.push(std::mem::take(&mut cur));
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

fn stream_all(backend: Arc<dyn HighlighterBackend + Send + Sync>, language: &str, parts: &[String]) {
    let mut h = StreamingHighlighter::attach(backend, "", HighlightOptions::new(language, ""));
    let mut acc = String::new();
    for p in parts {
        acc.push_str(p);
        black_box(h.update(&acc));
    }
    black_box(h.lines().len());
}

fn bench_stream_plain(c: &mut Criterion) {
    let code = sample_code(200);
    let parts = chunks(&code, 16);
    c.bench_function("stream_plain_200_lines_16_char_chunks", |b| {
        b.iter(|| stream_all(Arc::new(PlainTextBackend), "text", &parts))
    });
}

fn bench_rewrite_every_update(c: &mut Criterion) {
    let code = sample_code(50);
    c.bench_function("rewrite_plain_50_lines", |b| {
        b.iter(|| {
            let mut h = StreamingHighlighter::attach(
                Arc::new(PlainTextBackend),
                "",
                HighlightOptions::new("text", ""),
            );
            for i in 0..50 {
                black_box(h.update(&format!("{i}{code}")));
            }
        })
    });
}

#[cfg(feature = "syntect")]
fn bench_stream_syntect(c: &mut Criterion) {
    let backend: Arc<dyn HighlighterBackend + Send + Sync> =
        Arc::new(x_markdown_syntax::syntect::SyntectBackend::new());
    let code = sample_code(200);
    let parts = chunks(&code, 16);
    c.bench_function("stream_syntect_200_lines_16_char_chunks", |b| {
        b.iter(|| stream_all(Arc::clone(&backend), "rs", &parts))
    });
}

#[cfg(feature = "syntect")]
criterion_group!(
    benches,
    bench_stream_plain,
    bench_rewrite_every_update,
    bench_stream_syntect
);
#[cfg(not(feature = "syntect"))]
criterion_group!(benches, bench_stream_plain, bench_rewrite_every_update);
criterion_main!(benches);
