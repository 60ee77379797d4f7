//! Analysis pipeline benchmarks
//!
//! Measures the CPU-bound stages of an analysis request (no network I/O):
//! input sanitizing, prompt construction, JSON recovery from a chatty model
//! reply, schema validation and cache key hashing.
//!
//! Upstream generation takes seconds; everything measured here should stay
//! in the microsecond range even at the maximum input size.
//!
//! Run with: `cargo bench`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use resume_reviewer::analysis::parse::{ModelReply, parse};
use resume_reviewer::analysis::{RUBRIC_CATEGORIES, build_prompt, sanitize, validate};
use resume_reviewer::cache::CacheKey;
use serde_json::json;

fn resume_text(chars: usize) -> String {
    let line = "Senior Engineer\tAcme Corp  2019-2024\r\n  Led migration of billing to Rust,\n\n\n";
    line.chars().cycle().take(chars).collect()
}

fn model_reply() -> String {
    let document = json!({
        "scores": RUBRIC_CATEGORIES
            .iter()
            .map(|name| json!({"name": name, "score": 4, "max": 5}))
            .collect::<Vec<_>>(),
        "comments": [
            "Quantify the impact of the billing migration.",
            "Trim the summary to two lines.",
        ],
    });
    format!("Sure! Here is the analysis you asked for:\n```json\n{document}\n```\nGood luck!")
}

fn bench_sanitize(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitize");

    for size in [1_000, 12_000, 200_000] {
        let text = resume_text(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| sanitize(black_box(text), 12_000));
        });
    }

    group.finish();
}

fn bench_build_prompt(c: &mut Criterion) {
    let text = sanitize(&resume_text(12_000), 12_000);
    c.bench_function("build_prompt", |b| b.iter(|| build_prompt(black_box(&text))));
}

fn bench_parse_and_validate(c: &mut Criterion) {
    let reply = model_reply();

    c.bench_function("parse_chatty_reply", |b| {
        b.iter(|| parse(ModelReply::Text(black_box(reply.clone()))))
    });

    let value = parse(ModelReply::Text(reply)).expect("benchmark reply should parse");
    c.bench_function("validate", |b| b.iter(|| validate(black_box(&value))));
}

fn bench_cache_key(c: &mut Criterion) {
    let text = sanitize(&resume_text(12_000), 12_000);
    c.bench_function("cache_key", |b| b.iter(|| CacheKey::for_text(black_box(&text))));
}

criterion_group!(
    benches,
    bench_sanitize,
    bench_build_prompt,
    bench_parse_and_validate,
    bench_cache_key
);
criterion_main!(benches);
