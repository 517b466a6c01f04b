//! Benchmarks for stream line decoding
//!
//! This benchmark measures:
//! - Single content-delta line decoding
//! - Mixed reasoning / image / usage chunk decoding
//! - Usage normalization

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use gen_protocol_adapter::{decode_line, normalize_usage};

/// Typical content stream
const CONTENT_LINES: &[&str] = &[
    r#"data: {"id":"gen-1","model":"vendor/chat","choices":[{"index":0,"delta":{"role":"assistant","content":""},"finish_reason":null}]}"#,
    r#"data: {"id":"gen-1","model":"vendor/chat","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#,
    r#"data: {"id":"gen-1","model":"vendor/chat","choices":[{"index":0,"delta":{"content":" there"},"finish_reason":null}]}"#,
    ": keep-alive",
    r#"data: {"id":"gen-1","model":"vendor/chat","choices":[{"index":0,"delta":{},"finish_reason":"stop"}],"usage":{"prompt_tokens":12,"completion_tokens":2,"total_tokens":14}}"#,
    "data: [DONE]",
];

/// Reasoning model stream with structured details and an inline image
const MIXED_LINES: &[&str] = &[
    r#"data: {"choices":[{"delta":{"reasoning":"Let me think","reasoning_details":[{"type":"reasoning.text","text":"Let me think","format":"unknown","index":0}]}}]}"#,
    r#"data: {"choices":[{"delta":{"content":[{"type":"text","text":"Here:"},{"type":"image_url","image_url":{"url":"https://img.test/a.png"}}]}}]}"#,
    r#"data: {"choices":[{"delta":{"images":[{"b64_json":"iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk"}]}}]}"#,
    r#"data: {"choices":[{"delta":{}}],"usage":{"input_tokens":40,"output_tokens":300,"output_tokens_details":{"reasoning_tokens":256},"cost":0.0012}}"#,
];

fn bench_content_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_lines");

    let line = CONTENT_LINES[1];
    group.throughput(Throughput::Bytes(line.len() as u64));
    group.bench_function("decode_single_delta", |b| {
        b.iter(|| decode_line(black_box(line)))
    });

    let total: usize = CONTENT_LINES.iter().map(|l| l.len()).sum();
    group.throughput(Throughput::Bytes(total as u64));
    group.bench_function("decode_full_stream", |b| {
        b.iter(|| {
            for line in CONTENT_LINES {
                black_box(decode_line(black_box(line)));
            }
        })
    });

    group.finish();
}

fn bench_mixed_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_lines");

    let total: usize = MIXED_LINES.iter().map(|l| l.len()).sum();
    group.throughput(Throughput::Bytes(total as u64));
    group.bench_function("decode_reasoning_and_images", |b| {
        b.iter(|| {
            for line in MIXED_LINES {
                black_box(decode_line(black_box(line)));
            }
        })
    });

    group.finish();
}

fn bench_usage(c: &mut Criterion) {
    let usage = serde_json::json!({
        "input_tokens": 40,
        "output_tokens": 300,
        "input_tokens_details": {"cached_tokens": 32},
        "output_tokens_details": {"reasoning_tokens": 256},
        "cost": 0.0012,
        "cost_details": {"upstream_inference_cost": 0.001, "note": "n/a"}
    });

    c.bench_function("normalize_usage", |b| {
        b.iter(|| normalize_usage(black_box(&usage)))
    });
}

criterion_group!(benches, bench_content_lines, bench_mixed_lines, bench_usage);
criterion_main!(benches);
