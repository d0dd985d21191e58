//! Benchmarks for the detection and parsing hot paths.
//!
//! Run with: cargo bench --package formatscope-core
//!
//! These benchmarks measure:
//! - Signature, content and aggregated detection speed
//! - Detection cache hits
//! - Parse throughput per format
//! - Batch analysis throughput

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

use formatscope_core::{
    analyze_project, BatchOptions, DetectOptions, FormatDetector, FormatRegistry, ParseConfig,
    ParseOptions,
};

const JSON_SAMPLE: &str = r#"{
    "users": [
        {"id": 1, "name": "Ada Lovelace", "email": "ada@example.com", "active": true},
        {"id": 2, "name": "Alan Turing", "email": "alan@example.com", "active": false},
        {"id": 3, "name": "Grace Hopper", "email": "grace@example.com", "active": true}
    ],
    "meta": {"total": 3, "page": 1, "generated": "2024-05-01T12:00:00Z"}
}"#;

const CSV_SAMPLE: &str = "id,name,email,active,joined
1,Ada Lovelace,ada@example.com,true,2024-01-15
2,Alan Turing,alan@example.com,false,2023-11-02
3,Grace Hopper,grace@example.com,true,2022-06-30
4,Edsger Dijkstra,edsger@example.com,true,2021-03-14
";

const XML_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog xmlns:dc="http://purl.org/dc/elements/1.1/">
    <book id="bk101">
        <dc:title>Dune</dc:title>
        <author>Frank Herbert</author>
        <price>9.99</price>
    </book>
    <book id="bk102">
        <dc:title>Neuromancer</dc:title>
        <author>William Gibson</author>
        <price>8.49</price>
    </book>
</catalog>"#;

fn samples() -> [(&'static str, &'static str); 3] {
    [("json", JSON_SAMPLE), ("csv", CSV_SAMPLE), ("xml", XML_SAMPLE)]
}

/// Benchmark each detection method in isolation.
fn bench_detection_methods(c: &mut Criterion) {
    let detector = FormatDetector::new(Arc::new(FormatRegistry::with_defaults()));

    let mut group = c.benchmark_group("detect_method");
    for (name, content) in samples() {
        group.bench_with_input(BenchmarkId::new("signature", name), content, |b, s| {
            b.iter(|| detector.detect_by_signature(black_box(s)))
        });
        group.bench_with_input(BenchmarkId::new("content", name), content, |b, s| {
            b.iter(|| detector.detect_by_content(black_box(s)))
        });
    }
    group.finish();
}

/// Benchmark aggregated detection, uncached and from the cache.
fn bench_detect(c: &mut Criterion) {
    let detector = FormatDetector::new(Arc::new(FormatRegistry::with_defaults()));

    let mut group = c.benchmark_group("detect");
    for (name, content) in samples() {
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::new("uncached", name), content, |b, s| {
            b.iter(|| detector.detect(black_box(s), &DetectOptions::uncached()))
        });
        group.bench_with_input(BenchmarkId::new("cached", name), content, |b, s| {
            b.iter(|| detector.detect(black_box(s), &DetectOptions::default()))
        });
    }
    group.finish();
}

/// Benchmark registry construction.
fn bench_registry(c: &mut Criterion) {
    c.bench_function("FormatRegistry::with_defaults", |b| {
        b.iter(FormatRegistry::with_defaults)
    });
}

/// Benchmark validate-then-decode for each format.
fn bench_parse(c: &mut Criterion) {
    let registry = FormatRegistry::with_defaults();
    let config = ParseConfig::default();

    let mut group = c.benchmark_group("parse");
    for (name, content) in samples() {
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::new("format", name), content, |b, s| {
            b.iter(|| registry.parse(black_box(s), &ParseOptions::with_format(name), &config))
        });
    }
    group.finish();

    // A larger CSV document to exercise type inference sampling
    let mut large_csv = String::from("id,name,score,joined\n");
    for i in 0..2000 {
        large_csv.push_str(&format!("{},user-{},{}.5,2024-01-{:02}\n", i, i, i % 100, i % 28 + 1));
    }

    let mut group = c.benchmark_group("parse_large");
    group.throughput(Throughput::Bytes(large_csv.len() as u64));
    group.bench_function("csv_2000_rows", |b| {
        b.iter(|| registry.parse(black_box(&large_csv), &ParseOptions::with_format("csv"), &config))
    });
    group.finish();
}

/// Benchmark batch analysis over a directory tree.
fn bench_analyze_project(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    let config = ParseConfig::default();
    let detector = FormatDetector::new(Arc::new(FormatRegistry::with_defaults()));

    for i in 0..20 {
        let dir = temp.path().join(format!("batch-{}", i));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("users.json"), JSON_SAMPLE).unwrap();
        std::fs::write(dir.join("users.csv"), CSV_SAMPLE).unwrap();
        std::fs::write(dir.join("catalog.xml"), XML_SAMPLE).unwrap();
    }

    let mut group = c.benchmark_group("analyze_project");
    group.throughput(Throughput::Elements(60));
    group.bench_function("60_files", |b| {
        b.iter(|| {
            detector.clear_cache();
            analyze_project(
                black_box(temp.path()),
                &detector,
                &config,
                &BatchOptions::default(),
            )
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_detection_methods,
    bench_detect,
    bench_registry,
    bench_parse,
    bench_analyze_project,
);
criterion_main!(benches);
