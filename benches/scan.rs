//! Token index benchmarks
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use toknav::config::DEFAULT_PATTERN;
use toknav::index::{DocId, TokenIndex};

/// Synthetic source file; `i` varies the identifiers between documents
fn document(i: usize, functions: usize) -> String {
    let mut text = String::new();
    for f in 0..functions {
        text.push_str(&format!(
            r#"fn function_{i}_{f}(input: &str) -> usize {{
    let value_{f} = input.len() * {i};
    println!("function {f} of file {i}");
    value_{f} + shared_helper(input)
}}

"#
        ));
    }
    text
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");

    for functions in [10, 100, 1000] {
        let text = document(0, functions);
        let doc = DocId::from("bench://file_0.rs");
        group.bench_with_input(BenchmarkId::new("fresh", functions), &text, |b, text| {
            b.iter(|| {
                let mut index = TokenIndex::new(10);
                index
                    .scan(&doc, black_box(text), DEFAULT_PATTERN, false)
                    .unwrap();
                index
            })
        });
    }

    group.finish();
}

fn bench_rescan(c: &mut Criterion) {
    let mut group = c.benchmark_group("rescan");

    // A populated index so the diff touches shared postings
    let mut index = TokenIndex::new(1000);
    for i in 0..200 {
        let doc = DocId::new(format!("bench://file_{i}.rs"));
        index.scan(&doc, &document(i, 20), DEFAULT_PATTERN, false).unwrap();
    }

    let doc = DocId::from("bench://file_0.rs");
    let original = document(0, 20);
    let edited = original.replacen("shared_helper", "edited_helper", 1);

    group.bench_function("one_token_changed", |b| {
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let text = if flip { &edited } else { &original };
            index.scan(&doc, black_box(text), DEFAULT_PATTERN, true).unwrap()
        })
    });

    group.finish();
}

fn bench_detach(c: &mut Criterion) {
    let docs: Vec<(DocId, String)> = (0..100)
        .map(|i| (DocId::new(format!("bench://file_{i}.rs")), document(i, 20)))
        .collect();

    c.bench_function("detach_all", |b| {
        b.iter_batched(
            || {
                let mut index = TokenIndex::new(1000);
                for (doc, text) in &docs {
                    index.scan(doc, text, DEFAULT_PATTERN, false).unwrap();
                }
                index
            },
            |mut index| {
                for (doc, _) in &docs {
                    black_box(index.detach(doc));
                }
                index
            },
            criterion::BatchSize::LargeInput,
        )
    });
}

fn bench_queries(c: &mut Criterion) {
    let mut index = TokenIndex::new(1000);
    for i in 0..200 {
        let doc = DocId::new(format!("bench://file_{i}.rs"));
        index.scan(&doc, &document(i, 20), DEFAULT_PATTERN, false).unwrap();
    }

    c.bench_function("documents_for_shared_token", |b| {
        b.iter(|| index.documents_for(black_box("shared_helper")))
    });
    c.bench_function("tokens_by_count", |b| b.iter(|| index.tokens_by_count().len()));
}

criterion_group!(benches, bench_scan, bench_rescan, bench_detach, bench_queries);
criterion_main!(benches);
