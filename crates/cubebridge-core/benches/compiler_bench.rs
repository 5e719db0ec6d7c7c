//! Benchmarks for the question compiler.

use criterion::{Criterion, criterion_group, criterion_main};
use cubebridge_core::QueryCompiler;
use std::hint::black_box;

const QUESTIONS: &[&str] = &[
    "top 5 cities by population",
    "revenue by product category",
    "monthly customer count by customer segment",
    "lowest average order value per payment method",
    "",
    "something entirely unrelated to the data model",
];

fn bench_compile(c: &mut Criterion) {
    let compiler = QueryCompiler::new();

    c.bench_function("compile_questions", |b| {
        b.iter(|| {
            for question in QUESTIONS {
                black_box(compiler.compile(black_box(question)));
            }
        });
    });

    let long = "revenue ".repeat(512);
    c.bench_function("compile_long_question", |b| {
        b.iter(|| black_box(compiler.compile(black_box(&long))));
    });
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
