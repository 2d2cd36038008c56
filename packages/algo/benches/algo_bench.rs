//! Benchmark suite for repitis-algo
//!
//! Run with: cargo bench

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use repitis_algo::{MemoryModel, Rating};

fn bench_first_review(c: &mut Criterion) {
    let model = MemoryModel::default();
    let now = Utc::now();
    c.bench_function("MemoryModel::update (new card)", |b| {
        b.iter(|| model.update(None, black_box(Rating::Good), now))
    });
}

fn bench_review_chain(c: &mut Criterion) {
    let model = MemoryModel::default();
    let now = Utc::now();
    let state = model
        .update(None, Rating::Good, now)
        .map(|outcome| outcome.state)
        .ok();
    let at = now + Duration::days(4);
    c.bench_function("MemoryModel::update (existing card)", |b| {
        b.iter(|| model.update(state.as_ref(), black_box(Rating::Hard), at))
    });
}

criterion_group!(benches, bench_first_review, bench_review_chain);
criterion_main!(benches);
