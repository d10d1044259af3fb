//! Benchmarks for booking reference generation.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use venue_reserve::bookings::{generate_booking_ref, to_base36};

fn bench_generate_booking_ref(c: &mut Criterion) {
    c.bench_function("generate_booking_ref", |b| {
        b.iter(|| black_box(generate_booking_ref()))
    });
}

fn bench_to_base36(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_base36");
    for value in [0u128, 1_000, 1_000_000_000, u128::from(u64::MAX)] {
        group.bench_with_input(format!("{value}"), &value, |b, &value| {
            b.iter(|| black_box(to_base36(black_box(value))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generate_booking_ref, bench_to_base36);
criterion_main!(benches);
