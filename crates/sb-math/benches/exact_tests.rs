//! Criterion benchmarks for `sb-math`.
//!
//! Fisher tables are evaluated once per sparse signal, so their cost scales
//! with the vocabulary size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sb_math::{chi_square_survival, fisher_exact_two_sided};

fn bench_exact_tests(c: &mut Criterion) {
    let mut group = c.benchmark_group("contingency");

    for (name, table) in [
        ("small", (8u64, 2u64, 1u64, 9u64)),
        ("sparse_large_n", (2, 35, 828, 3704)),
        ("balanced", (40, 10, 12, 38)),
    ] {
        group.bench_with_input(BenchmarkId::new("fisher_two_sided", name), &table, |b, t| {
            b.iter(|| {
                black_box(fisher_exact_two_sided(
                    black_box(t.0),
                    black_box(t.1),
                    black_box(t.2),
                    black_box(t.3),
                ))
            });
        });
    }

    group.bench_function("chi_square_survival_df1", |b| {
        b.iter(|| black_box(chi_square_survival(black_box(7.3), 1.0)));
    });

    group.finish();
}

criterion_group!(benches, bench_exact_tests);
criterion_main!(benches);
