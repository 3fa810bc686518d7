//! Benchmarks for CPF checksum validation.
//!
//! Validation runs on every employee insert and update, and once per row when
//! importing in bulk, so it should stay well under a microsecond.
//!
//! # Run Benchmarks
//!
//! ```sh
//! # Run all CPF benchmarks
//! cargo bench --bench cpf_bench
//!
//! # Run one group
//! cargo bench --bench cpf_bench -- cpf_scenarios
//!
//! # Compare against a saved baseline
//! cargo bench --bench cpf_bench -- --save-baseline main
//! cargo bench --bench cpf_bench -- --baseline main
//! ```

use assim_core::{Cpf, normalize_cpf, validate_cpf};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// Valid inputs, bare and formatted.
fn bench_cpf_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpf_validation");
    group.throughput(Throughput::Elements(1));

    let test_cases = vec![
        ("digits_only", "11144477735"),
        ("formatted", "111.444.777-35"),
        ("padded", "  529.982.247-25  "),
    ];

    for (name, cpf) in test_cases {
        group.bench_with_input(BenchmarkId::new("validate", name), &cpf, |b, &cpf| {
            b.iter(|| black_box(validate_cpf(black_box(cpf))));
        });
    }

    group.finish();
}

/// Early rejections against full checksum failures.
fn bench_cpf_scenarios(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpf_scenarios");
    group.throughput(Throughput::Elements(1));

    let scenarios = vec![
        ("empty", ""),
        ("too_short", "1114447773"),
        ("repeated_digits", "00000000000"),
        ("bad_check_digit", "11144477736"),
        ("garbage", "not a cpf at all, really"),
    ];

    for (name, cpf) in scenarios {
        group.bench_function(name, |b| {
            b.iter(|| black_box(validate_cpf(black_box(cpf))));
        });
    }

    group.finish();
}

/// Newtype construction allocates the normalized digits.
fn bench_cpf_newtype(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpf_newtype");
    group.throughput(Throughput::Elements(1));

    group.bench_function("normalize", |b| {
        b.iter(|| black_box(normalize_cpf(black_box("111.444.777-35"))));
    });

    group.bench_function("construct", |b| {
        b.iter(|| black_box(Cpf::new(black_box("111.444.777-35"))));
    });

    group.finish();
}

/// A thousand-row import.
fn bench_batch_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpf_batch");
    let batch: Vec<&str> = ["11144477735", "52998224725", "71428793860", "11144477736"]
        .iter()
        .copied()
        .cycle()
        .take(1000)
        .collect();
    group.throughput(Throughput::Elements(batch.len() as u64));

    group.bench_function("1000_rows", |b| {
        b.iter(|| {
            let valid = batch.iter().filter(|cpf| validate_cpf(black_box(cpf))).count();
            black_box(valid)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_cpf_validation,
    bench_cpf_scenarios,
    bench_cpf_newtype,
    bench_batch_validation,
);

criterion_main!(benches);
