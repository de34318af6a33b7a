//! # Closure Benchmarks
//!
//! Closure resolution over synthetic catalogs.
//!
//! Run with: `cargo bench -p portkit-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use portkit_core::closure::resolve;
use portkit_core::{Catalog, Module, Policy};
use std::hint::black_box;

/// `size` modules where module i depends on i+1 and i+2, each with a tests
/// companion.
fn layered_catalog(size: usize) -> Catalog {
    let mut modules = Vec::with_capacity(size * 2);
    for i in 0..size {
        let deps: Vec<String> = [i + 1, i + 2]
            .into_iter()
            .filter(|d| *d < size)
            .map(|d| format!("m{d}"))
            .collect();
        modules.push(Module::new(format!("m{i}")).depends_on(deps));
        modules.push(Module::new(format!("m{i}-tests")).depends_on([format!("m{i}")]));
    }
    Catalog::from_modules(modules)
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let policy = Policy::new();

    for size in [10, 100, 500] {
        let catalog = layered_catalog(size);
        group.bench_with_input(BenchmarkId::new("without_tests", size), &catalog, |b, cat| {
            b.iter(|| resolve(black_box(["m0"]), cat, &policy, false).expect("resolve"));
        });
        group.bench_with_input(BenchmarkId::new("with_tests", size), &catalog, |b, cat| {
            b.iter(|| resolve(black_box(["m0"]), cat, &policy, true).expect("resolve"));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
