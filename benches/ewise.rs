//! Benchmarks for element-wise add and multiply
//!
//! Usage:
//!   cargo bench --bench ewise
//!   BENCH_SIZE=large cargo bench --bench ewise

use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ewise::{ewise_add, ewise_mult, BinaryOp, ElementType, EwiseConfig, Mask, Matrix, Opcode, Sparsity};

/// Get the problem size from environment
fn get_bench_size() -> usize {
    match std::env::var("BENCH_SIZE").as_deref() {
        Ok("large") => 20_000,
        _ => 2_000,
    }
}

/// Generate a square matrix with about `per_vector` entries per vector
fn generate_matrix(n: usize, per_vector: usize, seed: u64, sparsity: Sparsity) -> Matrix {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 33) as usize
    };

    let mut entries = Vec::with_capacity(n * per_vector);
    for j in 0..n {
        let mut rows: Vec<usize> = (0..per_vector).map(|_| next() % n).collect();
        rows.sort_unstable();
        rows.dedup();
        for i in rows {
            entries.push((i, j, (next() % 1000) as f64 / 10.0 + 0.1));
        }
    }
    Matrix::from_triplets(n, n, &entries, sparsity).expect("valid triplets")
}

fn bench_formats(c: &mut Criterion) {
    let n = get_bench_size();
    let plus = BinaryOp::of::<f64>(Opcode::Plus).expect("builtin operator");
    let times = BinaryOp::of::<f64>(Opcode::Times).expect("builtin operator");
    let config = EwiseConfig::default();

    let mut group = c.benchmark_group("ewise_formats");
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(20);

    for (name, fa, fb) in [
        ("sparse_sparse", Sparsity::Sparse, Sparsity::Sparse),
        ("hyper_sparse", Sparsity::Hypersparse, Sparsity::Sparse),
        ("sparse_bitmap", Sparsity::Sparse, Sparsity::Bitmap),
    ] {
        let a = generate_matrix(n, 16, 1, fa);
        let b = generate_matrix(n, 16, 2, fb);

        group.bench_with_input(BenchmarkId::new("add", name), &(&a, &b), |bench, (a, b)| {
            bench.iter(|| {
                black_box(ewise_add(&ElementType::FP64, true, None, Some(&plus), a, b, &config).expect("add"))
            })
        });
        group.bench_with_input(BenchmarkId::new("mult", name), &(&a, &b), |bench, (a, b)| {
            bench.iter(|| {
                black_box(ewise_mult(&ElementType::FP64, true, None, &times, a, b, &config).expect("mult"))
            })
        });
    }
    group.finish();
}

fn bench_threads(c: &mut Criterion) {
    let n = get_bench_size();
    let plus = BinaryOp::of::<f64>(Opcode::Plus).expect("builtin operator");
    let a = generate_matrix(n, 32, 3, Sparsity::Sparse);
    let b = generate_matrix(n, 32, 4, Sparsity::Sparse);

    let mut group = c.benchmark_group("ewise_threads");
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(20);

    for threads in [1, 2, 4, num_cpus::get()] {
        let config = EwiseConfig::default().with_threads(threads);
        group.bench_with_input(BenchmarkId::new("add", threads), &config, |bench, config| {
            bench.iter(|| {
                black_box(ewise_add(&ElementType::FP64, true, None, Some(&plus), &a, &b, config).expect("add"))
            })
        });
    }
    group.finish();
}

fn bench_mask_and_generic(c: &mut Criterion) {
    let n = get_bench_size();
    let plus = BinaryOp::of::<f64>(Opcode::Plus).expect("builtin operator");
    let a = generate_matrix(n, 16, 5, Sparsity::Sparse);
    let b = generate_matrix(n, 16, 6, Sparsity::Sparse);
    let m = generate_matrix(n, 8, 7, Sparsity::Sparse);
    let specialized = EwiseConfig::default();
    let generic = EwiseConfig::default().with_force_generic(true);

    let mut group = c.benchmark_group("ewise_paths");
    group.sample_size(20);

    group.bench_function("add_specialized", |bench| {
        bench.iter(|| black_box(ewise_add(&ElementType::FP64, true, None, Some(&plus), &a, &b, &specialized)))
    });
    group.bench_function("add_generic", |bench| {
        bench.iter(|| black_box(ewise_add(&ElementType::FP64, true, None, Some(&plus), &a, &b, &generic)))
    });
    group.bench_function("add_masked", |bench| {
        let mask = Mask::structural(&m);
        bench.iter(|| {
            black_box(ewise_add(&ElementType::FP64, true, Some(&mask), Some(&plus), &a, &b, &specialized))
        })
    });
    group.bench_function("add_complement_masked", |bench| {
        let mask = Mask::structural(&m).complemented();
        bench.iter(|| {
            black_box(ewise_add(&ElementType::FP64, true, Some(&mask), Some(&plus), &a, &b, &specialized))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_formats, bench_threads, bench_mask_and_generic);
criterion_main!(benches);
