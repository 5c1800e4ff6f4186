// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Decomposed Run Benchmark
// © 1998–2026 Miroslav Šotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use stencil_core::distribute::split_rows;
use stencil_core::driver::{launch, run_tiled};
use stencil_core::halo::serial_exchange;
use stencil_core::init::checkerboard;
use stencil_core::partition::decompose_rows;
use stencil_types::config::RunConfig;

fn bench_serial_exchange(c: &mut Criterion) {
    let mut group = c.benchmark_group("halo_exchange");
    let grid = checkerboard(512, 512);

    for &workers in &[2usize, 8usize] {
        let slices = decompose_rows(grid.ny, workers).expect("decompose");
        group.bench_with_input(
            BenchmarkId::new("serial", workers),
            &slices,
            |b, slices| {
                b.iter_batched(
                    || split_rows(&grid, slices).expect("split"),
                    |mut locals| {
                        serial_exchange(&mut locals, slices).expect("exchange");
                        black_box(locals.len());
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("decomposed_run");
    // Each iteration spawns a full set of workers.
    group.sample_size(10);
    let cfg = RunConfig::new(256, 256, 10);
    let grid = checkerboard(cfg.nx, cfg.ny);

    for &workers in &[1usize, 4usize] {
        group.bench_with_input(BenchmarkId::new("channels", workers), &workers, |b, &w| {
            b.iter(|| {
                let out = launch(&cfg, w, grid.clone()).expect("launch");
                black_box(out.runtime_secs);
            })
        });
        group.bench_with_input(BenchmarkId::new("tiled", workers), &workers, |b, &w| {
            b.iter(|| {
                let out = run_tiled(&grid, w, cfg.niters).expect("tiled");
                black_box(out.cells[[1, 1]]);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_serial_exchange, bench_full_run);
criterion_main!(benches);
