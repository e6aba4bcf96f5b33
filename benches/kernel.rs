//! Benchmarks for the per-step grid passes.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use wavepool::color::{colorize_range, RenderOptions, Rgb};
use wavepool::kernel;

/// Build a grid with a standing-wave height pattern and a sprinkle of
/// obstacles, so the stencil hits its interesting branches.
fn seeded_grid(n: usize) -> (Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>) {
    let cells = n * n;
    let mut height = vec![0.0f32; cells];
    let mut fixity = vec![0.0f32; cells];
    for y in 0..n {
        for x in 0..n {
            let i = x + n * y;
            height[i] = ((x as f32 * 0.3).sin() + (y as f32 * 0.17).cos()) * 0.5;
            if (x * 31 + y * 17) % 97 == 0 {
                fixity[i] = 1.0;
            }
        }
    }
    let velocity = vec![0.0f32; cells];
    let mass = vec![1.0f32; cells];
    let loss = vec![0.02f32; cells];
    (height, velocity, mass, loss, fixity)
}

fn bench_force_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_step");
    for n in [128usize, 300] {
        let (height, velocity, mass, loss, fixity) = seeded_grid(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let prev = height.clone();
            let mut height = height.clone();
            let mut velocity = velocity.clone();
            b.iter(|| {
                kernel::step_range(
                    black_box(&prev),
                    &mass,
                    &loss,
                    &fixity,
                    &mut height,
                    &mut velocity,
                    n,
                    0,
                );
            })
        });
    }
    group.finish();
}

fn bench_move_step(c: &mut Criterion) {
    let n = 300;
    let (mut height, _, _, _, _) = seeded_grid(n);
    let velocity = vec![0.01f32; n * n];
    c.bench_function("move_step_300", |b| {
        b.iter(|| kernel::advance_range(black_box(&mut height), &velocity))
    });
}

fn bench_colorize(c: &mut Criterion) {
    let mut group = c.benchmark_group("colorize");
    let n = 300;
    let (height, _, mass, _, fixity) = seeded_grid(n);
    let mut rgb = vec![Rgb::BLACK; n * n];

    let wave = RenderOptions::default();
    group.bench_function("wave", |b| {
        b.iter(|| colorize_range(black_box(&height), &mass, &fixity, &mut rgb, &wave))
    });

    let mut thermal = RenderOptions::default();
    thermal.mass_map(true);
    group.bench_function("mass_map", |b| {
        b.iter(|| colorize_range(black_box(&height), &mass, &fixity, &mut rgb, &thermal))
    });
    group.finish();
}

criterion_group!(benches, bench_force_step, bench_move_step, bench_colorize);
criterion_main!(benches);
