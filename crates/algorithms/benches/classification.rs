//! Benchmarks for k-means clustering

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use canopy_algorithms::classification::{kmeans, KmeansParams, PixelSamples};
use canopy_core::{Raster, RasterStack};

fn create_stack(size: usize, bands: usize) -> RasterStack<f64> {
    let layers = (0..bands)
        .map(|b| {
            let data = (0..size * size)
                .map(|i| ((i * (b + 3) + i / size * 11) % 97) as f64 / 97.0)
                .collect();
            Raster::from_vec(data, size, size).unwrap()
        })
        .collect();
    RasterStack::new(layers).unwrap()
}

fn bench_kmeans(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification/kmeans");
    group.sample_size(10);
    for size in [128, 256, 512] {
        let samples = PixelSamples::from_stack(&create_stack(size, 4)).unwrap();
        let params = KmeansParams {
            k: 8,
            max_iterations: 20,
            n_start: 4,
            seed: 42,
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| kmeans(black_box(&samples), params.clone()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_kmeans);
criterion_main!(benches);
