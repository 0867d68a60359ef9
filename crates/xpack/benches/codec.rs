//! Benchmarks for XPACK compression and decompression.
//!
//! Run with: `cargo bench -p xpack`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use xpack::{max_compressed_size, Compressor, Decompressor};
use xpack_core::CompressionLevel;

/// Generate test data with varying compressibility.
fn generate_test_data(size: usize, compressibility: f64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut data = Vec::with_capacity(size);

    if compressibility > 0.9 {
        let pattern = b"ABCDEFGHIJKLMNOP";
        while data.len() < size {
            data.extend_from_slice(pattern);
        }
        data.truncate(size);
    } else if compressibility > 0.5 {
        let phrases: &[&[u8]] = &[
            b"The quick brown fox jumps over the lazy dog. ",
            b"Pack my box with five dozen liquor jugs! ",
            b"How vexingly quick daft zebras jump!! ",
        ];
        while data.len() < size {
            if rng.gen_bool(compressibility) {
                let phrase = phrases[rng.gen_range(0..phrases.len())];
                data.extend_from_slice(phrase);
            } else {
                data.push(rng.gen::<u8>());
            }
        }
        data.truncate(size);
    } else {
        data.resize(size, 0);
        rng.fill(&mut data[..]);
    }

    data
}

fn bench_compress_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("xpack_compress");
    let data = generate_test_data(256 * 1024, 0.7);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for level in [1u8, 4, 6, 9] {
        let mut compressor =
            Compressor::new(data.len(), CompressionLevel::Custom(level)).unwrap();
        let mut out = vec![0u8; max_compressed_size(data.len())];
        group.bench_with_input(BenchmarkId::new("level", level), &data, |b, data| {
            b.iter(|| black_box(compressor.compress(black_box(data), &mut out)));
        });
    }
    group.finish();
}

fn bench_compress_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("xpack_compress_sizes");

    for size in [4 * 1024, 64 * 1024, 256 * 1024, 1024 * 1024] {
        let data = generate_test_data(size, 0.7);
        let mut compressor = Compressor::new(size, CompressionLevel::Default).unwrap();
        let mut out = vec![0u8; max_compressed_size(size)];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| black_box(compressor.compress(black_box(data), &mut out)));
        });
    }
    group.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("xpack_decompress");

    for (name, compressibility) in [("repetitive", 0.95), ("mixed", 0.7)] {
        let data = generate_test_data(256 * 1024, compressibility);
        let mut compressor = Compressor::new(data.len(), CompressionLevel::Default).unwrap();
        let mut compressed = vec![0u8; max_compressed_size(data.len())];
        let written = compressor.compress(&data, &mut compressed);
        assert!(written > 0);
        compressed.truncate(written);

        let mut decompressor = Decompressor::new();
        let mut restored = vec![0u8; data.len()];
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &compressed,
            |b, compressed| {
                b.iter(|| {
                    black_box(
                        decompressor
                            .decompress(black_box(compressed), &mut restored)
                            .unwrap(),
                    )
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_compress_levels,
    bench_compress_sizes,
    bench_decompress
);
criterion_main!(benches);
