//! Benchmarks for metadata reads over wide, many-stripe files.

use std::hint::black_box;

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use orc_metadata::format::compression::CompressionKind;
use orc_metadata::format::schema::TypeKind;
use orc_metadata::utils::test_data::{TestOrc, int_stats, struct_stats};
use orc_metadata::{CodecSet, ReadOptions, read_metadata, read_metadata_from_path};
use tempfile::tempdir;

#[derive(Clone, Copy)]
struct Config {
    cols: usize,
    stripes: usize,
    compression: CompressionKind,
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}cols_{}stripes_{}",
            self.cols,
            self.stripes,
            self.compression.name().to_lowercase()
        )
    }
}

const CONFIGS: &[Config] = &[
    Config {
        cols: 10,
        stripes: 10,
        compression: CompressionKind::None,
    },
    Config {
        cols: 100,
        stripes: 10,
        compression: CompressionKind::None,
    },
    Config {
        cols: 100,
        stripes: 100,
        compression: CompressionKind::None,
    },
    Config {
        cols: 100,
        stripes: 100,
        compression: CompressionKind::Zlib,
    },
    Config {
        cols: 100,
        stripes: 100,
        compression: CompressionKind::Zstd,
    },
];

fn build_file(config: Config) -> Bytes {
    let mut builder = TestOrc::builder().compression(config.compression);
    for col in 0..config.cols {
        builder = builder.column(&format!("c{col}"), TypeKind::Long);
    }
    for stripe in 0..config.stripes {
        let base = (stripe * 1_000) as i64;
        let mut stats = vec![struct_stats(1_000)];
        stats.extend((0..config.cols).map(|_| int_stats(1_000, base, base + 999)));
        builder = builder.stripe(1_000, stats);
    }
    builder.build()
}

fn bench_trailer_only(c: &mut Criterion) {
    let mut group = c.benchmark_group("trailer_only");
    let options = ReadOptions::default();

    for config in CONFIGS {
        if !CodecSet::linked().contains(config.compression) {
            continue;
        }
        let file = build_file(*config);
        group.bench_with_input(BenchmarkId::from_parameter(config), &file, |b, file| {
            b.iter(|| read_metadata(black_box(file.clone()), &options).unwrap());
        });
    }

    group.finish();
}

fn bench_all_facets(c: &mut Criterion) {
    let mut group = c.benchmark_group("all_facets");
    let options = ReadOptions::all();

    for config in CONFIGS {
        if !CodecSet::linked().contains(config.compression) {
            continue;
        }
        let file = build_file(*config);
        group.throughput(Throughput::Bytes(file.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(config), &file, |b, file| {
            b.iter(|| read_metadata(black_box(file.clone()), &options).unwrap());
        });
    }

    group.finish();
}

fn bench_from_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("from_path");
    let temp_dir = tempdir().unwrap();
    let options = ReadOptions::new()
        .with_schema(true)
        .with_file_statistics(true);

    for config in CONFIGS {
        if !CodecSet::linked().contains(config.compression) {
            continue;
        }
        let path = temp_dir.path().join(format!("{config}.orc"));
        TestOrc::write(&path, &build_file(*config));
        group.bench_with_input(BenchmarkId::from_parameter(config), &path, |b, path| {
            b.iter(|| read_metadata_from_path(black_box(path), &options).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_trailer_only, bench_all_facets, bench_from_path);
criterion_main!(benches);
