use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Cursor;
use zipwright::model::{CompressionMethod, DataSource, ZipEntry, ZipModel};
use zipwright::read::{open_archive, read_entry_content};
use zipwright::write::write_archive;

fn generate_compressible_data(size: usize) -> Vec<u8> {
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        data.extend_from_slice(pattern);
    }
    data.truncate(size);
    data
}

fn generate_random_data(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state = 0x12345678u32;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data
}

fn create_test_zip(data: &[u8], method: CompressionMethod, level: u32) -> Vec<u8> {
    let mut model = ZipModel::new();
    let mut entry = ZipEntry::new_file("test.bin", DataSource::FromBytes(data.to_vec()));
    entry.compression = method;
    entry.compression_level = level;
    model.add(entry, false).unwrap();

    let mut buf = Cursor::new(Vec::new());
    write_archive(model, &mut buf, None).unwrap();
    buf.into_inner()
}

fn read_all_entries(archive: &[u8]) {
    let model = open_archive(Cursor::new(archive)).unwrap();
    for entry in model.entries() {
        let plaintext = read_entry_content(Cursor::new(archive), entry, None).unwrap();
        black_box(plaintext);
    }
}

fn bench_read_compressible_data(c: &mut Criterion) {
    let sizes = vec![
        100 * 1024,       // 100KB
        1024 * 1024,      // 1MB
        10 * 1024 * 1024, // 10MB
    ];

    for size in sizes {
        let mut group = c.benchmark_group(format!("read_compressible_{}", format_size(size)));
        group.throughput(Throughput::Bytes(size as u64));

        let data = generate_compressible_data(size);

        let zip_deflate = create_test_zip(&data, CompressionMethod::Deflate, 6);
        group.bench_function(BenchmarkId::new("deflate_level_6", size), |b| {
            b.iter(|| read_all_entries(&zip_deflate));
        });

        let zip_bzip2 = create_test_zip(&data, CompressionMethod::Bzip2, 6);
        group.bench_function(BenchmarkId::new("bzip2_level_6", size), |b| {
            b.iter(|| read_all_entries(&zip_bzip2));
        });

        group.finish();
    }
}

fn bench_read_random_data(c: &mut Criterion) {
    let sizes = vec![100 * 1024, 1024 * 1024]; // 100KB, 1MB

    for size in sizes {
        let mut group = c.benchmark_group(format!("read_random_{}", format_size(size)));
        group.throughput(Throughput::Bytes(size as u64));

        let data = generate_random_data(size);

        let zip_deflate = create_test_zip(&data, CompressionMethod::Deflate, 6);
        group.bench_function(BenchmarkId::new("deflate_level_6", size), |b| {
            b.iter(|| read_all_entries(&zip_deflate));
        });

        group.finish();
    }
}

fn bench_read_multiple_entries(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_multiple_entries");

    let entry_count = 100;
    let entry_size = 10 * 1024; // 10KB per entry
    group.throughput(Throughput::Bytes((entry_count * entry_size) as u64));

    let data = generate_compressible_data(entry_size);

    let mut model = ZipModel::new();
    for i in 0..entry_count {
        let mut entry = ZipEntry::new_file(
            format!("file_{}.txt", i),
            DataSource::FromBytes(data.clone()),
        );
        entry.compression = CompressionMethod::Deflate;
        entry.compression_level = 6;
        model.add(entry, false).unwrap();
    }
    let mut buf = Cursor::new(Vec::new());
    write_archive(model, &mut buf, None).unwrap();
    let archive = buf.into_inner();

    group.bench_function("deflate_100_entries", |b| {
        b.iter(|| read_all_entries(&archive));
    });

    group.finish();
}

fn bench_read_streaming_vs_full(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_method_comparison");

    let size = 1024 * 1024; // 1MB
    let data = generate_compressible_data(size);
    group.throughput(Throughput::Bytes(size as u64));

    let archive = create_test_zip(&data, CompressionMethod::Deflate, 6);

    group.bench_function("open_and_read_one_entry", |b| {
        b.iter(|| read_all_entries(&archive));
    });

    group.bench_function("open_only", |b| {
        b.iter(|| black_box(open_archive(Cursor::new(&archive)).unwrap()));
    });

    group.finish();
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{}KB", bytes / 1024)
    } else {
        format!("{}MB", bytes / (1024 * 1024))
    }
}

criterion_group!(
    benches,
    bench_read_compressible_data,
    bench_read_random_data,
    bench_read_multiple_entries,
    bench_read_streaming_vs_full
);
criterion_main!(benches);
