use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Cursor;
use zipwright::crypto::winzip_aes::WinZipAesEncryptWriter;
use zipwright::model::{CompressionMethod, DataSource, EncryptionMethod, ZipEntry, ZipModel};
use zipwright::write::write_archive;

fn generate_data(size: usize) -> Vec<u8> {
    // Generate compressible data (repeating pattern)
    let mut data = Vec::with_capacity(size);
    let pattern = b"This is a test pattern that repeats. Lorem ipsum dolor sit amet. ";
    for _ in 0..(size / pattern.len() + 1) {
        data.extend_from_slice(pattern);
    }
    data.truncate(size);
    data
}

fn write_one_entry(data: &[u8], encryption: EncryptionMethod, password: Option<&str>) -> Vec<u8> {
    let mut model = ZipModel::new();
    let mut entry = ZipEntry::new_file("test.txt", DataSource::FromBytes(data.to_vec()));
    entry.compression = CompressionMethod::Store;
    if let Some(pw) = password {
        entry.set_encryption(encryption, Some(pw.as_bytes().to_vec()));
    }
    model.add(entry, false).unwrap();

    let mut buf = Cursor::new(Vec::new());
    write_archive(model, &mut buf, None).unwrap();
    buf.into_inner()
}

fn bench_encryption(c: &mut Criterion) {
    let sizes = vec![1024, 10 * 1024, 100 * 1024, 1024 * 1024]; // 1KB, 10KB, 100KB, 1MB

    let mut group = c.benchmark_group("encryption_overhead");

    for size in sizes {
        let data = generate_data(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("no_encryption", size), &data, |b, data| {
            b.iter(|| black_box(write_one_entry(data, EncryptionMethod::None, None)));
        });

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::new("aes256_encryption", size),
            &data,
            |b, data| {
                b.iter(|| {
                    black_box(write_one_entry(
                        data,
                        EncryptionMethod::Aes256,
                        Some("benchmark_password_123"),
                    ))
                });
            },
        );
    }

    group.finish();
}

fn bench_memory_usage(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_usage");

    // Test with 10MB file to see memory footprint
    let large_data = generate_data(10 * 1024 * 1024);

    group.bench_function("10mb_no_encryption", |b| {
        b.iter(|| black_box(write_one_entry(&large_data, EncryptionMethod::None, None)));
    });

    group.bench_function("10mb_aes256_encryption", |b| {
        b.iter(|| {
            black_box(write_one_entry(
                &large_data,
                EncryptionMethod::Aes256,
                Some("test_password"),
            ))
        });
    });

    group.finish();
}

fn bench_pbkdf2_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_derivation");

    // Key derivation happens on writer construction, before any plaintext
    // is touched, so this isolates PBKDF2-HMAC-SHA1's fixed cost.
    group.bench_function("pbkdf2_1000_iterations", |b| {
        b.iter(|| {
            let mut sink = Vec::new();
            let writer = WinZipAesEncryptWriter::new(
                &mut sink,
                EncryptionMethod::Aes256,
                black_box(b"test_password_123"),
            )
            .unwrap();
            black_box(writer);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_encryption,
    bench_memory_usage,
    bench_pbkdf2_overhead
);
criterion_main!(benches);
