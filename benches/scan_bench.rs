use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::io::Cursor;
use tempfile::tempdir;
use wpress::{ExtractOptions, WpressReader, WpressWriter};

fn build_archive(entries: usize, size: usize) -> Vec<u8> {
    let data = vec![42u8; size];
    let mut w = WpressWriter::new(Vec::new());
    for i in 0..entries {
        w.add_entry(&format!("file_{i}.bin"), &format!("dir_{}", i % 16), 0, &data).unwrap();
    }
    w.finish().unwrap()
}

fn bench_count(c: &mut Criterion) {
    let bytes = build_archive(1000, 4096);

    c.bench_function("count_1000_entries", |b| {
        b.iter(|| {
            let mut reader = WpressReader::new(Cursor::new(black_box(&bytes[..]))).unwrap();
            reader.count_entries().unwrap()
        })
    });
}

fn bench_extract(c: &mut Criterion) {
    let bytes = build_archive(16, 1024 * 1024);
    let out = tempdir().unwrap();

    for chunk_size in [512, 64 * 1024] {
        let opts = ExtractOptions::new()
            .output_dir(out.path())
            .chunk_size(chunk_size)
            .preserve_mtime(false);
        c.bench_function(&format!("extract_16x1mb_chunk_{chunk_size}"), |b| {
            b.iter(|| {
                let mut reader = WpressReader::new(Cursor::new(black_box(&bytes[..]))).unwrap();
                reader.extract(&opts).unwrap()
            })
        });
    }
}

criterion_group!(benches, bench_count, bench_extract);
criterion_main!(benches);
