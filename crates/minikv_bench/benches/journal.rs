//! Journal append and replay benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use minikv_bench::random_bytes;
use minikv_codec::ValueType;
use minikv_core::crypto::{generate_salt, RecordCipher};
use minikv_core::journal::{Journal, Record};
use minikv_core::EncryptionKey;
use minikv_storage::{FileBackend, InMemoryBackend};
use std::sync::Arc;
use tempfile::TempDir;

fn put_record(size: usize) -> Record {
    let mut payload = (size as u32).to_le_bytes().to_vec();
    payload.extend(random_bytes(size));
    Record::Put {
        key: "bench".to_owned(),
        value_type: ValueType::ByteArray,
        payload,
    }
}

fn cipher() -> Arc<RecordCipher> {
    Arc::new(RecordCipher::new(&EncryptionKey::generate(), &generate_salt()).unwrap())
}

/// Benchmark appends to memory, plain and encrypted.
fn bench_append_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_memory");
    for size in [64usize, 1024, 4096] {
        let record = put_record(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("plain", size), &record, |b, record| {
            let mut journal = Journal::new(Box::new(InMemoryBackend::new()), None, false);
            b.iter(|| black_box(journal.append(record).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("encrypted", size), &record, |b, record| {
            let mut journal = Journal::new(Box::new(InMemoryBackend::new()), Some(cipher()), false);
            b.iter(|| black_box(journal.append(record).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark appends to a file with and without fsync.
fn bench_append_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_file");
    group.sample_size(20);
    let record = put_record(1024);

    for sync in [false, true] {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::create_truncated(&dir.path().join("bench.journal")).unwrap();
        let mut journal = Journal::new(Box::new(backend), None, sync);
        let name = if sync { "sync" } else { "no_sync" };
        group.bench_function(name, |b| {
            b.iter(|| black_box(journal.append(&record).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark replaying a journal of N records.
fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    group.sample_size(20);
    for count in [100usize, 1_000] {
        let backend = InMemoryBackend::new();
        let mut journal = Journal::new(Box::new(backend.clone()), None, false);
        let record = put_record(128);
        for _ in 0..count {
            journal.append(&record).unwrap();
        }
        let bytes = backend.data();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, bytes| {
            b.iter(|| {
                let mut journal =
                    Journal::new(Box::new(InMemoryBackend::with_data(bytes.clone())), None, false);
                black_box(journal.replay().unwrap().records.len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_append_memory, bench_append_file, bench_replay);
criterion_main!(benches);
