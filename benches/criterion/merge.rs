use std::{hint::black_box, sync::Arc};

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use shard_merger::{
    BoundedWindowMerger, EnvelopeWriter, FieldType, HeapMerger, KeyDef, KeyPart, MpValue, Order,
};

const RECORDS_PER_SOURCE: usize = 1024;

fn sources(count: usize) -> Vec<Bytes> {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    (0..count)
        .map(|_| {
            let mut keys: Vec<u64> = (0..RECORDS_PER_SOURCE).map(|_| rng.u64(..1 << 32)).collect();
            keys.sort_unstable();
            let mut writer = EnvelopeWriter::default();
            for key in keys {
                let payload: String = std::iter::repeat_with(|| rng.alphanumeric())
                    .take(32)
                    .collect();
                writer.push(&[MpValue::from(key), MpValue::from(payload.as_str())]);
            }
            writer.finish()
        })
        .collect()
}

fn key_def() -> Arc<KeyDef> {
    Arc::new(KeyDef::new(vec![KeyPart::new(0, FieldType::Unsigned)]).unwrap())
}

fn full_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_merge");
    for count in [2, 8, 32] {
        let buffers = sources(count);
        let total = count * RECORDS_PER_SOURCE;

        group.bench_with_input(BenchmarkId::new("heap", count), &buffers, |b, buffers| {
            let mut merger = HeapMerger::new(key_def());
            b.iter(|| {
                merger.start(buffers.iter().cloned(), Order::Asc).unwrap();
                let mut produced = 0;
                while let Some(record) = merger.next().unwrap() {
                    black_box(record);
                    produced += 1;
                }
                assert_eq!(produced, total);
            });
        });

        group.bench_with_input(BenchmarkId::new("window", count), &buffers, |b, buffers| {
            let merger = BoundedWindowMerger::new(key_def());
            b.iter(|| {
                let records = merger
                    .merge(buffers.iter().cloned(), 0, usize::MAX, Order::Asc)
                    .unwrap();
                assert_eq!(records.len(), total);
                black_box(records);
            });
        });
    }
    group.finish();
}

fn first_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_page");
    for count in [2, 8, 32] {
        let buffers = sources(count);

        group.bench_with_input(BenchmarkId::new("heap", count), &buffers, |b, buffers| {
            let mut merger = HeapMerger::new(key_def());
            b.iter(|| {
                merger.start(buffers.iter().cloned(), Order::Asc).unwrap();
                let page: Vec<_> = merger.drain().skip(100).take(50).collect();
                black_box(page);
            });
        });

        group.bench_with_input(BenchmarkId::new("window", count), &buffers, |b, buffers| {
            let merger = BoundedWindowMerger::new(key_def());
            b.iter(|| {
                let page = merger
                    .merge(buffers.iter().cloned(), 100, 50, Order::Asc)
                    .unwrap();
                black_box(page);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, full_merge, first_page);
criterion_main!(benches);
