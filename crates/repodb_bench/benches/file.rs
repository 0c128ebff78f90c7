//! File-backed context benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use repodb_bench::{bench_context, generate_people};
use repodb_core::{FileContext, FileMapping};
use repodb_storage::InMemoryBackend;
use repodb_testkit::Person;
use std::sync::Arc;

fn file_context(backend: &Arc<InMemoryBackend>, json: bool) -> FileContext {
    let ctx = FileContext::new(bench_context());
    let backend = Box::new(Arc::clone(backend));
    if json {
        ctx.register(FileMapping::<Person>::json(backend));
    } else {
        ctx.register(FileMapping::<Person>::cbor(backend));
    }
    ctx
}

/// Benchmark a commit followed by a full partition write.
fn bench_save_and_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("save_and_flush");

    for (format, json) in [("json", true), ("cbor", false)] {
        for count in [100usize, 1000] {
            group.throughput(Throughput::Elements(count as u64));
            group.bench_with_input(BenchmarkId::new(format, count), &count, |b, &count| {
                let backend = Arc::new(InMemoryBackend::new());
                let ctx = file_context(&backend, json);
                for person in generate_people(count) {
                    ctx.add(person);
                }
                ctx.save_changes().unwrap();

                b.iter(|| {
                    ctx.add(Person::new("next", 30));
                    black_box(ctx.save_changes().unwrap());
                });
            });
        }
    }
    group.finish();
}

/// Benchmark reloading a partition written by another context.
fn bench_reload(c: &mut Criterion) {
    let mut group = c.benchmark_group("reload");

    for count in [100usize, 1000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let backend = Arc::new(InMemoryBackend::new());
            let writer = file_context(&backend, false);
            for person in generate_people(count) {
                writer.add(person);
            }
            writer.save_changes().unwrap();

            b.iter(|| {
                let reader = file_context(&backend, false);
                black_box(reader.count::<Person>().unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_save_and_flush, bench_reload);
criterion_main!(benches);
