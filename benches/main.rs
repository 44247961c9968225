use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use quickmatch::{Engine, EngineConfig, Items};

const TINY_LINE_COUNT: u32 = 100;
const SMALL_LINE_COUNT: u32 = 1_000;
const MEDIUM_LINE_COUNT: u32 = 50_000;
const LARGE_LINE_COUNT: u32 = 500_000;
const XLARGE_LINE_COUNT: u32 = 5_000_000;
const XXLARGE_LINE_COUNT: u32 = 20_000_000;

fn grow_items(c: &mut Criterion) {
    let mut group = c.benchmark_group("grow_items");
    for line_count in [
        TINY_LINE_COUNT,
        SMALL_LINE_COUNT,
        MEDIUM_LINE_COUNT,
        LARGE_LINE_COUNT,
        XLARGE_LINE_COUNT,
        XXLARGE_LINE_COUNT,
    ] {
        let lines = random_lines(line_count);

        group.bench_with_input(BenchmarkId::new("push", line_count), &lines, |b, lines| {
            b.iter(|| {
                let mut items = Items::new();
                for line in lines {
                    items.push(line.as_bytes()).unwrap();
                }
            });
        });
    }
}

/// End-to-end: pushes `line_count` items into a running [`Engine`], sets a
/// query and commits it, then spins until the callback fires and the
/// result snapshot is visible. Item loading happens in the untimed setup
/// half of `iter_batched`; only the query/commit/merge round-trip is
/// measured.
fn query_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_throughput");
    group.sample_size(10);
    for line_count in [
        TINY_LINE_COUNT,
        SMALL_LINE_COUNT,
        MEDIUM_LINE_COUNT,
        LARGE_LINE_COUNT,
        XLARGE_LINE_COUNT,
        XXLARGE_LINE_COUNT,
    ] {
        let lines = random_lines(line_count);
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        group.bench_with_input(BenchmarkId::new("query", line_count), &lines, |b, lines| {
            b.iter_batched(
                || {
                    let notified = Arc::new(AtomicBool::new(false));
                    let cb_notified = notified.clone();
                    let mut engine = Engine::new(
                        EngineConfig::new(threads),
                        Arc::new(move || cb_notified.store(true, Ordering::Release)),
                    );
                    for line in lines {
                        engine.push_item(line.as_bytes()).unwrap();
                    }
                    engine.start().unwrap();
                    (engine, notified)
                },
                |(mut engine, notified)| {
                    engine.set_query(b"amor");
                    engine.commit().unwrap();
                    while !notified.load(Ordering::Acquire) {
                        std::hint::spin_loop();
                    }
                    engine.load_results();
                    engine.stop();
                },
                BatchSize::PerIteration,
            );
        });
    }
}

fn random_lines(count: u32) -> Vec<String> {
    let count = i64::from(count);
    let word_count = 1;
    (0..count).map(|_| fakeit::words::sentence(word_count)).collect()
}

criterion_group!(benches, grow_items, query_throughput);
criterion_main!(benches);
