//! Integration benchmark for the advertisement processing pipeline.
//!
//! Benchmarks the full application loop the same way the tests in app.rs
//! drive it: a FakeScanner feeding advertisements through run_with_io.

use clap::Parser;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use eddystone_listener::app::{Options, Scanner, run_with_io};
use eddystone_listener::{Advertisement, Backend, ScanError};
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

/// UID frame for a tour beacon with the given instance suffix
fn uid_payload(instance: u8) -> Vec<u8> {
    let mut payload = vec![0x00, 0xEE];
    payload.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01]);
    payload.extend_from_slice(&[0, 0, 0, 0, 0, instance]);
    payload
}

/// A fake scanner that replays advertisements, similar to the one in app.rs tests.
struct FakeScanner {
    advertisements: Vec<Advertisement>,
}

impl FakeScanner {
    fn from_payloads(payloads: Vec<Vec<u8>>) -> Self {
        let now = Instant::now();
        let advertisements = payloads
            .into_iter()
            .map(|service_data| Advertisement {
                service_data,
                rssi: -62,
                received_at: now,
            })
            .collect();
        Self { advertisements }
    }
}

impl Scanner for FakeScanner {
    fn start_scan(
        &self,
        _backend: Backend,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Advertisement>, ScanError>> + Send + '_>>
    {
        let advertisements = self.advertisements.clone();
        Box::pin(async move {
            let (tx, rx) = mpsc::channel::<Advertisement>(advertisements.len().max(1));
            tokio::spawn(async move {
                for a in advertisements {
                    let _ = tx.send(a).await;
                }
            });
            Ok(rx)
        })
    }
}

fn default_options() -> Options {
    Options::parse_from(["eddystone-listener"])
}

fn run(rt: &Runtime, scanner: &FakeScanner, capacity: usize) -> Vec<u8> {
    let mut out = Vec::<u8>::with_capacity(capacity);
    rt.block_on(async {
        run_with_io(default_options(), scanner, &mut out)
            .await
            .unwrap();
    });
    out
}

/// Benchmark batches of sightings of a single registered beacon
fn bench_batch_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_pipeline");
    let rt = Runtime::new().unwrap();

    for batch_size in [1, 10, 100] {
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &size| {
                let payloads: Vec<Vec<u8>> = (0..size).map(|_| uid_payload(4)).collect();
                let scanner = FakeScanner::from_payloads(payloads);
                b.iter(|| black_box(run(&rt, &scanner, 256 * size)))
            },
        );
    }

    group.finish();
}

/// Benchmark noise: advertisements that never match (realistic in busy areas)
fn bench_unmatched_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("unmatched_pipeline");
    let rt = Runtime::new().unwrap();

    let payloads: Vec<Vec<u8>> = (0..100u8).map(|i| uid_payload(0x80 | i)).collect();
    let scanner = FakeScanner::from_payloads(payloads);

    group.throughput(Throughput::Elements(100));
    group.bench_function("100_unregistered", |b| {
        b.iter(|| {
            let out = run(&rt, &scanner, 0);
            debug_assert!(out.is_empty());
            black_box(out)
        })
    });

    group.finish();
}

/// Benchmark alternating between registered beacons
fn bench_switching_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("switching_pipeline");
    let rt = Runtime::new().unwrap();

    let payloads: Vec<Vec<u8>> = (0..100u8).map(|i| uid_payload(1 + i % 4)).collect();
    let scanner = FakeScanner::from_payloads(payloads);

    group.throughput(Throughput::Elements(100));
    group.bench_function("4_beacons_round_robin", |b| {
        b.iter(|| black_box(run(&rt, &scanner, 256 * 100)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_batch_pipeline,
    bench_unmatched_pipeline,
    bench_switching_pipeline,
);
criterion_main!(benches);
