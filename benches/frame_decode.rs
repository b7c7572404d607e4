//! Benchmarks for frame decoding and the drain pass
//!
//! - Header parse plus payload decode for common detector frame sizes
//! - Big-endian payloads, which take the byte-swapping path
//! - One receiver drain pass over a burst, where only the last frame survives
//!
//! Platform: Cross-platform (in-process channel, CI-safe)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use liveview::subscriptions::memory;
use liveview::test_utils::patterned_message;
use liveview::{DType, Drain, FrameReceiver, ReceiverConfig, Subscription, decode_frame};
use std::hint::black_box;
use tokio_util::sync::CancellationToken;

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_frame");

    for (dtype, side) in [(DType::UInt8, 512), (DType::UInt16, 512), (DType::UInt16, 2048), (DType::Float32, 1024)] {
        let message = patterned_message(dtype, side, side);
        group.throughput(Throughput::Bytes(message.payload.len() as u64));
        group.bench_with_input(
            BenchmarkId::new(dtype.as_str(), format!("{side}x{side}")),
            &message,
            |b, message| {
                b.iter(|| black_box(decode_frame(black_box(&message.header), black_box(&message.payload))))
            },
        );
    }

    group.finish();
}

fn bench_big_endian(c: &mut Criterion) {
    let message = patterned_message(DType::UInt16, 1024, 1024);
    let header = br#"{"dtype": ">u2", "shape": [1024, 1024]}"#;

    let mut group = c.benchmark_group("decode_byte_order");
    group.throughput(Throughput::Bytes(message.payload.len() as u64));
    group.bench_function("native", |b| b.iter(|| black_box(decode_frame(&message.header, &message.payload))));
    group.bench_function("swapped", |b| b.iter(|| black_box(decode_frame(header, &message.payload))));
    group.finish();
}

fn bench_drain_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain_burst");

    for burst in [1usize, 8, 64] {
        let message = patterned_message(DType::UInt16, 256, 256);
        group.throughput(Throughput::Elements(burst as u64));
        group.bench_with_input(BenchmarkId::from_parameter(burst), &burst, |b, &burst| {
            let (publisher, mut subscription) = memory::channel(burst);
            subscription.connect("inproc://bench").expect("memory connect");
            let mut receiver = FrameReceiver::new(subscription, &ReceiverConfig::default());
            let cancel = CancellationToken::new();

            b.iter(|| {
                for _ in 0..burst {
                    publisher.push(message.header.clone(), message.payload.clone());
                }
                match receiver.poll_once(&cancel) {
                    Drain::Complete(latest) => black_box(latest),
                    _ => unreachable!("bench channel never cancels or disconnects"),
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_big_endian, bench_drain_burst);
criterion_main!(benches);
