// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use streamlib_repeater::{
    frame_deadline_us, FrameCadence, MediaFrame, ReadOptions, RepeaterConfig, RepeaterSource,
    ScriptedSource, SourceParams,
};

fn bench_frame_deadline(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_deadline");

    for rate in [24.0, 30_000.0 / 1_001.0, 60.0, 240.0].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(rate), rate, |b, &rate| {
            let cadence = FrameCadence::new(1_000_000, rate);
            let mut index = 0u64;
            b.iter(|| {
                index = index.wrapping_add(1);
                black_box(cadence.deadline_us(black_box(index)))
            });
        });
    }
    group.finish();
}

fn bench_deadline_far_into_session(c: &mut Criterion) {
    // Ten hours at 60 fps.
    c.bench_function("deadline_far_into_session", |b| {
        b.iter(|| frame_deadline_us(black_box(0), black_box(2_160_000), black_box(60.0)))
    });
}

fn bench_payload_sharing(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload_clone");

    for size in [1024usize, 1920 * 1080 * 4].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let frame = MediaFrame::new(vec![0u8; size], 0, 0);
            b.iter(|| black_box(frame.clone()));
        });
    }
    group.finish();
}

fn bench_repeat_read(c: &mut Criterion) {
    // A very high rate keeps every read on the repeat path without sleeping
    // for long.
    let upstream = ScriptedSource::new().frame(vec![0u8; 1920 * 1080 * 4]).stall();
    let repeater = match RepeaterSource::new(upstream, RepeaterConfig::with_rate(100_000.0)) {
        Ok(repeater) => repeater,
        Err(e) => panic!("repeater config rejected: {e}"),
    };
    if let Err(e) = repeater.start(&SourceParams::new()) {
        panic!("repeater failed to start: {e}");
    }
    let options = ReadOptions::default();
    if let Err(e) = repeater.read(&options) {
        panic!("first frame missing: {e}");
    }

    c.bench_function("repeat_read", |b| {
        b.iter(|| black_box(repeater.read(&options)))
    });

    if let Err(e) = repeater.stop() {
        panic!("repeater failed to stop: {e}");
    }
}

criterion_group!(
    benches,
    bench_frame_deadline,
    bench_deadline_far_into_session,
    bench_payload_sharing,
    bench_repeat_read
);
criterion_main!(benches);
