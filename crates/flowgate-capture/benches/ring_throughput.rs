//! Ring buffer handoff benchmark
//!
//! Measures the uncontended push/pop pair cost and full-slot publication
//! into a shared-memory region.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowgate_capture::{RingBuffer, SlotRegion, SlotWriter};
use flowgate_common::{CapturedFrame, FlowKey, Timestamp};
use std::sync::Arc;

fn ring_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");

    group.bench_function("push_pop_u64", |b| {
        let (mut tx, mut rx) = RingBuffer::<u64>::with_capacity(1024);
        b.iter(|| {
            tx.push(black_box(42)).unwrap();
            black_box(rx.pop().unwrap())
        })
    });

    group.finish();
}

fn slot_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("shmem");

    let region = Arc::new(SlotRegion::with_capacity(1024));
    let mut writer = SlotWriter::new(Arc::clone(&region));
    let frame = CapturedFrame::new(&[0xAB; 1500], 1500, Timestamp::now());
    let flow = FlowKey::new(0x0A000001, 0x0A000002, 40000, 443, 6).hash();

    group.bench_function("publish_1500b", |b| {
        b.iter(|| {
            writer.publish(black_box(&frame), black_box(flow));
        })
    });

    group.finish();
}

criterion_group!(benches, ring_push_pop, slot_publish);
criterion_main!(benches);
