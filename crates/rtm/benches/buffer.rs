// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data Path Benchmark
//!
//! Measures the hot path of a data port link:
//! - Ring buffer write + read by capacity and full policy
//! - OutPort::write -> InPort::read over a FLUSH connection by payload size
//!
//! Everything runs on one thread, so the numbers isolate locking and copy
//! overhead from scheduling.

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_precision_loss)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rtm::buffer::{Buffer, RingBuffer, WritePolicy};
use rtm::port::{connect, InPort, OutPort};
use rtm::{ByteData, FactoryRegistry, Properties};
use std::hint::black_box as bb;

/// Write then read one record per iteration
fn bench_ring_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_write_read");
    let record = ByteData::from(vec![0xAB; 64]);

    for capacity in [1usize, 8, 256] {
        let ring: RingBuffer<ByteData> = RingBuffer::new(capacity);
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            b.iter(|| {
                ring.write(bb(record.clone()), None);
                bb(ring.read().ok());
            });
        });
    }
    group.finish();
}

/// Writes into a full ring, per policy
fn bench_ring_full(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_write_full");

    for policy in [WritePolicy::Overwrite, WritePolicy::DoNothing] {
        let ring: RingBuffer<u64> = RingBuffer::with_policy(16, policy);
        for v in 0..16 {
            ring.write(v, None);
        }
        group.bench_function(format!("{:?}", policy), |b| {
            let mut v = 0u64;
            b.iter(|| {
                v = v.wrapping_add(1);
                bb(ring.write(bb(v), None));
            });
        });
    }
    group.finish();
}

/// Encode, push through a direct FLUSH link, read and decode
fn bench_port_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("port_flush_by_size");
    let registry = FactoryRegistry::with_defaults();

    for size in [8usize, 256, 4096, 65536] {
        let out = OutPort::<Vec<u8>>::new("out");
        let inp = InPort::<Vec<u8>>::new("in");
        connect(&out, &inp, Properties::new(), &registry).expect("connect");
        let payload: Vec<u8> = (0..size).map(|_| fastrand::u8(..)).collect();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                out.write(bb(&payload));
                bb(inp.read().ok());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ring_round_trip, bench_ring_full, bench_port_flush);
criterion_main!(benches);
