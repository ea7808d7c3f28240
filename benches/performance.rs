// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance benchmarks for axe-setlist
//!
//! Run with: cargo bench
//!
//! These benchmarks measure:
//! - Planning and encoding whole setlists
//! - Decoding inbound device traffic
//! - Event fan-out through the bus

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use axe_setlist::device::{self, Command, DeviceEvent, EventType, Model};
use axe_setlist::midi::{Delivery, EventBus};
use axe_setlist::provision;
use axe_setlist::setlist::Song;

fn songs(count: usize) -> Vec<Song> {
    (0..count)
        .map(|i| Song::new(format!("Song Number {}", i), "Eb", 60 + (i % 120) as u16))
        .collect()
}

/// Benchmark planning (pure command generation)
fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");

    for size in [5, 50, 500].iter() {
        let songs = songs(*size);
        group.bench_with_input(BenchmarkId::new("commands", size), &songs, |b, songs| {
            b.iter(|| provision::plan(Model::AxeFxII, 0, 10, black_box(songs)))
        });

        let sequence = provision::plan(Model::AxeFxII, 0, 10, &songs).unwrap();
        group.bench_with_input(BenchmarkId::new("encode", size), &sequence, |b, sequence| {
            b.iter(|| black_box(sequence.encode()))
        });
    }

    group.finish();
}

/// Benchmark decoding of typical inbound frames
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    // A name reply is the largest frame we routinely receive
    let mut reply = vec![0xF0, 0x00, 0x01, 0x74, 0x03, 0x0F, 0x01, 0x59];
    reply.extend_from_slice(b"[D] Great Are You Lord          ");
    reply.push(device::codec::checksum(&reply));
    reply.push(0xF7);

    let select = device::encode(Model::AxeFxII, &Command::SelectPreset(0));
    let note_on: [u8; 3] = [0x90, 60, 100];

    group.bench_function("preset_name", |b| b.iter(|| device::decode(black_box(&reply))));
    group.bench_function("sysex_header", |b| b.iter(|| device::decode(black_box(&select))));
    group.bench_function("channel_message", |b| {
        b.iter(|| device::decode(black_box(&note_on)))
    });

    group.finish();
}

/// Benchmark dispatch with many listeners registered
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for size in [1, 16, 256].iter() {
        let bus = EventBus::new();
        let subscriptions: Vec<_> = (0..*size)
            .map(|_| bus.subscribe(EventType::PresetName, |_| Delivery::Keep))
            .collect();

        let event = DeviceEvent::PresetName {
            preset: 0,
            name: "Clean".to_string(),
        };
        group.bench_with_input(BenchmarkId::new("listeners", size), &event, |b, event| {
            b.iter(|| bus.dispatch(black_box(event)))
        });

        drop(subscriptions);
    }

    group.finish();
}

criterion_group!(benches, bench_plan, bench_decode, bench_dispatch);

criterion_main!(benches);
