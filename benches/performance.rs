// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance benchmarks for keytape
//!
//! Run with: cargo bench
//!
//! These benchmarks measure:
//! - Timer queue insert and drain
//! - Note capture throughput
//! - Metadata derivation
//! - Export and import of large recordings

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use keytape::recording::Recorder;
use keytape::{
    ExportFormat, ManualClock, QueueScheduler, RecordedNote, Recording, RecordingCodec,
    RecordingMetadata, Scheduler, SoundConfig, TimerTask,
};

fn synthetic_recording(count: usize) -> Recording {
    let instruments = ["piano", "synth", "bass", "organ"];
    let notes: Vec<RecordedNote> = (0..count)
        .map(|i| {
            let sound = SoundConfig::new(instruments[i % instruments.len()], "C", 4, 261.63);
            RecordedNote::new(i as u64 * 50, format!("k{}", i % 32), sound, 120)
        })
        .collect();

    let mut recording = Recording::new("Bench", 1_700_000_000_000);
    recording.duration = count as u64 * 50 + 120;
    recording.metadata = Some(RecordingMetadata::from_notes(&notes));
    recording.notes = notes;
    recording
}

/// Benchmark the virtual-time timer queue
fn bench_queue_scheduler(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_scheduler");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::new("schedule", size), size, |b, &size| {
            b.iter(|| {
                let mut scheduler = QueueScheduler::new(ManualClock::new(0));
                for i in 0..size {
                    scheduler.schedule(Duration::from_millis(i as u64 * 10), TimerTask::PlaybackNote(i));
                }
                black_box(scheduler.pending())
            })
        });

        group.bench_with_input(BenchmarkId::new("drain", size), size, |b, &size| {
            b.iter_batched(
                || {
                    let clock = ManualClock::new(0);
                    let mut scheduler = QueueScheduler::new(clock.clone());
                    for i in 0..size {
                        scheduler.schedule(Duration::from_millis(i as u64 * 10), TimerTask::PlaybackNote(i));
                    }
                    clock.set(size as u64 * 10);
                    scheduler
                },
                |mut scheduler| black_box(scheduler.poll().len()),
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("cancel_all", size), size, |b, &size| {
            b.iter_batched(
                || {
                    let mut scheduler = QueueScheduler::new(ManualClock::new(0));
                    let handles: Vec<_> = (0..size)
                        .map(|i| scheduler.schedule(Duration::from_millis(i as u64), TimerTask::PlaybackNote(i)))
                        .collect();
                    (scheduler, handles)
                },
                |(mut scheduler, handles)| {
                    for handle in handles {
                        scheduler.cancel(handle);
                    }
                    black_box(scheduler.pending())
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Benchmark key capture with overlapping held keys
fn bench_capture(c: &mut Criterion) {
    let sound = SoundConfig::default();
    let keys: Vec<String> = (0..16).map(|i| format!("k{}", i)).collect();

    c.bench_function("capture_1000_notes", |b| {
        b.iter(|| {
            let mut recorder = Recorder::new(u64::MAX);
            recorder.start("Bench", 0);
            let mut now = 0;
            for i in 0..1000 {
                let key = &keys[i % keys.len()];
                recorder.note_start(key, &sound, now);
                now += 5;
                recorder.note_end(key, &sound, now);
            }
            black_box(recorder.stop(now).map(|r| r.notes.len()))
        })
    });
}

/// Benchmark metadata derivation
fn bench_metadata(c: &mut Criterion) {
    let mut group = c.benchmark_group("metadata");

    for count in [10, 100, 1000].iter() {
        let notes = synthetic_recording(*count).notes;
        group.bench_with_input(BenchmarkId::new("from_notes", count), &notes, |b, notes| {
            b.iter(|| RecordingMetadata::from_notes(black_box(notes)))
        });
    }

    group.finish();
}

/// Benchmark the interchange codec
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let recording = synthetic_recording(1000);

    for format in [ExportFormat::Json, ExportFormat::Yaml] {
        let codec = RecordingCodec::with_format(format);
        let name = format.extension();
        let text = codec.export(&recording).unwrap_or_default();

        group.bench_function(BenchmarkId::new("export", name), |b| {
            b.iter(|| codec.export(black_box(&recording)))
        });
        group.bench_function(BenchmarkId::new("import", name), |b| {
            b.iter(|| codec.import(black_box(&text)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_queue_scheduler,
    bench_capture,
    bench_metadata,
    bench_codec,
);

criterion_main!(benches);
