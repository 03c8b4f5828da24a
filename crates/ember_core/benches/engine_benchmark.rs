//! Soundboard engine benchmarks
//!
//! Measures the control-path cost of voice lifecycle operations and the
//! publish path that feeds a visualizer.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ember_core::{
    AudioSource, BoardConfig, CellId, Envelope, MemoryLoader, NullSink, Soundboard,
};

fn bench_config() -> BoardConfig {
    BoardConfig {
        fade_in: Duration::from_millis(5),
        fade_out: Duration::from_millis(5),
        ..BoardConfig::default()
    }
}

fn bench_loader(cells: usize) -> Box<MemoryLoader> {
    let tone: Vec<f32> = (0..4096)
        .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 48_000.0).sin())
        .collect();
    let mut loader = MemoryLoader::new();
    for index in 0..cells {
        loader.insert(format!("cell_{index}"), AudioSource::new(tone.clone(), 48_000));
    }
    Box::new(loader)
}

fn benchmark_activate_deactivate(c: &mut Criterion) {
    c.bench_function("activate_deactivate_cycle", |b| {
        let board = Soundboard::new(bench_config(), bench_loader(1), Box::new(NullSink)).unwrap();
        let cell = CellId::new("cell_0");

        b.iter(|| {
            board.activate(black_box(&cell)).unwrap();
            board.deactivate(black_box(&cell));
        });
    });
}

fn benchmark_snapshot_reads(c: &mut Criterion) {
    c.bench_function("band_energies_snapshot_16_voices", |b| {
        let board = Soundboard::new(bench_config(), bench_loader(16), Box::new(NullSink)).unwrap();
        for index in 0..16 {
            board.activate(&CellId::new(format!("cell_{index}"))).unwrap();
        }
        std::thread::sleep(Duration::from_millis(100));

        b.iter(|| {
            black_box(board.band_energies());
            black_box(board.volumes());
        });
    });
}

fn benchmark_envelope_sampling(c: &mut Criterion) {
    c.bench_function("envelope_sample", |b| {
        let start = std::time::Instant::now();
        let envelope = Envelope::new(0.0, 1.0, Duration::from_secs(4), start);
        let probe = start + Duration::from_secs(2);

        b.iter(|| black_box(envelope.sample(black_box(probe))));
    });
}

criterion_group!(
    benches,
    benchmark_activate_deactivate,
    benchmark_snapshot_reads,
    benchmark_envelope_sampling
);
criterion_main!(benches);
