//! Benchmarks for the SSVEP detection path

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use mindmaze_native::processing::{
    cca::canonical_correlation,
    filters::BandpassFilter,
    spectrum::SpectralAnalyzer,
    ssvep::{reference_block, EegWindow, SsvepConfig, SsvepDetector},
};
use mindmaze_native::simulation::{SsvepSimulator, SyntheticParams};

const SAMPLE_RATE: f64 = 250.0;

/// Eight channels of simulated EEG attending 10 Hz
fn generate_window(n: usize) -> EegWindow {
    let params = SyntheticParams { frequencies: vec![10.0], ..SyntheticParams::default() };
    let mut sim = SsvepSimulator::new(params, 42);
    EegWindow::new(sim.generate(n), SAMPLE_RATE).expect("simulated window")
}

fn bench_bandpass(c: &mut Criterion) {
    let mut group = c.benchmark_group("bandpass_zero_phase");
    let filter = BandpassFilter::new(4, SAMPLE_RATE, 5.0, 30.0).expect("filter");

    for size in [250, 500, 1000, 2000].iter() {
        let window = generate_window(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(filter.filter_zero_phase(black_box(&window.channels[7]))));
        });
    }

    group.finish();
}

fn bench_cca(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonical_correlation");

    for size in [500, 1000].iter() {
        let window = generate_window(*size);
        let x = nalgebra::DMatrix::from_fn(*size, 3, |r, col| window.channels[[0, 4, 7][col]][r]);
        let y = reference_block(10.0, SAMPLE_RATE, *size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(canonical_correlation(black_box(&x), black_box(&y))));
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("ssvep_classify");
    let window = generate_window(1000);

    group.bench_function("window_1000x8", |b| {
        let mut detector = SsvepDetector::new(SsvepConfig::default(), SAMPLE_RATE).expect("detector");
        b.iter(|| black_box(detector.classify(black_box(&window))));
    });

    group.finish();
}

fn bench_psd(c: &mut Criterion) {
    let mut group = c.benchmark_group("psd");

    for size in [256, 1024].iter() {
        let window = generate_window(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut analyzer = SpectralAnalyzer::new(size, SAMPLE_RATE);
            b.iter(|| black_box(analyzer.compute_psd(black_box(&window.channels[7]))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_bandpass, bench_cca, bench_classify, bench_psd);

criterion_main!(benches);
