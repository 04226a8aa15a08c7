//! Criterion benchmarks for the engine hot paths.
//!
//! Benchmarks:
//! 1. Simulation loop (full run over a synthetic series)
//! 2. Trigger latch over long boolean columns
//! 3. Sizer + fill simulation in isolation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ledgerbt_core::domain::{Bar, Order, OrderSide};
use ledgerbt_core::engine::{
    simulate_fill, size, CostConfig, EngineConfig, Simulation, SizingMode, Thresholds,
};
use ledgerbt_core::latch::{latch_states, PositionState};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            let open = close - 0.3;
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                close + 1.5,
                close - 1.5,
                close,
                1_000_000.0,
            )
        })
        .collect()
}

/// Regime-switching signal: in for 20 bars, out for 10.
fn make_signal(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| if i % 30 < 20 { 1.0 } else { 0.0 })
        .collect()
}

fn make_triggers(n: usize) -> (Vec<bool>, Vec<bool>) {
    let entries = (0..n).map(|i| i % 17 == 0).collect();
    let exits = (0..n).map(|i| i % 23 == 0).collect();
    (entries, exits)
}

// ── 1. Simulation Loop ───────────────────────────────────────────────

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_loop");
    let sim = Simulation::new(EngineConfig::new("SPY", 100_000.0)).unwrap();

    for &bar_count in &[252, 1260, 2520, 25_200] {
        let bars = make_bars(bar_count);
        let signal = make_signal(bar_count);

        group.bench_with_input(
            BenchmarkId::new("regime_signal", bar_count),
            &bar_count,
            |b, _| b.iter(|| sim.run(black_box(&bars), black_box(&signal))),
        );
    }

    group.finish();
}

// ── 2. Latch ─────────────────────────────────────────────────────────

fn bench_latch(c: &mut Criterion) {
    let mut group = c.benchmark_group("latch");

    for &n in &[2520, 100_000] {
        let (entries, exits) = make_triggers(n);
        group.bench_with_input(BenchmarkId::new("latch_states", n), &n, |b, _| {
            b.iter(|| latch_states(black_box(&entries), black_box(&exits), PositionState::Flat))
        });
    }

    group.finish();
}

// ── 3. Sizing and Fills ──────────────────────────────────────────────

fn bench_sizing_and_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("sizing_fill");
    let thresholds = Thresholds::default();
    let costs = CostConfig::default();
    let date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();

    group.bench_function("size_fixed_percent", |b| {
        b.iter(|| {
            size(
                black_box(0.8),
                black_box(100_000.0),
                black_box(101.25),
                SizingMode::FixedPercent,
                0.95,
                &thresholds,
            )
        })
    });

    let order = Order::new("SPY", OrderSide::Buy, 750.0);
    group.bench_function("simulate_fill", |b| {
        b.iter(|| simulate_fill(black_box(&order), date, black_box(101.25), &costs))
    });

    group.finish();
}

criterion_group!(benches, bench_simulation, bench_latch, bench_sizing_and_fill);
criterion_main!(benches);
