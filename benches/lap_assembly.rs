use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use overcut::provider::openf1::{CarDataRow, assemble_lap};
use overcut::ui::charts::{Metric, metric_points};
use std::time::Duration;

fn create_sample_rows(count: usize) -> Vec<CarDataRow> {
    let start = Utc.with_ymd_and_hms(2023, 3, 5, 15, 33, 10).unwrap();

    (0..count)
        .map(|i| CarDataRow {
            date: start + ChronoDuration::milliseconds((i * 270) as i64),
            speed: 120.0 + ((i * 7) % 190) as f64,
            n_gear: Some(3 + (i % 5) as u32),
            throttle: Some(((i * 13) % 101) as f64),
            brake: Some(if i % 9 == 0 { 100.0 } else { 0.0 }),
            drs: Some(if i % 15 < 4 { 12 } else { 8 }),
        })
        .collect()
}

fn bench_lap_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("lap_assembly");

    // ~3.7Hz car data over a 90s lap
    let race_lap = create_sample_rows(350);
    group.bench_function("assemble_350_rows", |b| {
        b.iter(|| assemble_lap("VER", 39, 92.608, black_box(&race_lap)).unwrap());
    });

    let dense_lap = create_sample_rows(3000);
    group.bench_function("assemble_3000_rows", |b| {
        b.iter(|| assemble_lap("VER", 39, 92.608, black_box(&dense_lap)).unwrap());
    });

    group.finish();
}

fn bench_chart_points(c: &mut Criterion) {
    let mut group = c.benchmark_group("chart_points");

    let rows = create_sample_rows(3000);
    let lap = assemble_lap("VER", 39, 92.608, &rows).unwrap();

    for metric in Metric::ALL {
        group.bench_function(metric.label(), |b| {
            b.iter(|| black_box(metric_points(black_box(&lap), metric)));
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets = bench_lap_assembly, bench_chart_points
}
criterion_main!(benches);
