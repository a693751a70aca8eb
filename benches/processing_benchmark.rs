use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use radcalnet_processor::models::{wavelengths, ConflictPolicy, SpectralTable, TimeTable};
use radcalnet_processor::readers::parse_daily_file;
use radcalnet_processor::MeasurementStore;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/datastore/BTCN")
}

// One spectral table per day, 13 acquisitions each
fn create_daily_tables(days: usize) -> Vec<SpectralTable> {
    let start = Utc.with_ymd_and_hms(2018, 1, 1, 1, 0, 0).unwrap();

    (0..days)
        .map(|day| {
            let index: Vec<_> = (0..13)
                .map(|slot| start + Duration::days(day as i64) + Duration::minutes(30 * slot))
                .collect();
            let columns: BTreeMap<_, _> = wavelengths()
                .map(|wl| {
                    let values: Vec<f64> = (0..13).map(|slot| 0.1 + (wl as f64) * 1e-4 + slot as f64 * 1e-3).collect();
                    (wl, values)
                })
                .collect();
            TimeTable::from_columns(index, columns).unwrap()
        })
        .collect()
}

fn benchmark_parse_daily_file(c: &mut Criterion) {
    let text = std::fs::read_to_string(fixture_dir().join("BTCN02_2018_148_v02.03.output")).unwrap();

    c.bench_function("parse_daily_file", |b| {
        b.iter(|| parse_daily_file(Cursor::new(black_box(text.as_bytes()))).unwrap())
    });
}

fn benchmark_table_union(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_union");

    for days in [10, 100, 365] {
        let tables = create_daily_tables(days);
        group.bench_with_input(BenchmarkId::new("union_all", days), &tables, |b, tables| {
            b.iter(|| SpectralTable::union_all(black_box(tables.iter()), ConflictPolicy::Reject).unwrap())
        });
    }

    group.finish();
}

fn benchmark_measurement_store(c: &mut Criterion) {
    let paths = vec![
        fixture_dir().join("BTCN02_2018_148_v00.03.input"),
        fixture_dir().join("BTCN02_2018_148_v02.03.output"),
    ];

    let mut group = c.benchmark_group("measurement_store");
    for workers in [1, 2] {
        let store = MeasurementStore::new().with_max_workers(workers);
        group.bench_with_input(BenchmarkId::new("build_from_paths", workers), &paths, |b, paths| {
            b.iter(|| store.build_from_paths(black_box(paths), None).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_parse_daily_file,
    benchmark_table_union,
    benchmark_measurement_store
);
criterion_main!(benches);
