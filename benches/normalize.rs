//! Benchmarks for record normalization, reconciliation, and XLSX saving.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports.
#![allow(
    clippy::expect_used,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rezsync::grid::normalize;
use rezsync::reconcile::{reconcile, ReconcileOptions};
use rezsync::sheet::{Sheet, Workbook};
use rezsync::types::ResponseOutcome;
use rezsync::xlsx::write_workbook;
use serde_json::{json, Value};

/// A report-shaped payload: `rows` records with 12 fields each.
fn payload(rows: usize) -> Value {
    Value::Array(
        (0..rows)
            .map(|i| {
                json!({
                    "Entry_ID": i,
                    "Name_Last": format!("Last{i}"),
                    "Name_First": format!("First{i}"),
                    "Room_Location": "MacArthur Hall",
                    "Room_Space": format!("MAC-{:03}", i % 400),
                    "Bed_Count": (i % 4) as f64,
                    "Date_Start": "2024-08-20T00:00:00",
                    "Date_End": "2025-05-10T00:00:00",
                    "Checked_In": i % 3 == 0,
                    "Term": "Fall",
                    "Balance": (i as f64) * 1.25,
                    "Notes": Value::Null,
                })
            })
            .collect(),
    )
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for rows in [100, 1_000, 5_000] {
        let data = payload(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("records", rows), &data, |b, data| {
            b.iter(|| normalize(Some(black_box(data))).expect("Failed to normalize"))
        });
    }
    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let grid = normalize(Some(&payload(1_000)))
        .expect("Failed to normalize")
        .expect("payload is not empty");
    let outcome = ResponseOutcome::Success(grid);
    let options = ReconcileOptions::default();

    c.bench_function("reconcile_1000", |b| {
        b.iter(|| {
            let mut sheet = Sheet::new("Report");
            reconcile(&mut sheet, black_box(&outcome), "bench", &options)
                .expect("Failed to reconcile")
        })
    });
}

fn bench_write_xlsx(c: &mut Criterion) {
    let grid = normalize(Some(&payload(1_000)))
        .expect("Failed to normalize")
        .expect("payload is not empty");
    let mut sheet = Sheet::new("Report");
    reconcile(
        &mut sheet,
        &ResponseOutcome::Success(grid),
        "bench",
        &ReconcileOptions::default(),
    )
    .expect("Failed to reconcile");
    let workbook = Workbook::from_sheets(vec![sheet]).expect("Failed to build workbook");

    c.bench_function("write_xlsx_1000", |b| {
        b.iter(|| write_workbook(black_box(&workbook)).expect("Failed to write"))
    });
}

criterion_group!(benches, bench_normalize, bench_reconcile, bench_write_xlsx);

criterion_main!(benches);
