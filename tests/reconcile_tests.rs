//! Report sync: reconciling backend outcomes into workbook sheets.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use common::{cell, failure, records, store_with, text, FakeBackend};
use rezsync::reconcile::{
    reconcile, sync_reports, update_sheet_from_report, ReconcileOptions, ReconcileSummary,
    ReportJob, DEFAULT_NO_RECORDS_MESSAGE,
};
use rezsync::sheet::{Sheet, TargetOptions};
use rezsync::types::{CellValue, ResponseOutcome, Scalar};
use rezsync::{parse_jobs, SyncError};

fn occupancy() -> ResponseOutcome {
    ResponseOutcome::Success(records(&[
        &[("Room_ID", Scalar::Number(101.0)), ("Entry_Name", text("Ada"))],
        &[("Room_ID", Scalar::Number(102.0)), ("Entry_Name", text("Grace"))],
    ]))
}

fn job(report_id: &str, sheet: &str) -> ReportJob {
    ReportJob {
        target: TargetOptions {
            spreadsheet_id: Some("book".into()),
            sheet: Some(sheet.into()),
            create_sheet: true,
            ..TargetOptions::default()
        },
        report_id: report_id.into(),
        request_body: None,
        no_records_message: None,
        banded: false,
        header_color: None,
        header_font_color: None,
    }
}

#[test]
fn test_reconcile_is_idempotent() {
    let grid = match occupancy().into_grid().unwrap() {
        ResponseOutcome::Success(grid) => grid,
        other => panic!("expected a grid, got {other:?}"),
    };
    let outcome = ResponseOutcome::Success(grid);
    let options = ReconcileOptions::default();

    let mut once = Sheet::new("Occupancy");
    reconcile(&mut once, &outcome, "occupancy", &options).unwrap();
    let mut twice = once.clone();
    reconcile(&mut twice, &outcome, "occupancy", &options).unwrap();

    assert_eq!(once, twice);
    assert_eq!(once.value(0, 0), &cell("Room ID"));
    assert_eq!(once.value(0, 1), &cell("Entry Name"));
    assert_eq!(once.value(2, 1), &cell("Grace"));
}

#[test]
fn test_report_job_creates_sheet_and_writes_rows() {
    let store = store_with(vec![Sheet::new("Sheet1")]);
    let backend = FakeBackend::new().with("occupancy", occupancy());

    let summary = update_sheet_from_report(&backend, &store, &job("occupancy", "Rooms")).unwrap();

    assert_eq!(summary, ReconcileSummary::Written { rows: 2, columns: 2 });
    let wb = store.get("book").unwrap();
    let sheet = wb.sheet_by_name("Rooms").unwrap();
    assert_eq!(sheet.value(1, 0), &CellValue::Number(101.0));
    assert_eq!(sheet.max_rows(), 3);
    assert_eq!(sheet.frozen_rows(), 1);
}

#[test]
fn test_empty_report_writes_default_placeholder() {
    let store = store_with(vec![Sheet::new("Sheet1")]);
    let backend = FakeBackend::new().with("vacancies", ResponseOutcome::Empty);

    let summary = update_sheet_from_report(&backend, &store, &job("vacancies", "Sheet1")).unwrap();

    assert_eq!(summary, ReconcileSummary::Placeholder);
    let wb = store.get("book").unwrap();
    assert_eq!(
        wb.sheet(0).unwrap().value(1, 0),
        &cell(DEFAULT_NO_RECORDS_MESSAGE)
    );
}

#[test]
fn test_failed_report_does_not_block_siblings() {
    let store = store_with(vec![Sheet::new("Sheet1")]);
    let backend = FakeBackend::new()
        .with("r1", occupancy())
        .with("r2", failure(500, "Internal error"))
        .with("r3", occupancy());
    let jobs = vec![job("r1", "One"), job("r2", "Two"), job("r3", "Three")];

    let reports = sync_reports(&backend, &store, &jobs).unwrap();

    assert_eq!(backend.calls(), vec!["r1", "r2", "r3"]);
    assert!(matches!(reports[0].result, Ok(ReconcileSummary::Written { .. })));
    assert!(matches!(reports[1].result, Ok(ReconcileSummary::Skipped { .. })));
    assert!(matches!(reports[2].result, Ok(ReconcileSummary::Written { .. })));

    let wb = store.get("book").unwrap();
    assert_eq!(wb.sheet_by_name("One").unwrap().value(0, 0), &cell("Room ID"));
    assert_eq!(wb.sheet_by_name("Three").unwrap().value(0, 0), &cell("Room ID"));
    assert!(wb.sheet_by_name("Two").is_none());
}

#[test]
fn test_invalid_job_is_recorded_and_batch_continues() {
    let store = store_with(vec![Sheet::new("Sheet1")]);
    let backend = FakeBackend::new().with("r1", occupancy());
    let mut missing_sheet = job("r1", "Nope");
    missing_sheet.target.create_sheet = false;

    let reports = sync_reports(&backend, &store, &[missing_sheet, job("r1", "Sheet1")]).unwrap();

    assert_eq!(
        reports[0].result,
        Err("Sheet named \"Nope\" does not exist. Use \"createSheet: true\" to create it.".into())
    );
    assert!(reports[1].result.is_ok());
}

#[test]
fn test_configuration_error_stops_batch() {
    struct Unconfigured;
    impl rezsync::Backend for Unconfigured {
        fn execute_query(&self, _: &str) -> rezsync::Result<ResponseOutcome> {
            Err(SyncError::Configuration("credentials could not be found".into()))
        }
        fn execute_report(
            &self,
            _: &str,
            _: Option<&serde_json::Value>,
        ) -> rezsync::Result<ResponseOutcome> {
            Err(SyncError::Configuration("credentials could not be found".into()))
        }
    }

    let store = store_with(vec![Sheet::new("Sheet1")]);
    let err = sync_reports(&Unconfigured, &store, &[job("r1", "Sheet1")]).unwrap_err();
    assert!(err.is_fatal_to_batch());
}

#[test]
fn test_jobs_file_round_trips_into_sync() {
    let jobs = parse_jobs(
        r#"[
            {"spreadsheetId": "book", "sheet": 0, "reportId": "occupancy", "banded": true},
            {"spreadsheetUrl": "https://docs.google.com/spreadsheets/d/book/edit", "reportId": "vacancies",
             "noRecordsMessage": "All full"}
        ]"#,
    )
    .unwrap();
    let store = store_with(vec![Sheet::new("Sheet1")]);
    let backend = FakeBackend::new()
        .with("occupancy", occupancy())
        .with("vacancies", ResponseOutcome::Empty);

    let reports = sync_reports(&backend, &store, &jobs).unwrap();
    assert!(reports.iter().all(|r| r.result.is_ok()));

    // both jobs target the first sheet; the second one wins
    let wb = store.get("book").unwrap();
    assert_eq!(wb.sheet(0).unwrap().value(1, 0), &cell("All full"));
}
