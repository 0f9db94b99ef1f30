//! Audit runner: named queries that should return nothing.
//!
//! Every run prepends a block to the `Summary` sheet (a timestamped divider
//! row, then one `(name, glyph)` row per test case, in input order). A
//! failing test case gets its own detail sheet holding the offending
//! records; a passing one has any stale detail sheet removed.

use chrono::{Local, NaiveDateTime};
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::{Result, SyncError};
use crate::grid::records_to_grid;
use crate::notify::{Notification, Notifier};
use crate::reconcile::{format_data_range, FormatPolicy};
use crate::sheet::{RowStyle, Sheet, TargetOptions, Workbook, WorkbookStore};
use crate::types::{AuditResult, AuditStatus, CellValue, Grid, ResponseOutcome, TestCase};

pub const SUMMARY_SHEET: &str = "Summary";
pub const NOTIFICATION_SUBJECT: &str = "StarQL Audit Results";

const TIMESTAMP_PATTERN: &str = r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})$";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DIVIDER_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

const BLACK: &str = "#000000";
const WHITE: &str = "#FFFFFF";
const RED: &str = "#FF0000";
const ORANGE: &str = "#FFA500";

/// An audit as read from a plan file or request.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditPlan {
    #[serde(flatten)]
    pub target: TargetOptions,
    #[serde(default)]
    pub test_cases: Option<Vec<TestCase>>,
    /// Send a notification with the failure count.
    #[serde(default)]
    pub email: bool,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditReport {
    pub divider: String,
    pub results: Vec<AuditResult>,
    pub failures: usize,
    pub errors: usize,
    pub url: String,
}

/// Parse a literal `YYYY-MM-DDTHH:MM:SS` timestamp that is also a real
/// calendar date.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()
}

#[must_use]
pub fn is_valid_date(text: &str) -> bool {
    parse_timestamp(text).is_some()
}

/// Turn timestamp-shaped text cells into dates; everything else passes
/// through.
fn coerce_dates(grid: &mut Grid, pattern: &Regex) {
    for row in grid.rows_mut() {
        for cell in row.iter_mut() {
            if let CellValue::Text(text) = cell {
                if pattern.is_match(text) {
                    if let Some(date) = parse_timestamp(text) {
                        *cell = CellValue::Date(date);
                    }
                }
            }
        }
    }
}

fn summary_style(status: AuditStatus) -> RowStyle {
    let font = match status {
        AuditStatus::Pass => BLACK,
        AuditStatus::Fail => RED,
        AuditStatus::Error => ORANGE,
    };
    RowStyle {
        background: Some(WHITE.into()),
        font_color: Some(font.into()),
        bold: false,
    }
}

/// A test case result plus the detail grid for failures.
struct Verdict {
    result: AuditResult,
    detail: Option<Grid>,
}

impl Verdict {
    fn error(name: &str, message: String) -> Self {
        Self {
            result: AuditResult {
                name: name.to_string(),
                status: AuditStatus::Error,
                records: Vec::new(),
                error: Some(message),
            },
            detail: None,
        }
    }
}

pub struct AuditRunner<B, S, N> {
    backend: B,
    store: S,
    notifier: N,
    format: FormatPolicy,
}

impl<B: Backend, S: WorkbookStore, N: Notifier> AuditRunner<B, S, N> {
    pub fn new(backend: B, store: S, notifier: N) -> Self {
        Self {
            backend,
            store,
            notifier,
            format: FormatPolicy::default(),
        }
    }

    /// Formatting applied to detail sheets.
    #[must_use]
    pub fn with_format(mut self, format: FormatPolicy) -> Self {
        self.format = format;
        self
    }

    /// # Errors
    /// See [`Self::run_at`].
    pub fn run(&self, plan: &AuditPlan) -> Result<AuditReport> {
        self.run_at(plan, Local::now().naive_local())
    }

    /// Run every test case, then write the summary block stamped with `now`.
    ///
    /// Backend failures and unreadable results become `⚠` rows; the batch
    /// goes on.
    ///
    /// # Errors
    /// [`SyncError::Validation`] for a plan without test cases or an unknown
    /// spreadsheet, [`SyncError::Configuration`] from the backend, and
    /// storage errors.
    pub fn run_at(&self, plan: &AuditPlan, now: NaiveDateTime) -> Result<AuditReport> {
        let test_cases = plan
            .test_cases
            .as_deref()
            .ok_or_else(|| {
                SyncError::validation("Failed to find queries: \"testCases\" must be defined in options")
            })?;
        let id = plan.target.resolve()?.spreadsheet.id()?;
        let mut workbook = self.store.open(&id)?;
        let pattern = Regex::new(TIMESTAMP_PATTERN)?;
        workbook.get_or_insert_sheet(SUMMARY_SHEET)?;

        let mut verdicts = Vec::with_capacity(test_cases.len());
        for case in test_cases {
            let verdict = self.evaluate(case, &pattern)?;
            self.apply_detail(&mut workbook, &verdict)?;
            verdicts.push(verdict);
        }

        let divider = format!("Test Set: {}", now.format(DIVIDER_FORMAT));
        write_summary(&mut workbook, &divider, &verdicts)?;
        self.store.save(&id, &workbook)?;

        let results: Vec<AuditResult> = verdicts.into_iter().map(|v| v.result).collect();
        let failures = results
            .iter()
            .filter(|r| r.status == AuditStatus::Fail)
            .count();
        let errors = results
            .iter()
            .filter(|r| r.status == AuditStatus::Error)
            .count();
        let url = self.store.url(&id);
        info!(test_cases = results.len(), failures, errors, "Audit finished");

        let report = AuditReport {
            divider,
            results,
            failures,
            errors,
            url,
        };
        if plan.email {
            self.send_notification(&report);
        }
        Ok(report)
    }

    fn evaluate(&self, case: &TestCase, pattern: &Regex) -> Result<Verdict> {
        if case.name == SUMMARY_SHEET {
            return Ok(Verdict::error(
                &case.name,
                format!("test case may not be named {SUMMARY_SHEET:?}"),
            ));
        }

        let outcome = match self.backend.execute_query(&case.query) {
            Ok(outcome) => outcome,
            Err(e) if e.is_fatal_to_batch() => return Err(e),
            Err(e) => {
                warn!(test_case = %case.name, error = %e, "Audit query failed");
                return Ok(Verdict::error(&case.name, e.to_string()));
            }
        };

        let records = match outcome {
            ResponseOutcome::Success(records) => records,
            ResponseOutcome::Empty => Vec::new(),
            ResponseOutcome::Failure { status, message } => {
                warn!(test_case = %case.name, ?status, %message, "Audit query failed");
                return Ok(Verdict::error(&case.name, message));
            }
        };

        if records.is_empty() {
            info!(test_case = %case.name, "Passed");
            return Ok(Verdict {
                result: AuditResult {
                    name: case.name.clone(),
                    status: AuditStatus::Pass,
                    records,
                    error: None,
                },
                detail: None,
            });
        }

        let mut grid = match records_to_grid(&records) {
            Ok(Some(grid)) => grid,
            Ok(None) => return Err(SyncError::Shape("no records to tabulate".into())),
            Err(e) => {
                warn!(test_case = %case.name, error = %e, "Audit result unreadable");
                return Ok(Verdict::error(&case.name, e.to_string()));
            }
        };
        coerce_dates(&mut grid, pattern);
        warn!(test_case = %case.name, records = records.len(), "Failed");
        Ok(Verdict {
            result: AuditResult {
                name: case.name.clone(),
                status: AuditStatus::Fail,
                records,
                error: None,
            },
            detail: Some(grid),
        })
    }

    /// Create/refresh or remove the test case's detail sheet.
    fn apply_detail(&self, workbook: &mut Workbook, verdict: &Verdict) -> Result<()> {
        let name = &verdict.result.name;
        match (verdict.result.status, &verdict.detail) {
            (AuditStatus::Pass, _) => {
                if workbook.delete_sheet(name)? {
                    info!(test_case = %name, "Removed stale detail sheet");
                }
                Ok(())
            }
            (AuditStatus::Fail, Some(grid)) => {
                let idx = workbook.get_or_insert_sheet(name)?;
                let sheet = workbook
                    .sheet_mut(idx)
                    .ok_or_else(|| SyncError::Range(format!("detail sheet {name:?} vanished")))?;
                write_detail(sheet, grid, &self.format)
            }
            _ => Ok(()),
        }
    }

    fn send_notification(&self, report: &AuditReport) {
        let mut rows = vec![vec![report.divider.clone(), "Result".to_string()]];
        rows.extend(
            report
                .results
                .iter()
                .map(|r| vec![r.name.clone(), r.status.glyph().to_string()]),
        );
        let html = Grid::new(
            rows.first().cloned().unwrap_or_default(),
            rows.iter()
                .skip(1)
                .map(|r| r.iter().map(|c| CellValue::Text(c.clone())).collect())
                .collect(),
        )
        .ok()
        .map(|grid| grid.to_html_table());

        let notification = Notification {
            recipient: None,
            subject: NOTIFICATION_SUBJECT.to_string(),
            body: format!(
                "Number of failures: {}\nSpreadsheet: {}",
                report.failures, report.url
            ),
            html,
        };
        if let Err(e) = self.notifier.notify(&notification) {
            warn!(error = %e, "Failed to send audit notification");
        }
    }
}

fn write_detail(sheet: &mut Sheet, grid: &Grid, format: &FormatPolicy) -> Result<()> {
    sheet.clear_contents();
    sheet.set_tab_color(Some(RED.into()));
    sheet.set_values(0, 0, &grid.to_values());
    sheet.ensure_size(grid.height(), grid.width());
    format_data_range(sheet, format, grid.height())
}

fn write_summary(workbook: &mut Workbook, divider: &str, verdicts: &[Verdict]) -> Result<()> {
    let idx = workbook.get_or_insert_sheet(SUMMARY_SHEET)?;
    let sheet = workbook
        .sheet_mut(idx)
        .ok_or_else(|| SyncError::Range("summary sheet vanished".into()))?;

    sheet.insert_rows(0, verdicts.len() + 1)?;
    sheet.clear_row(0);
    sheet.set_values(0, 0, &[vec![divider.into(), "Result".into()]]);
    sheet.set_row_style(
        0,
        Some(RowStyle {
            background: Some(BLACK.into()),
            font_color: Some(WHITE.into()),
            bold: false,
        }),
    );

    for (offset, verdict) in verdicts.iter().enumerate() {
        let row = offset + 1;
        let result = &verdict.result;
        sheet.set_values(
            row,
            0,
            &[vec![
                result.name.as_str().into(),
                result.status.glyph().into(),
            ]],
        );
        sheet.set_row_style(row, Some(summary_style(result.status)));
    }
    Ok(())
}
