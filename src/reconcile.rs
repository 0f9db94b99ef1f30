//! Sheet reconciler: makes a sheet's live region match a backend outcome.
//!
//! The live region starts at the header row, which is the last frozen row
//! (one row is frozen if none are). Rows above it are left alone.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::backend::Backend;
use crate::color::resolve_color;
use crate::error::{Result, SyncError};
use crate::sheet::{edit_sheet, RowStyle, Sheet, TargetOptions, WorkbookStore};
use crate::types::{Grid, QuerySpec, ResponseOutcome};

/// Placeholder written when the backend reports zero records.
pub const DEFAULT_NO_RECORDS_MESSAGE: &str = "There aren't any records to display";

const BAND_EVEN: &str = "#FFFFFF";
const BAND_ODD: &str = "#FFE4E1";

/// Cosmetic pass applied after data is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPolicy {
    /// Style of the header row; `None` leaves it untouched.
    pub header_style: Option<RowStyle>,
    /// Alternate white / misty-rose backgrounds on data rows.
    pub banded: bool,
}

impl Default for FormatPolicy {
    fn default() -> Self {
        Self {
            header_style: Some(RowStyle {
                background: Some("#FF0000".into()),
                font_color: Some("#FFFFFF".into()),
                bold: true,
            }),
            banded: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileOptions {
    /// Overrides [`DEFAULT_NO_RECORDS_MESSAGE`].
    pub no_records_message: Option<String>,
    pub format: FormatPolicy,
}

/// What a reconciliation did to the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileSummary {
    /// Header plus `rows` data rows were written.
    Written { rows: usize, columns: usize },
    /// No records: the placeholder message was written.
    Placeholder,
    /// Backend failure: the sheet was not touched.
    Skipped {
        status: Option<u16>,
        message: String,
    },
}

/// Apply one outcome to a sheet.
///
/// Running it twice with the same grid leaves the same sheet as running
/// it once.
///
/// # Errors
/// [`SyncError::Range`] if a structural edit falls outside the sheet.
pub fn reconcile(
    sheet: &mut Sheet,
    outcome: &ResponseOutcome<Grid>,
    label: &str,
    options: &ReconcileOptions,
) -> Result<ReconcileSummary> {
    if let ResponseOutcome::Failure { status, message } = outcome {
        warn!(report_id = label, ?status, %message, sheet = sheet.name(), "Skipping processing of report");
        return Ok(ReconcileSummary::Skipped {
            status: *status,
            message: message.clone(),
        });
    }

    if sheet.frozen_rows() == 0 {
        sheet.set_frozen_rows(1);
    }
    let header_row = sheet.frozen_rows() - 1;

    let (keep_rows, summary) = match outcome {
        ResponseOutcome::Success(grid) => {
            sheet.clear_contents_from(header_row);
            sheet.set_values(header_row, 0, &grid.to_values());
            info!(
                report_id = label,
                sheet = sheet.name(),
                rows = grid.rows().len(),
                columns = grid.width(),
                "Wrote report"
            );
            (
                header_row + grid.height(),
                ReconcileSummary::Written {
                    rows: grid.rows().len(),
                    columns: grid.width(),
                },
            )
        }
        _ => {
            let message = options
                .no_records_message
                .as_deref()
                .unwrap_or(DEFAULT_NO_RECORDS_MESSAGE);
            sheet.clear_contents_from(header_row + 1);
            sheet.set_value(header_row + 1, 0, message.into());
            info!(report_id = label, sheet = sheet.name(), "No records to display");
            (header_row + 2, ReconcileSummary::Placeholder)
        }
    };

    format_data_range(sheet, &options.format, keep_rows)?;
    Ok(summary)
}

/// Trim to the first `rows` rows and the columns holding data, style and
/// freeze the header row, optionally band the data rows, and size columns
/// to their content.
///
/// Rows inside the range are kept even when blank.
///
/// # Errors
/// [`SyncError::Range`] from the structural edits.
pub fn format_data_range(sheet: &mut Sheet, policy: &FormatPolicy, rows: usize) -> Result<()> {
    delete_outside_data_range(sheet, rows)?;

    // A sheet must keep one row below the frozen header.
    if sheet.max_rows() == 1 {
        sheet.insert_rows(1, 1)?;
    }
    if sheet.frozen_rows() == 0 {
        sheet.set_frozen_rows(1);
    }
    let header_row = sheet.frozen_rows() - 1;
    if let Some(style) = &policy.header_style {
        sheet.set_row_style(header_row, Some(style.clone()));
    }

    for (offset, row) in (header_row + 1..rows).enumerate() {
        let style = policy.banded.then(|| RowStyle {
            background: Some(if offset % 2 == 0 { BAND_EVEN } else { BAND_ODD }.into()),
            ..RowStyle::default()
        });
        sheet.set_row_style(row, style);
    }

    for col in 0..sheet.last_column() {
        sheet.auto_resize_column(col);
    }
    Ok(())
}

/// Delete every row from `rows` on and every column past the last one
/// holding data.
fn delete_outside_data_range(sheet: &mut Sheet, rows: usize) -> Result<()> {
    let last_column = sheet.last_column();
    if last_column > 0 && last_column < sheet.max_columns() {
        sheet.delete_columns(last_column, sheet.max_columns() - last_column)?;
    }
    if rows > 0 && rows < sheet.max_rows() {
        let excess = sheet.max_rows() - rows;
        debug!(sheet = sheet.name(), excess, "Deleting excess rows");
        sheet.delete_rows(rows, excess)?;
    }
    Ok(())
}

/// One report-to-sheet update, as stored in a jobs file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportJob {
    #[serde(flatten)]
    pub target: TargetOptions,
    pub report_id: String,
    #[serde(default)]
    pub request_body: Option<Value>,
    #[serde(default)]
    pub no_records_message: Option<String>,
    #[serde(default)]
    pub banded: bool,
    /// Header background: a color name or hex.
    #[serde(default)]
    pub header_color: Option<String>,
    #[serde(default)]
    pub header_font_color: Option<String>,
}

impl ReportJob {
    #[must_use]
    pub fn spec(&self) -> QuerySpec {
        QuerySpec::Report {
            report_id: self.report_id.clone(),
            request_body: self.request_body.clone(),
        }
    }

    fn options(&self) -> Result<ReconcileOptions> {
        let mut format = FormatPolicy {
            banded: self.banded,
            ..FormatPolicy::default()
        };
        if let Some(style) = format.header_style.as_mut() {
            if let Some(color) = &self.header_color {
                style.background = Some(resolve_color(color)?);
            }
            if let Some(color) = &self.header_font_color {
                style.font_color = Some(resolve_color(color)?);
            }
        }
        Ok(ReconcileOptions {
            no_records_message: self.no_records_message.clone(),
            format,
        })
    }
}

/// Fetch one report and reconcile its target sheet.
///
/// A backend failure is returned as [`ReconcileSummary::Skipped`] without
/// opening the workbook.
///
/// # Errors
/// Configuration, validation, shape, and storage errors.
pub fn update_sheet_from_report<B, S>(
    backend: &B,
    store: &S,
    job: &ReportJob,
) -> Result<ReconcileSummary>
where
    B: Backend + ?Sized,
    S: WorkbookStore + ?Sized,
{
    let target = job.target.resolve()?;
    let options = job.options()?;
    let outcome = backend.execute(&job.spec())?.into_grid()?;
    if let ResponseOutcome::Failure { status, message } = outcome {
        warn!(report_id = %job.report_id, ?status, %message, "Skipping processing of report");
        return Ok(ReconcileSummary::Skipped { status, message });
    }
    edit_sheet(store, &target, |sheet| {
        reconcile(sheet, &outcome, &job.report_id, &options)
    })
}

/// Result of one job in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub report_id: String,
    /// The error message when the job failed.
    pub result: std::result::Result<ReconcileSummary, String>,
}

/// Run independent report jobs in order.
///
/// A failing job is logged and recorded; its siblings still run. Only a
/// configuration error stops the batch.
///
/// # Errors
/// [`SyncError::Configuration`].
pub fn sync_reports<B, S>(backend: &B, store: &S, jobs: &[ReportJob]) -> Result<Vec<JobReport>>
where
    B: Backend + ?Sized,
    S: WorkbookStore + ?Sized,
{
    let mut reports = Vec::with_capacity(jobs.len());
    for job in jobs {
        let result = match update_sheet_from_report(backend, store, job) {
            Ok(summary) => Ok(summary),
            Err(e) if e.is_fatal_to_batch() => return Err(e),
            Err(e) => {
                error!(report_id = %job.report_id, error = %e, "Report sync failed");
                Err(e.to_string())
            }
        };
        reports.push(JobReport {
            report_id: job.report_id.clone(),
            result,
        });
    }
    let failed = reports.iter().filter(|r| r.result.is_err()).count();
    info!(jobs = jobs.len(), failed, "Report batch finished");
    Ok(reports)
}

/// Parse a jobs file: a JSON array of [`ReportJob`].
///
/// # Errors
/// [`SyncError::Json`] for malformed input.
pub fn parse_jobs(text: &str) -> Result<Vec<ReportJob>> {
    serde_json::from_str(text).map_err(SyncError::from)
}
