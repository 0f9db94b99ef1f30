//! rezsync - housing-management reports into spreadsheet workbooks
//!
//! Pulls query and report results from a StarRez REST backend and keeps
//! spreadsheet sheets in sync with them:
//! - Normalizes JSON record arrays into rectangular grids
//! - Rewrites sheets in place (header, data, trimming, formatting)
//! - Runs audit query sets and writes a pass/fail summary
//! - Serves live-feed and delete-rows actions over HTTP
//!
//! # Usage
//!
//! ```no_run
//! use rezsync::{parse_jobs, sync_reports, BackendClient, ReqwestClient, Settings, XlsxStore};
//! use std::time::Duration;
//!
//! # fn main() -> rezsync::Result<()> {
//! let settings = Settings::load("rezsync.json".as_ref())?;
//! let http = ReqwestClient::new(Duration::from_secs(60))?;
//! let backend = BackendClient::new(http, settings.clone());
//! let store = XlsxStore::new("workbooks");
//! let jobs = parse_jobs(&std::fs::read_to_string("jobs.json")?)?;
//! for job in sync_reports(&backend, &store, &jobs)? {
//!     println!("{}: {:?}", job.report_id, job.result);
//! }
//! # Ok(())
//! # }
//! ```

// Fetch and normalize
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod grid;
pub mod location;
pub mod types;

// Workbooks
pub mod cell_ref;
pub mod color;
pub mod sheet;
pub mod xlsx;
pub mod xml_helpers;

// Operations
pub mod audit;
pub mod dispatch;
pub mod feed;
pub mod notify;
pub mod reconcile;

// Surfaces
pub mod logging;
pub mod server;

pub use audit::{AuditPlan, AuditReport, AuditRunner};
pub use backend::http::{HttpClient, ReqwestClient};
pub use backend::{Backend, BackendClient};
pub use cache::TtlCache;
pub use config::{CredentialProvider, Settings};
pub use dispatch::{Dispatcher, RequestInput};
pub use error::{Result, SyncError};
pub use location::LocationResolver;
pub use notify::{LogNotifier, Notifier};
pub use reconcile::{parse_jobs, reconcile, sync_reports, ReportJob};
pub use sheet::{MemoryStore, Sheet, Workbook, WorkbookStore, XlsxStore};
pub use types::*;

/// Get the library version
#[must_use]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
