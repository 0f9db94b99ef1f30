//! Spreadsheet host: the workbook model, how a destination is addressed,
//! and where workbooks are stored.

mod model;
mod store;
mod target;

pub use model::{RowStyle, Sheet, Workbook, DEFAULT_COLUMNS, DEFAULT_ROWS};
pub use store::{edit_sheet, MemoryStore, WorkbookStore, XlsxStore};
pub use target::{SheetSelector, SheetTarget, SpreadsheetLocator, TargetOptions};
