//! Where workbooks live between invocations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};
use url::Url;

use super::model::{Sheet, Workbook};
use super::target::SheetTarget;
use crate::error::{Result, SyncError};

/// Opens and saves spreadsheet documents by id.
pub trait WorkbookStore {
    /// # Errors
    /// [`SyncError::Validation`] for an unknown id; storage errors.
    fn open(&self, id: &str) -> Result<Workbook>;

    /// # Errors
    /// Storage errors.
    fn save(&self, id: &str, workbook: &Workbook) -> Result<()>;

    /// Link to the document, used in notifications.
    fn url(&self, id: &str) -> String;
}

impl<T: WorkbookStore + ?Sized> WorkbookStore for &T {
    fn open(&self, id: &str) -> Result<Workbook> {
        (**self).open(id)
    }

    fn save(&self, id: &str, workbook: &Workbook) -> Result<()> {
        (**self).save(id, workbook)
    }

    fn url(&self, id: &str) -> String {
        (**self).url(id)
    }
}

/// Open the target's workbook, run `edit` on the selected sheet, and save.
///
/// Nothing is saved when `edit` fails.
///
/// # Errors
/// Locator/selector validation, storage errors, or the error from `edit`.
pub fn edit_sheet<S, T>(
    store: &S,
    target: &SheetTarget,
    edit: impl FnOnce(&mut Sheet) -> Result<T>,
) -> Result<T>
where
    S: WorkbookStore + ?Sized,
{
    let id = target.spreadsheet.id()?;
    let mut workbook = store.open(&id)?;
    let idx = target.sheet.resolve(&mut workbook)?;
    let sheet = workbook
        .sheet_mut(idx)
        .ok_or_else(|| SyncError::Range(format!("sheet index {idx} vanished")))?;
    let out = edit(sheet)?;
    store.save(&id, &workbook)?;
    Ok(out)
}

/// In-memory store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    books: Mutex<HashMap<String, Workbook>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: impl Into<String>, workbook: Workbook) {
        self.books.lock().insert(id.into(), workbook);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Workbook> {
        self.books.lock().get(id).cloned()
    }
}

impl WorkbookStore for MemoryStore {
    fn open(&self, id: &str) -> Result<Workbook> {
        self.get(id)
            .ok_or_else(|| SyncError::validation("Invalid spreadsheetId"))
    }

    fn save(&self, id: &str, workbook: &Workbook) -> Result<()> {
        self.insert(id, workbook.clone());
        Ok(())
    }

    fn url(&self, id: &str) -> String {
        format!("memory://{id}")
    }
}

/// One `<id>.xlsx` file per spreadsheet under a root directory.
#[derive(Debug, Clone)]
pub struct XlsxStore {
    root: PathBuf,
}

impl XlsxStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// # Errors
    /// [`SyncError::Validation`] for ids that are not safe file stems.
    pub fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SyncError::validation("Invalid spreadsheetId"));
        }
        Ok(self.root.join(format!("{id}.xlsx")))
    }

    /// Create an empty workbook (`Sheet1`). Existing files are left alone.
    ///
    /// Returns `true` if a new file was written.
    ///
    /// # Errors
    /// Invalid id or I/O failures.
    pub fn create(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id)?;
        if path.exists() {
            debug!(path = %path.display(), "Workbook already exists");
            return Ok(false);
        }
        std::fs::create_dir_all(&self.root)?;
        self.save(id, &Workbook::new())?;
        info!(id, path = %path.display(), "Created workbook");
        Ok(true)
    }
}

impl WorkbookStore for XlsxStore {
    fn open(&self, id: &str) -> Result<Workbook> {
        let path = self.path_for(id)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SyncError::validation("Invalid spreadsheetId"));
            }
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), bytes = bytes.len(), "Opened workbook");
        crate::xlsx::read_workbook(&bytes)
    }

    fn save(&self, id: &str, workbook: &Workbook) -> Result<()> {
        let path = self.path_for(id)?;
        let bytes = crate::xlsx::write_workbook(workbook)?;
        // temp file + rename: the old workbook survives a failed write
        let tmp = path.with_extension("xlsx.tmp");
        if let Err(e) = std::fs::write(&tmp, &bytes).and_then(|()| std::fs::rename(&tmp, &path)) {
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                debug!(path = %tmp.display(), error = %cleanup, "Temp workbook not removed");
            }
            return Err(e.into());
        }
        debug!(path = %path.display(), bytes = bytes.len(), "Saved workbook");
        Ok(())
    }

    fn url(&self, id: &str) -> String {
        let path = self.root.join(format!("{id}.xlsx"));
        let absolute = std::path::absolute(&path).unwrap_or(path);
        Url::from_file_path(&absolute)
            .map_or_else(|()| absolute.display().to_string(), |u| u.to_string())
    }
}
