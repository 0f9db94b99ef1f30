//! In-memory workbook model: the mutable grid the reconciler works on.
//!
//! Indices are 0-based. A sheet has a grid size (`max_rows` x
//! `max_columns`) that can exceed its data, like a hosted spreadsheet:
//! trailing blank rows exist until deleted.

use crate::error::{Result, SyncError};
use crate::types::CellValue;

/// Grid size of a freshly inserted sheet.
pub const DEFAULT_ROWS: usize = 1000;
pub const DEFAULT_COLUMNS: usize = 26;

/// Approximate pixel width of one character when auto-sizing columns.
const CHAR_WIDTH_PX: f64 = 7.0;
const COLUMN_PADDING_PX: f64 = 10.0;
const MIN_COLUMN_WIDTH_PX: f64 = 40.0;

static EMPTY: CellValue = CellValue::Empty;

/// Whole-row formatting.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct RowStyle {
    /// `#RRGGBB`
    pub background: Option<String>,
    /// `#RRGGBB`
    pub font_color: Option<String>,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Row {
    /// May be shorter than the sheet width; missing cells are empty.
    cells: Vec<CellValue>,
    style: Option<RowStyle>,
}

impl Row {
    fn last_column(&self) -> usize {
        self.cells
            .iter()
            .rposition(|c| !c.is_empty())
            .map_or(0, |i| i + 1)
    }
}

/// A single worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Row>,
    max_columns: usize,
    frozen_rows: usize,
    tab_color: Option<String>,
    /// Pixel widths; `None` = default width.
    col_widths: Vec<Option<f64>>,
}

impl Sheet {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_size(name, DEFAULT_ROWS, DEFAULT_COLUMNS)
    }

    #[must_use]
    pub fn with_size(name: impl Into<String>, rows: usize, columns: usize) -> Self {
        Self {
            name: name.into(),
            rows: vec![Row::default(); rows],
            max_columns: columns,
            frozen_rows: 0,
            tab_color: None,
            col_widths: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grid height.
    #[must_use]
    pub fn max_rows(&self) -> usize {
        self.rows.len()
    }

    /// Grid width.
    #[must_use]
    pub fn max_columns(&self) -> usize {
        self.max_columns
    }

    /// Number of rows up to and including the last non-empty one.
    #[must_use]
    pub fn last_row(&self) -> usize {
        self.rows
            .iter()
            .rposition(|r| r.last_column() > 0)
            .map_or(0, |i| i + 1)
    }

    /// Number of columns up to and including the last non-empty one.
    #[must_use]
    pub fn last_column(&self) -> usize {
        self.rows.iter().map(Row::last_column).max().unwrap_or(0)
    }

    #[must_use]
    pub fn frozen_rows(&self) -> usize {
        self.frozen_rows
    }

    pub fn set_frozen_rows(&mut self, rows: usize) {
        self.frozen_rows = rows;
    }

    #[must_use]
    pub fn tab_color(&self) -> Option<&str> {
        self.tab_color.as_deref()
    }

    pub fn set_tab_color(&mut self, color: Option<String>) {
        self.tab_color = color;
    }

    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.cells.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Stored cells of one row; trailing empty cells may be omitted.
    #[must_use]
    pub fn row_values(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map_or(&[], |r| r.cells.as_slice())
    }

    /// Values of the data range (`last_row` x `last_column`), padded.
    #[must_use]
    pub fn data_values(&self) -> Vec<Vec<CellValue>> {
        let width = self.last_column();
        self.rows
            .iter()
            .take(self.last_row())
            .map(|r| {
                (0..width)
                    .map(|c| r.cells.get(c).cloned().unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    /// Grow the grid to at least `rows` x `columns`.
    pub fn ensure_size(&mut self, rows: usize, columns: usize) {
        if self.rows.len() < rows {
            self.rows.resize(rows, Row::default());
        }
        if self.max_columns < columns {
            self.max_columns = columns;
        }
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: CellValue) {
        self.ensure_size(row + 1, col + 1);
        if let Some(r) = self.rows.get_mut(row) {
            if r.cells.len() <= col {
                r.cells.resize(col + 1, CellValue::Empty);
            }
            if let Some(cell) = r.cells.get_mut(col) {
                *cell = value;
            }
        }
    }

    /// Write a block of values with its top-left corner at (`row`, `col`),
    /// growing the grid as needed.
    pub fn set_values(&mut self, row: usize, col: usize, values: &[Vec<CellValue>]) {
        for (dr, line) in values.iter().enumerate() {
            for (dc, value) in line.iter().enumerate() {
                self.set_value(row + dr, col + dc, value.clone());
            }
        }
    }

    /// Insert `count` blank rows before `at` (`at == max_rows` appends).
    ///
    /// # Errors
    /// [`SyncError::Range`] when `at` is past the end of the grid.
    pub fn insert_rows(&mut self, at: usize, count: usize) -> Result<()> {
        if at > self.rows.len() {
            return Err(SyncError::Range(format!(
                "cannot insert before row {} of {} in sheet {:?}",
                at + 1,
                self.rows.len(),
                self.name
            )));
        }
        let tail = self.rows.split_off(at);
        self.rows.extend(std::iter::repeat(Row::default()).take(count));
        self.rows.extend(tail);
        Ok(())
    }

    /// Delete `count` rows starting at `at`.
    ///
    /// # Errors
    /// [`SyncError::Range`] when the span leaves the grid.
    pub fn delete_rows(&mut self, at: usize, count: usize) -> Result<()> {
        let end = at
            .checked_add(count)
            .filter(|end| *end <= self.rows.len())
            .ok_or_else(|| {
                SyncError::Range(format!(
                    "rows {}..{} are outside sheet {:?} ({} rows)",
                    at + 1,
                    at + count,
                    self.name,
                    self.rows.len()
                ))
            })?;
        self.rows.drain(at..end);
        if self.frozen_rows > self.rows.len() {
            self.frozen_rows = self.rows.len();
        }
        Ok(())
    }

    /// Delete `count` columns starting at `at`.
    ///
    /// # Errors
    /// [`SyncError::Range`] when the span leaves the grid.
    pub fn delete_columns(&mut self, at: usize, count: usize) -> Result<()> {
        let end = at
            .checked_add(count)
            .filter(|end| *end <= self.max_columns)
            .ok_or_else(|| {
                SyncError::Range(format!(
                    "columns {}..{} are outside sheet {:?} ({} columns)",
                    at + 1,
                    at + count,
                    self.name,
                    self.max_columns
                ))
            })?;
        for row in &mut self.rows {
            if row.cells.len() > at {
                let stop = end.min(row.cells.len());
                row.cells.drain(at..stop);
            }
        }
        if self.col_widths.len() > at {
            let stop = end.min(self.col_widths.len());
            self.col_widths.drain(at..stop);
        }
        self.max_columns -= count;
        Ok(())
    }

    /// Clear every value; formatting and grid size are kept.
    pub fn clear_contents(&mut self) {
        self.clear_contents_from(0);
    }

    /// Clear values of rows `from..max_rows`.
    pub fn clear_contents_from(&mut self, from: usize) {
        for row in self.rows.iter_mut().skip(from) {
            row.cells.clear();
        }
    }

    /// Clear values and row formatting of one row.
    pub fn clear_row(&mut self, row: usize) {
        if let Some(r) = self.rows.get_mut(row) {
            *r = Row::default();
        }
    }

    #[must_use]
    pub fn row_style(&self, row: usize) -> Option<&RowStyle> {
        self.rows.get(row).and_then(|r| r.style.as_ref())
    }

    pub fn set_row_style(&mut self, row: usize, style: Option<RowStyle>) {
        self.ensure_size(row + 1, 0);
        if let Some(r) = self.rows.get_mut(row) {
            r.style = style;
        }
    }

    /// Explicit pixel width of a column, if one was set.
    #[must_use]
    pub fn column_width(&self, col: usize) -> Option<f64> {
        self.col_widths.get(col).copied().flatten()
    }

    pub fn set_column_width(&mut self, col: usize, width: Option<f64>) {
        if self.col_widths.len() <= col {
            self.col_widths.resize(col + 1, None);
        }
        if let Some(slot) = self.col_widths.get_mut(col) {
            *slot = width;
        }
    }

    /// Size a column to its longest displayed value.
    #[allow(clippy::cast_precision_loss)]
    pub fn auto_resize_column(&mut self, col: usize) {
        let longest = self
            .rows
            .iter()
            .filter_map(|r| r.cells.get(col))
            .map(|c| c.display().chars().count())
            .max()
            .unwrap_or(0);
        let width = (longest as f64 * CHAR_WIDTH_PX + COLUMN_PADDING_PX).max(MIN_COLUMN_WIDTH_PX);
        self.set_column_width(col, Some(width));
    }
}

/// An ordered set of uniquely named sheets.
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// A workbook with a single empty `Sheet1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sheets: vec![Sheet::new("Sheet1")],
        }
    }

    /// # Errors
    /// [`SyncError::Validation`] for an empty list or duplicate names.
    pub fn from_sheets(sheets: Vec<Sheet>) -> Result<Self> {
        if sheets.is_empty() {
            return Err(SyncError::validation("a workbook needs at least one sheet"));
        }
        for (idx, sheet) in sheets.iter().enumerate() {
            if sheets.iter().skip(idx + 1).any(|s| s.name == sheet.name) {
                return Err(SyncError::validation(format!(
                    "duplicate sheet name {:?}",
                    sheet.name
                )));
            }
        }
        Ok(Self { sheets })
    }

    #[must_use]
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    #[must_use]
    pub fn sheet(&self, idx: usize) -> Option<&Sheet> {
        self.sheets.get(idx)
    }

    pub fn sheet_mut(&mut self, idx: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(idx)
    }

    #[must_use]
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name == name)
    }

    #[must_use]
    pub fn sheet_by_name(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_by_name_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    /// Append a new default-sized sheet; returns its index.
    ///
    /// # Errors
    /// [`SyncError::Validation`] if the name is blank or taken.
    pub fn insert_sheet(&mut self, name: &str) -> Result<usize> {
        if name.trim().is_empty() {
            return Err(SyncError::validation("sheet name must not be blank"));
        }
        if self.sheet_index(name).is_some() {
            return Err(SyncError::validation(format!(
                "A sheet with the name \"{name}\" already exists."
            )));
        }
        self.sheets.push(Sheet::new(name));
        Ok(self.sheets.len() - 1)
    }

    /// Index of the named sheet, inserting it if absent.
    ///
    /// # Errors
    /// See [`Self::insert_sheet`].
    pub fn get_or_insert_sheet(&mut self, name: &str) -> Result<usize> {
        match self.sheet_index(name) {
            Some(idx) => Ok(idx),
            None => self.insert_sheet(name),
        }
    }

    /// Remove a sheet by name. Returns `false` if there was no such sheet.
    ///
    /// # Errors
    /// [`SyncError::Range`] when it is the only sheet.
    pub fn delete_sheet(&mut self, name: &str) -> Result<bool> {
        let Some(idx) = self.sheet_index(name) else {
            return Ok(false);
        };
        if self.sheets.len() == 1 {
            return Err(SyncError::Range(format!(
                "cannot delete {name:?}, the only sheet in the workbook"
            )));
        }
        self.sheets.remove(idx);
        Ok(true)
    }
}
