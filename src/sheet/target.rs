//! Where an operation writes: a spreadsheet locator plus a sheet selector.

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::model::Workbook;
use crate::error::{Result, SyncError};

/// Identifies a spreadsheet document by id or URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetLocator {
    Id(String),
    Url(String),
}

impl SpreadsheetLocator {
    /// Resolve to a spreadsheet id.
    ///
    /// Hosted URLs carry the id in a `/d/<id>/` segment; `file://` URLs
    /// use the file stem.
    ///
    /// # Errors
    /// [`SyncError::Validation`] for a blank id or an unrecognised URL.
    pub fn id(&self) -> Result<String> {
        match self {
            Self::Id(id) => {
                let id = id.trim();
                if id.is_empty() {
                    return Err(SyncError::validation("Invalid spreadsheetId"));
                }
                Ok(id.to_string())
            }
            Self::Url(raw) => id_from_url(raw),
        }
    }
}

fn id_from_url(raw: &str) -> Result<String> {
    let invalid = || SyncError::validation(format!("Invalid spreadsheetUrl: {raw}"));
    let url = Url::parse(raw).map_err(|_| invalid())?;

    if url.scheme() == "file" {
        let path = url.to_file_path().map_err(|()| invalid())?;
        return path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .ok_or_else(invalid);
    }

    let mut segments = url.path_segments().ok_or_else(invalid)?;
    while let Some(segment) = segments.next() {
        if segment == "d" {
            return segments
                .next()
                .filter(|id| !id.is_empty())
                .map(ToString::to_string)
                .ok_or_else(invalid);
        }
    }
    Err(invalid())
}

/// Picks one sheet in a workbook.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SheetSelector {
    #[default]
    First,
    Index(usize),
    Name { name: String, create: bool },
}

impl SheetSelector {
    /// Index of the selected sheet, inserting a named sheet when `create`
    /// is set.
    ///
    /// # Errors
    /// [`SyncError::Validation`] when the sheet does not exist.
    pub fn resolve(&self, workbook: &mut Workbook) -> Result<usize> {
        match self {
            Self::First => Ok(0),
            Self::Index(idx) => {
                if workbook.sheet(*idx).is_some() {
                    Ok(*idx)
                } else {
                    Err(SyncError::validation(format!(
                        "Sheet #{idx} does not exist (note first sheet is 0)"
                    )))
                }
            }
            Self::Name { name, create } => match workbook.sheet_index(name) {
                Some(idx) => Ok(idx),
                None if *create => workbook.insert_sheet(name),
                None => Err(SyncError::validation(format!(
                    "Sheet named \"{name}\" does not exist. Use \"createSheet: true\" to create it."
                ))),
            },
        }
    }

    /// Interpret a JSON `sheet` option: absent/null, a number, or a string.
    ///
    /// # Errors
    /// [`SyncError::Validation`] for any other JSON kind.
    pub fn from_option(sheet: Option<&Value>, create: bool) -> Result<Self> {
        match sheet {
            None | Some(Value::Null) => Ok(Self::First),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Self::Index)
                .ok_or_else(|| {
                    SyncError::validation(format!(
                        "Sheet #{n} does not exist (note first sheet is 0)"
                    ))
                }),
            Some(Value::String(name)) => Ok(Self::Name {
                name: name.clone(),
                create,
            }),
            Some(_) => Err(SyncError::validation(
                "sheet must be a string or undefined",
            )),
        }
    }
}

/// A resolved destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTarget {
    pub spreadsheet: SpreadsheetLocator,
    pub sheet: SheetSelector,
}

/// Target fields as they appear in request and job JSON.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetOptions {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default)]
    pub spreadsheet_url: Option<String>,
    #[serde(default)]
    pub sheet: Option<Value>,
    #[serde(default)]
    pub create_sheet: bool,
}

impl TargetOptions {
    /// # Errors
    /// [`SyncError::Validation`] when no locator is given or the sheet
    /// option has the wrong type.
    pub fn resolve(&self) -> Result<SheetTarget> {
        let spreadsheet = match (&self.spreadsheet_id, &self.spreadsheet_url) {
            (Some(id), _) => SpreadsheetLocator::Id(id.clone()),
            (None, Some(url)) => SpreadsheetLocator::Url(url.clone()),
            (None, None) => {
                return Err(SyncError::validation(
                    "\"spreadsheetId\" or \"spreadsheetUrl\" must be defined in options",
                ))
            }
        };
        let sheet = SheetSelector::from_option(self.sheet.as_ref(), self.create_sheet)?;
        Ok(SheetTarget { spreadsheet, sheet })
    }
}
