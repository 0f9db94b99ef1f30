//! XLSX persistence for the file-backed workbook store.
//!
//! The package is written from scratch on every save: one worksheet part
//! per sheet, inline strings, and a styles part holding the row styles.

mod reader;
mod styles;
mod writer;

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::ZipWriter;

use crate::error::Result;
use crate::sheet::Workbook;

pub use reader::read_workbook;

/// Wire format of `t="d"` cells.
pub(crate) const ISO_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Pixels per character unit in `<col width>`.
pub(crate) const PX_PER_CHAR: f64 = 7.0;

/// Serialize a workbook to XLSX bytes.
///
/// # Errors
/// ZIP or I/O failures while building the archive.
pub fn write_workbook(workbook: &Workbook) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(16 * 1024)));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (path, contents) in writer::package_parts(workbook) {
        writer.start_file(path, options)?;
        writer.write_all(contents.as_bytes())?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
