//! Reads a workbook package back into the in-memory model.
//!
//! Understands what the writer emits plus shared strings, so workbooks
//! saved by desktop spreadsheet tools load as well.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::cell_ref::{parse_cell_ref, parse_dimension};
use crate::color::from_argb;
use crate::error::{Result, SyncError};
use crate::sheet::{RowStyle, Sheet, Workbook};
use crate::types::CellValue;
use crate::xml_helpers::{attr_f64, attr_string, attr_usize};

use super::styles::parse_styles;
use super::{ISO_DATE_FORMAT, PX_PER_CHAR};

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Parse XLSX bytes into a `Workbook`.
///
/// # Errors
/// Missing `xl/workbook.xml`, a missing worksheet part, or malformed XML.
pub fn read_workbook(bytes: &[u8]) -> Result<Workbook> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let rels = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };
    let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?
        .ok_or_else(|| SyncError::validation("not a workbook: xl/workbook.xml is missing"))?;
    let sheet_refs = parse_sheet_refs(&workbook_xml)?;

    let shared = match read_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let styles = match read_part(&mut archive, "xl/styles.xml")? {
        Some(xml) => parse_styles(&xml)?,
        None => Vec::new(),
    };

    let mut sheets = Vec::with_capacity(sheet_refs.len());
    for (idx, (name, r_id)) in sheet_refs.into_iter().enumerate() {
        let path = rels
            .get(&r_id)
            .cloned()
            .unwrap_or_else(|| super::writer::sheet_path(idx));
        let xml = read_part(&mut archive, &path)?.ok_or_else(|| {
            SyncError::validation(format!("worksheet part {path} for sheet {name:?} is missing"))
        })?;
        sheets.push(parse_sheet(&xml, name, &shared, &styles)?);
    }

    Workbook::from_sheets(sheets)
}

fn read_part(archive: &mut Archive<'_>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

/// rId -> full part path, resolved relative to `xl/`.
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    let mut rels = HashMap::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr_string(e, b"Id"), attr_string(e, b"Target"))
                {
                    let path = match target.strip_prefix('/') {
                        Some(stripped) => stripped.to_string(),
                        None => format!("xl/{target}"),
                    };
                    rels.insert(id, path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// (sheet name, relationship id) in workbook order.
fn parse_sheet_refs(xml: &[u8]) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    let mut sheets = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_string(e, b"name").unwrap_or_default();
                let r_id = attr_string(e, b"id").unwrap_or_default();
                sheets.push((name, r_id));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_t = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_t = true,
                _ => {}
            },
            Event::Text(ref e) if in_t => current.push_str(&e.unescape()?),
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_t = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// A `<c>` element whose value is still being read.
struct PendingCell {
    row: usize,
    col: usize,
    kind: String,
    text: String,
}

impl PendingCell {
    fn finish(self, shared: &[String]) -> Option<(usize, usize, CellValue)> {
        let Self {
            row,
            col,
            kind,
            text,
        } = self;
        let value = match kind.as_str() {
            "s" => text
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| shared.get(idx))
                .map(|s| CellValue::Text(s.clone()))?,
            "b" => CellValue::Boolean(text.trim() == "1"),
            "d" => parse_iso_date(text.trim()).map_or(CellValue::Text(text), CellValue::Date),
            "inlineStr" | "str" | "e" => CellValue::Text(text),
            _ => {
                if text.trim().is_empty() {
                    return None;
                }
                text.trim()
                    .parse::<f64>()
                    .map_or(CellValue::Text(text), CellValue::Number)
            }
        };
        (!value.is_empty()).then_some((row, col, value))
    }
}

fn parse_iso_date(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, ISO_DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse one worksheet part.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::too_many_lines
)]
fn parse_sheet(
    xml: &[u8],
    name: String,
    shared: &[String],
    styles: &[Option<RowStyle>],
) -> Result<Sheet> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);

    let mut dimension: Option<(usize, usize)> = None;
    let mut frozen_rows = 0;
    let mut tab_color = None;
    let mut widths: Vec<(usize, f64)> = Vec::new();
    let mut row_styles: Vec<(usize, RowStyle)> = Vec::new();
    let mut cells: Vec<(usize, usize, CellValue)> = Vec::new();

    let mut current_row = 0;
    let mut next_col = 0;
    let mut pending: Option<PendingCell> = None;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_start = matches!(event, Event::Start(_));
                match e.local_name().as_ref() {
                    b"tabColor" => {
                        tab_color = attr_string(e, b"rgb").and_then(|rgb| from_argb(&rgb));
                    }
                    b"dimension" => {
                        dimension = attr_string(e, b"ref").and_then(|r| parse_dimension(&r));
                    }
                    b"pane" => {
                        let state = attr_string(e, b"state");
                        if matches!(state.as_deref(), None | Some("frozen" | "frozenSplit")) {
                            frozen_rows = attr_usize(e, b"ySplit").unwrap_or(0);
                        }
                    }
                    b"col" => {
                        let min = attr_usize(e, b"min").unwrap_or(1).max(1);
                        let max = attr_usize(e, b"max").unwrap_or(min).max(min);
                        if let Some(width) = attr_f64(e, b"width") {
                            let px = (width * PX_PER_CHAR * 100.0).round() / 100.0;
                            widths.extend((min - 1..max).map(|col| (col, px)));
                        }
                    }
                    b"row" => {
                        current_row = attr_usize(e, b"r")
                            .map_or(current_row + 1, |r| r.max(1))
                            .saturating_sub(1);
                        next_col = 0;
                        if let Some(style) = attr_usize(e, b"s")
                            .and_then(|s| styles.get(s))
                            .and_then(Clone::clone)
                        {
                            row_styles.push((current_row, style));
                        }
                        // an empty-element row is consumed here, so the
                        // next row without `r` continues after it
                        if !is_start {
                            current_row += 1;
                        }
                    }
                    b"c" => {
                        let (row, col) = attr_string(e, b"r")
                            .and_then(|r| parse_cell_ref(&r))
                            .unwrap_or((current_row, next_col));
                        next_col = col + 1;
                        if is_start {
                            pending = Some(PendingCell {
                                row,
                                col,
                                kind: attr_string(e, b"t").unwrap_or_default(),
                                text: String::new(),
                            });
                        }
                    }
                    b"v" | b"t" if is_start && pending.is_some() => in_text = true,
                    _ => {}
                }
            }
            Event::Text(ref e) if in_text => {
                if let Some(cell) = pending.as_mut() {
                    cell.text.push_str(&e.unescape()?);
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_text = false,
                b"c" => {
                    if let Some(cell) = pending.take().and_then(|c| c.finish(shared)) {
                        cells.push(cell);
                    }
                }
                b"row" => current_row += 1,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let data_rows = cells.iter().map(|(r, _, _)| r + 1).max().unwrap_or(0);
    let data_cols = cells.iter().map(|(_, c, _)| c + 1).max().unwrap_or(0);
    let (rows, cols) = dimension.unwrap_or((data_rows.max(1), data_cols.max(1)));

    let mut sheet = Sheet::with_size(name, rows, cols);
    for (row, col, value) in cells {
        sheet.set_value(row, col, value);
    }
    for (row, style) in row_styles {
        sheet.set_row_style(row, Some(style));
    }
    for (col, width) in widths {
        sheet.set_column_width(col, Some(width));
    }
    sheet.set_frozen_rows(frozen_rows);
    sheet.set_tab_color(tab_color);
    Ok(sheet)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sheet_with_shared_strings_and_types() {
        let xml = br#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<dimension ref="A1:C5"/>
<sheetViews><sheetView workbookViewId="0"><pane ySplit="1" topLeftCell="A2" state="frozen"/></sheetView></sheetViews>
<sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="inlineStr"><is><t> padded </t></is></c></row>
<row r="3"><c r="A3"><v>42</v></c><c r="B3" t="b"><v>0</v></c><c r="C3" t="d"><v>2024-01-02T03:04:05</v></c></row>
</sheetData></worksheet>"#;
        let shared = vec!["Header".to_string()];
        let sheet = parse_sheet(xml, "S".into(), &shared, &[]).unwrap();

        assert_eq!(sheet.max_rows(), 5);
        assert_eq!(sheet.max_columns(), 3);
        assert_eq!(sheet.frozen_rows(), 1);
        assert_eq!(sheet.value(0, 0), &CellValue::Text("Header".into()));
        assert_eq!(sheet.value(0, 1), &CellValue::Text(" padded ".into()));
        assert_eq!(sheet.value(2, 0), &CellValue::Number(42.0));
        assert_eq!(sheet.value(2, 1), &CellValue::Boolean(false));
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(sheet.value(2, 2), &CellValue::Date(expected));
    }

    #[test]
    fn test_parse_sheet_without_dimension_uses_data_extent() {
        let xml = br#"<worksheet><sheetData><row><c><v>1</v></c><c><v>2</v></c></row><row><c><v>3</v></c></row></sheetData></worksheet>"#;
        let sheet = parse_sheet(xml, "S".into(), &[], &[]).unwrap();
        assert_eq!(sheet.max_rows(), 2);
        assert_eq!(sheet.max_columns(), 2);
        assert_eq!(sheet.value(0, 1), &CellValue::Number(2.0));
        assert_eq!(sheet.value(1, 0), &CellValue::Number(3.0));
    }

    #[test]
    fn test_parse_relationships_resolves_paths() {
        let xml = br#"<Relationships><Relationship Id="rId1" Target="worksheets/a.xml"/><Relationship Id="rId2" Target="/xl/worksheets/b.xml"/></Relationships>"#;
        let rels = parse_relationships(xml).unwrap();
        assert_eq!(rels["rId1"], "xl/worksheets/a.xml");
        assert_eq!(rels["rId2"], "xl/worksheets/b.xml");
    }
}
