//! Workbooks saved by the XLSX store load back with values and formatting.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use std::io::{Cursor, Write};

use chrono::NaiveDate;
use rezsync::sheet::{RowStyle, Sheet, Workbook, WorkbookStore, XlsxStore};
use rezsync::types::CellValue;
use rezsync::xlsx::{read_workbook, write_workbook};
use zip::write::FileOptions;
use zip::ZipWriter;

fn header_style() -> RowStyle {
    RowStyle {
        background: Some("#FF0000".into()),
        font_color: Some("#FFFFFF".into()),
        bold: true,
    }
}

fn report_sheet() -> Sheet {
    let mut sheet = Sheet::with_size("Occupancy", 4, 3);
    let when = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap();
    sheet.set_values(
        0,
        0,
        &[
            vec!["Room".into(), "Beds".into(), "Checked In".into()],
            vec!["A <101> & co".into(), 2.0.into(), CellValue::Date(when)],
            vec!["B102".into(), 1.5.into(), CellValue::Boolean(true)],
        ],
    );
    sheet.set_frozen_rows(1);
    sheet.set_tab_color(Some("#FF0000".into()));
    sheet.set_row_style(0, Some(header_style()));
    sheet.set_row_style(
        2,
        Some(RowStyle {
            background: Some("#FFE4E1".into()),
            ..RowStyle::default()
        }),
    );
    sheet.set_column_width(0, Some(94.0));
    sheet
}

#[test]
fn test_values_and_formatting_survive_save() {
    let workbook = Workbook::from_sheets(vec![report_sheet(), Sheet::new("Summary")]).unwrap();
    let loaded = read_workbook(&write_workbook(&workbook).unwrap()).unwrap();

    assert_eq!(loaded.sheets().len(), 2);
    let sheet = loaded.sheet_by_name("Occupancy").unwrap();
    let original = report_sheet();
    assert_eq!(sheet.data_values(), original.data_values());
    assert_eq!(sheet.max_rows(), 4);
    assert_eq!(sheet.max_columns(), 3);
    assert_eq!(sheet.frozen_rows(), 1);
    assert_eq!(sheet.tab_color(), Some("#FF0000"));
    assert_eq!(sheet.row_style(0), Some(&header_style()));
    assert_eq!(
        sheet.row_style(2).unwrap().background.as_deref(),
        Some("#FFE4E1")
    );
    assert!(sheet.row_style(1).is_none());
    assert_eq!(sheet.column_width(0), Some(94.0));

    let summary = loaded.sheet_by_name("Summary").unwrap();
    assert_eq!(summary.max_rows(), 1000);
    assert_eq!(summary.max_columns(), 26);
}

#[test]
fn test_store_save_replaces_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = XlsxStore::new(dir.path());
    store.create("weekly").unwrap();

    let mut workbook = store.open("weekly").unwrap();
    workbook.sheet_mut(0).unwrap().set_value(0, 0, "v1".into());
    store.save("weekly", &workbook).unwrap();
    workbook.sheet_mut(0).unwrap().set_value(0, 0, "v2".into());
    store.save("weekly", &workbook).unwrap();

    let reopened = store.open("weekly").unwrap();
    assert_eq!(reopened.sheet(0).unwrap().value(0, 0), &CellValue::from("v2"));
    assert!(!dir.path().join("weekly.xlsx.tmp").exists());
}

/// A minimal package as a desktop tool writes it: shared strings, no
/// dimension, numeric cells.
fn foreign_xlsx() -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut buffer);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file("xl/workbook.xml", options).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Feed" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
        )
        .unwrap();

        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#,
        )
        .unwrap();

        zip.start_file("xl/sharedStrings.xml", options).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
<si><t>id</t></si><si><t>name</t></si><si><r><t>Ada </t></r><r><t>Lovelace</t></r></si>
</sst>"#,
        )
        .unwrap();

        zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
<row r="2"><c r="A2"><v>1</v></c><c r="B2" t="s"><v>2</v></c></row>
</sheetData>
</worksheet>"#,
        )
        .unwrap();
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

#[test]
fn test_reads_shared_strings_package() {
    let workbook = read_workbook(&foreign_xlsx()).unwrap();
    let sheet = workbook.sheet_by_name("Feed").unwrap();
    assert_eq!(sheet.value(0, 1), &CellValue::from("name"));
    assert_eq!(sheet.value(1, 0), &CellValue::Number(1.0));
    assert_eq!(sheet.value(1, 1), &CellValue::from("Ada Lovelace"));
    assert_eq!(sheet.max_rows(), 2);
    assert_eq!(sheet.frozen_rows(), 0);
}

#[test]
fn test_rejects_non_workbook_zip() {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut buffer);
        zip.start_file("hello.txt", FileOptions::default()).unwrap();
        zip.write_all(b"hi").unwrap();
        zip.finish().unwrap();
    }
    assert!(read_workbook(&buffer.into_inner()).is_err());
}
