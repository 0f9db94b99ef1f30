//! Generates package parts (workbook, styles, worksheets) from a `Workbook`.
//!
//! Strings are written inline (`t="inlineStr"`), so no shared string table
//! is produced. Dates use the ISO date cell type (`t="d"`).

use crate::cell_ref::{cell_ref, col_to_letter};
use crate::color::to_argb;
use crate::sheet::{Sheet, Workbook};
use crate::types::CellValue;
use crate::xml_helpers::xml_escape;

use super::styles::StyleTable;
use super::{ISO_DATE_FORMAT, PX_PER_CHAR};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Path of the `n`th (0-based) worksheet part.
pub(crate) fn sheet_path(idx: usize) -> String {
    format!("xl/worksheets/sheet{}.xml", idx + 1)
}

/// Every part of the package as (path, contents).
pub(crate) fn package_parts(workbook: &Workbook) -> Vec<(String, String)> {
    let styles = StyleTable::collect(workbook);
    let sheet_count = workbook.sheets().len();

    let mut parts = vec![
        ("[Content_Types].xml".to_string(), content_types_xml(sheet_count)),
        ("_rels/.rels".to_string(), root_rels_xml()),
        ("xl/workbook.xml".to_string(), workbook_xml(workbook)),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            workbook_rels_xml(sheet_count),
        ),
        ("xl/styles.xml".to_string(), styles.to_xml()),
    ];
    for (idx, sheet) in workbook.sheets().iter().enumerate() {
        parts.push((sheet_path(idx), write_sheet_xml(sheet, &styles)));
    }
    parts
}

fn content_types_xml(sheet_count: usize) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    );
    out.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    out.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    out.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    out.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    for idx in 0..sheet_count {
        out.push_str(&format!(
            "<Override PartName=\"/{}\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
            sheet_path(idx)
        ));
    }
    out.push_str("</Types>");
    out
}

fn root_rels_xml() -> String {
    format!(
        "{XML_DECL}<Relationships xmlns=\"{PKG_REL_NS}\"><Relationship Id=\"rId1\" Type=\"{REL_NS}/officeDocument\" Target=\"xl/workbook.xml\"/></Relationships>"
    )
}

fn workbook_xml(workbook: &Workbook) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str(&format!(
        "<workbook xmlns=\"{MAIN_NS}\" xmlns:r=\"{REL_NS}\"><sheets>"
    ));
    for (idx, sheet) in workbook.sheets().iter().enumerate() {
        out.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            xml_escape(sheet.name()),
            idx + 1,
            idx + 1
        ));
    }
    out.push_str("</sheets></workbook>");
    out
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str(&format!("<Relationships xmlns=\"{PKG_REL_NS}\">"));
    for idx in 0..sheet_count {
        out.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"{REL_NS}/worksheet\" Target=\"worksheets/sheet{}.xml\"/>",
            idx + 1,
            idx + 1
        ));
    }
    out.push_str(&format!(
        "<Relationship Id=\"rId{}\" Type=\"{REL_NS}/styles\" Target=\"styles.xml\"/>",
        sheet_count + 1
    ));
    out.push_str("</Relationships>");
    out
}

/// Write a complete worksheet XML string from a `Sheet`.
pub(crate) fn write_sheet_xml(sheet: &Sheet, styles: &StyleTable) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(XML_DECL);
    out.push('\n');
    out.push_str(&format!("<worksheet xmlns=\"{MAIN_NS}\" xmlns:r=\"{REL_NS}\">"));
    out.push('\n');

    if let Some(color) = sheet.tab_color() {
        out.push_str(&format!(
            "<sheetPr><tabColor rgb=\"{}\"/></sheetPr>\n",
            to_argb(color)
        ));
    }

    // The dimension records the grid size, including blank trailing rows.
    if sheet.max_rows() > 0 && sheet.max_columns() > 0 {
        out.push_str(&format!(
            "<dimension ref=\"A1:{}\"/>\n",
            cell_ref(sheet.max_rows() - 1, sheet.max_columns() - 1)
        ));
    }

    out.push_str("<sheetViews><sheetView workbookViewId=\"0\">");
    if sheet.frozen_rows() > 0 {
        out.push_str(&format!(
            "<pane ySplit=\"{}\" topLeftCell=\"A{}\" activePane=\"bottomLeft\" state=\"frozen\"/>",
            sheet.frozen_rows(),
            sheet.frozen_rows() + 1
        ));
    }
    out.push_str("</sheetView></sheetViews>\n");

    out.push_str("<sheetFormatPr defaultRowHeight=\"15\"/>\n");

    let widths: Vec<(usize, f64)> = (0..sheet.max_columns())
        .filter_map(|col| sheet.column_width(col).map(|w| (col, w)))
        .collect();
    if !widths.is_empty() {
        out.push_str("<cols>");
        for (col, width) in widths {
            out.push_str(&format!(
                "<col min=\"{0}\" max=\"{0}\" width=\"{1}\" customWidth=\"1\"/>",
                col + 1,
                width / PX_PER_CHAR
            ));
        }
        out.push_str("</cols>\n");
    }

    out.push_str("<sheetData>\n");
    write_sheet_data(&mut out, sheet, styles);
    out.push_str("</sheetData>\n");

    out.push_str("</worksheet>");
    out
}

/// Write every row that has values or a row style.
fn write_sheet_data(out: &mut String, sheet: &Sheet, styles: &StyleTable) {
    for row in 0..sheet.max_rows() {
        let values = sheet.row_values(row);
        let xf = sheet.row_style(row).and_then(|s| styles.xf_index(s));
        let has_values = values.iter().any(|v| !v.is_empty());
        if !has_values && xf.is_none() {
            continue;
        }

        out.push_str(&format!("<row r=\"{}\"", row + 1));
        if let Some(xf) = xf {
            out.push_str(&format!(" s=\"{xf}\" customFormat=\"1\""));
        }
        out.push('>');
        for (col, value) in values.iter().enumerate() {
            if !value.is_empty() {
                write_cell(out, row, col, value, xf);
            }
        }
        out.push_str("</row>\n");
    }
}

/// Write a single `<c>` element.
fn write_cell(out: &mut String, row: usize, col: usize, value: &CellValue, xf: Option<usize>) {
    out.push_str(&format!("<c r=\"{}{}\"", col_to_letter(col), row + 1));
    if let Some(xf) = xf {
        out.push_str(&format!(" s=\"{xf}\""));
    }

    match value {
        CellValue::Empty => out.push('>'),
        CellValue::Text(text) => {
            out.push_str(" t=\"inlineStr\"><is><t xml:space=\"preserve\">");
            out.push_str(&xml_escape(text));
            out.push_str("</t></is>");
        }
        CellValue::Number(n) => out.push_str(&format!("><v>{n}</v>")),
        CellValue::Boolean(b) => {
            out.push_str(&format!(" t=\"b\"><v>{}</v>", if *b { "1" } else { "0" }));
        }
        CellValue::Date(dt) => {
            out.push_str(&format!(" t=\"d\"><v>{}</v>", dt.format(ISO_DATE_FORMAT)));
        }
    }

    out.push_str("</c>");
}
