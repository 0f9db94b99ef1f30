//! Row-style table: `RowStyle` <-> styles.xml fonts, fills, and cellXfs.
//!
//! Each distinct row style gets its own font, fill, and cell format. Format 0
//! is the unstyled default.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::color::{from_argb, to_argb};
use crate::error::Result;
use crate::sheet::{RowStyle, Workbook};
use crate::xml_helpers::{attr_bool, attr_string, attr_usize};

/// Built-in fills every styles.xml must start with.
const RESERVED_FILLS: usize = 2;

#[derive(Debug, Default)]
pub(crate) struct StyleTable {
    styles: Vec<RowStyle>,
}

impl StyleTable {
    pub(crate) fn collect(workbook: &Workbook) -> Self {
        let mut styles: Vec<RowStyle> = Vec::new();
        for sheet in workbook.sheets() {
            for row in 0..sheet.max_rows() {
                if let Some(style) = sheet.row_style(row) {
                    if !styles.contains(style) {
                        styles.push(style.clone());
                    }
                }
            }
        }
        Self { styles }
    }

    /// `cellXfs` index for a style.
    pub(crate) fn xf_index(&self, style: &RowStyle) -> Option<usize> {
        self.styles.iter().position(|s| s == style).map(|i| i + 1)
    }

    pub(crate) fn to_xml(&self) -> String {
        let mut out = String::with_capacity(1024 + self.styles.len() * 256);
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        out.push('\n');
        out.push_str(
            r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        out.push_str(&format!("<fonts count=\"{}\">", self.styles.len() + 1));
        out.push_str(r#"<font><sz val="11"/><name val="Calibri"/></font>"#);
        for style in &self.styles {
            out.push_str("<font>");
            if style.bold {
                out.push_str("<b/>");
            }
            out.push_str(r#"<sz val="11"/>"#);
            if let Some(color) = &style.font_color {
                out.push_str(&format!("<color rgb=\"{}\"/>", to_argb(color)));
            }
            out.push_str(r#"<name val="Calibri"/></font>"#);
        }
        out.push_str("</fonts>");

        out.push_str(&format!(
            "<fills count=\"{}\">",
            self.styles.len() + RESERVED_FILLS
        ));
        out.push_str(r#"<fill><patternFill patternType="none"/></fill>"#);
        out.push_str(r#"<fill><patternFill patternType="gray125"/></fill>"#);
        for style in &self.styles {
            match &style.background {
                Some(color) => out.push_str(&format!(
                    "<fill><patternFill patternType=\"solid\"><fgColor rgb=\"{}\"/><bgColor indexed=\"64\"/></patternFill></fill>",
                    to_argb(color)
                )),
                None => out.push_str(r#"<fill><patternFill patternType="none"/></fill>"#),
            }
        }
        out.push_str("</fills>");

        out.push_str(
            r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
        );
        out.push_str(
            r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
        );

        out.push_str(&format!("<cellXfs count=\"{}\">", self.styles.len() + 1));
        out.push_str(r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#);
        for idx in 0..self.styles.len() {
            out.push_str(&format!(
                "<xf numFmtId=\"0\" fontId=\"{}\" fillId=\"{}\" borderId=\"0\" xfId=\"0\" applyFont=\"1\" applyFill=\"1\"/>",
                idx + 1,
                idx + RESERVED_FILLS
            ));
        }
        out.push_str("</cellXfs>");

        out.push_str(
            r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
        );
        out.push_str("</styleSheet>");
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Fonts,
    Fills,
    CellXfs,
}

#[derive(Debug, Default, Clone)]
struct FontInfo {
    bold: bool,
    color: Option<String>,
}

/// Parse styles.xml into one optional row style per `cellXfs` entry.
///
/// Formats that carry no bold, font color, or solid fill map to `None`.
///
/// # Errors
/// Malformed XML.
pub(crate) fn parse_styles(xml: &[u8]) -> Result<Vec<Option<RowStyle>>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut fonts: Vec<FontInfo> = Vec::new();
    let mut fills: Vec<Option<String>> = Vec::new();
    let mut xfs: Vec<(usize, usize)> = Vec::new();
    let mut section = Section::Other;
    let mut solid = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"fonts" => section = Section::Fonts,
                b"fills" => section = Section::Fills,
                b"cellXfs" => section = Section::CellXfs,
                b"cellStyleXfs" | b"borders" | b"cellStyles" | b"dxfs" => {
                    section = Section::Other;
                }
                b"font" if section == Section::Fonts => fonts.push(FontInfo::default()),
                b"b" if section == Section::Fonts => {
                    if let Some(font) = fonts.last_mut() {
                        font.bold = attr_bool(e, b"val").unwrap_or(true);
                    }
                }
                b"color" if section == Section::Fonts => {
                    if let Some(font) = fonts.last_mut() {
                        font.color = attr_string(e, b"rgb").and_then(|rgb| from_argb(&rgb));
                    }
                }
                b"fill" if section == Section::Fills => fills.push(None),
                b"patternFill" if section == Section::Fills => {
                    solid = attr_string(e, b"patternType").as_deref() == Some("solid");
                }
                b"fgColor" if section == Section::Fills && solid => {
                    if let Some(fill) = fills.last_mut() {
                        *fill = attr_string(e, b"rgb").and_then(|rgb| from_argb(&rgb));
                    }
                }
                b"xf" if section == Section::CellXfs => xfs.push((
                    attr_usize(e, b"fontId").unwrap_or(0),
                    attr_usize(e, b"fillId").unwrap_or(0),
                )),
                _ => {}
            },
            Event::End(ref e) => {
                if matches!(e.local_name().as_ref(), b"fonts" | b"fills" | b"cellXfs") {
                    section = Section::Other;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(xfs
        .into_iter()
        .map(|(font_id, fill_id)| {
            let font = fonts.get(font_id).cloned().unwrap_or_default();
            let style = RowStyle {
                background: fills.get(fill_id).cloned().flatten(),
                font_color: font.color,
                bold: font.bold,
            };
            (style != RowStyle::default()).then_some(style)
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::sheet::Sheet;

    fn header_style() -> RowStyle {
        RowStyle {
            background: Some("#FF0000".into()),
            font_color: Some("#FFFFFF".into()),
            bold: true,
        }
    }

    #[test]
    fn test_collect_dedupes_styles() {
        let mut sheet = Sheet::with_size("S", 3, 1);
        sheet.set_row_style(0, Some(header_style()));
        sheet.set_row_style(2, Some(header_style()));
        let wb = Workbook::from_sheets(vec![sheet]).unwrap();
        let table = StyleTable::collect(&wb);
        assert_eq!(table.xf_index(&header_style()), Some(1));
        assert_eq!(table.xf_index(&RowStyle::default()), None);
    }

    #[test]
    fn test_styles_xml_parses_back() {
        let mut sheet = Sheet::with_size("S", 2, 1);
        sheet.set_row_style(0, Some(header_style()));
        let plain_bold = RowStyle {
            bold: true,
            ..RowStyle::default()
        };
        sheet.set_row_style(1, Some(plain_bold.clone()));
        let wb = Workbook::from_sheets(vec![sheet]).unwrap();
        let xml = StyleTable::collect(&wb).to_xml();

        let parsed = parse_styles(xml.as_bytes()).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0], None);
        assert_eq!(parsed[1], Some(header_style()));
        assert_eq!(parsed[2], Some(plain_bold));
    }
}
