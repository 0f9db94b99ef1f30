//! Grid normalizer: backend records (or already-tabular output) to a
//! rectangular [`Grid`] with a header row.
//!
//! "No data" (`null`, missing, or an empty array) is propagated as `None`
//! rather than turned into an empty grid; callers branch on it.

use serde_json::Value;

use crate::error::{Result, SyncError};
use crate::types::{Grid, Record, Scalar};

/// Column header for a backend field name: every `_` becomes a space.
#[must_use]
pub fn header_name(key: &str) -> String {
    key.replace('_', " ")
}

/// Normalize a decoded backend payload.
///
/// Accepts an array of homogeneous objects, or an array of arrays whose
/// first element is the header row.
///
/// # Errors
/// Returns [`SyncError::Shape`] for any other non-null value.
pub fn normalize(payload: Option<&Value>) -> Result<Option<Grid>> {
    match payload {
        None | Some(Value::Null) => Ok(None),
        Some(value) => records_to_grid(&payload_records(value)?),
    }
}

/// Records carried by a successful backend payload.
///
/// An array of arrays is tabular output: its first row names the fields
/// and each later row becomes one record. Fields missing from a short row
/// are null.
///
/// # Errors
/// Returns [`SyncError::Shape`] for a non-array, a mix of rows and
/// objects, repeated column names, or a row wider than the header.
pub fn payload_records(value: &Value) -> Result<Vec<Record>> {
    match value {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_array) => {
            tabular_records(items)
        }
        _ => Record::many_from_json(value),
    }
}

fn tabular_records(items: &[Value]) -> Result<Vec<Record>> {
    let mut rows = items.iter().filter_map(Value::as_array);
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let mut keys: Vec<String> = Vec::with_capacity(header.len());
    for cell in header {
        let key = match cell {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if keys.contains(&key) {
            return Err(SyncError::Shape(format!("column {key:?} appears twice")));
        }
        keys.push(key);
    }

    rows.enumerate()
        .map(|(idx, row)| {
            if row.len() > keys.len() {
                return Err(SyncError::Shape(format!(
                    "row {} has {} cells but the header has {}",
                    idx + 1,
                    row.len(),
                    keys.len()
                )));
            }
            Ok(keys
                .iter()
                .enumerate()
                .fold(Record::new(), |record, (col, key)| {
                    let value = row.get(col).map_or(Scalar::Null, Scalar::from_json);
                    record.with(key.clone(), value)
                }))
        })
        .collect()
}

/// Build a grid from records. The header is the first record's keys, in
/// backend order; every other record must carry the same keys.
///
/// # Errors
/// Returns [`SyncError::Shape`] if a record has a field the first one lacks.
pub fn records_to_grid(records: &[Record]) -> Result<Option<Grid>> {
    let Some(first) = records.first() else {
        return Ok(None);
    };
    let keys: Vec<&str> = first.keys().collect();

    let mut rows = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        if let Some(extra) = record.keys().find(|k| !keys.contains(k)) {
            return Err(SyncError::Shape(format!(
                "record {} has field {extra:?} not present in the first record",
                idx + 1
            )));
        }
        rows.push(
            keys.iter()
                .map(|k| record.get(k).map(|v| v.to_cell()).unwrap_or_default())
                .collect(),
        );
    }

    let header = keys.iter().map(|k| header_name(k)).collect();
    Grid::new(header, rows).map(Some)
}

impl Grid {
    /// Tab-separated rendering, header first.
    #[must_use]
    pub fn to_tsv(&self) -> String {
        let mut out = self.header().join("\t");
        for row in self.rows() {
            out.push('\n');
            let cells: Vec<String> = row
                .iter()
                .map(|c| c.display().replace(['\t', '\n'], " "))
                .collect();
            out.push_str(&cells.join("\t"));
        }
        out
    }

    /// HTML table; the header row goes into `<thead>`.
    #[must_use]
    pub fn to_html_table(&self) -> String {
        let mut out = String::from("<table><thead><tr>");
        for h in self.header() {
            out.push_str("<th>");
            out.push_str(&html_escape(h));
            out.push_str("</th>");
        }
        out.push_str("</tr></thead><tbody>");
        for row in self.rows() {
            out.push_str("<tr>");
            for cell in row {
                out.push_str("<td>");
                out.push_str(&html_escape(&cell.display()));
                out.push_str("</td>");
            }
            out.push_str("</tr>");
        }
        out.push_str("</tbody></table>");
        out
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]
mod tests {
    use super::*;
    use crate::types::CellValue;
    use serde_json::json;

    #[test]
    fn test_header_replaces_underscores() {
        let payload = json!([
            {"Entry_ID": 1, "Name_Last": "Smith", "Date_Start": "2024-01-02T03:04:05"},
            {"Entry_ID": 2, "Name_Last": "Jones", "Date_Start": "2024-02-03T00:00:00"}
        ]);
        let grid = normalize(Some(&payload)).unwrap().unwrap();
        assert_eq!(grid.header(), ["Entry ID", "Name Last", "Date Start"]);
        assert_eq!(grid.height(), 3);
        for row in grid.rows() {
            assert_eq!(row.len(), grid.width());
        }
    }

    #[test]
    fn test_numbers_pass_through_and_timestamps_stay_text() {
        let payload = json!([{"ID": 7, "When": "2024-01-02T03:04:05"}]);
        let grid = normalize(Some(&payload)).unwrap().unwrap();
        assert_eq!(grid.rows()[0][0], CellValue::Number(7.0));
        assert_eq!(
            grid.rows()[0][1],
            CellValue::Text("2024-01-02T03:04:05".into())
        );
    }

    #[test]
    fn test_no_data_propagates() {
        assert!(normalize(None).unwrap().is_none());
        assert!(normalize(Some(&Value::Null)).unwrap().is_none());
        assert!(normalize(Some(&json!([]))).unwrap().is_none());
    }

    #[test]
    fn test_non_array_is_shape_error() {
        let err = normalize(Some(&json!({"a": 1}))).unwrap_err();
        assert!(matches!(err, SyncError::Shape(_)));
        let err = normalize(Some(&json!("text"))).unwrap_err();
        assert!(matches!(err, SyncError::Shape(_)));
    }

    #[test]
    fn test_heterogeneous_records_rejected() {
        let payload = json!([{"a": 1}, {"a": 2, "b": 3}]);
        assert!(matches!(
            normalize(Some(&payload)).unwrap_err(),
            SyncError::Shape(_)
        ));
    }

    #[test]
    fn test_missing_field_becomes_empty_cell() {
        let payload = json!([{"a": 1, "b": 2}, {"a": 3}]);
        let grid = normalize(Some(&payload)).unwrap().unwrap();
        assert_eq!(grid.rows()[1][1], CellValue::Empty);
    }

    #[test]
    fn test_tabular_payload() {
        let payload = json!([["Room_Code", "Beds"], ["A-101", 2]]);
        let grid = normalize(Some(&payload)).unwrap().unwrap();
        assert_eq!(grid.header(), ["Room Code", "Beds"]);
        assert_eq!(grid.rows()[0][1], CellValue::Number(2.0));
    }

    #[test]
    fn test_tabular_short_row_pads_and_wide_row_fails() {
        let grid = normalize(Some(&json!([["A", "B"], [1]]))).unwrap().unwrap();
        assert_eq!(grid.rows()[0], vec![CellValue::Number(1.0), CellValue::Empty]);

        let err = normalize(Some(&json!([["A"], [1, 2]]))).unwrap_err();
        assert!(matches!(err, SyncError::Shape(_)));
        let err = normalize(Some(&json!([["A", "A"], [1, 2]]))).unwrap_err();
        assert!(matches!(err, SyncError::Shape(_)));
    }

    #[test]
    fn test_header_only_table_has_no_records() {
        assert!(payload_records(&json!([["A", "B"]])).unwrap().is_empty());
        assert!(normalize(Some(&json!([["A", "B"]]))).unwrap().is_none());
    }

    #[test]
    fn test_html_table_escapes() {
        let grid = Grid::new(
            vec!["Name".into()],
            vec![vec![CellValue::Text("<b>&".into())]],
        )
        .unwrap();
        assert_eq!(
            grid.to_html_table(),
            "<table><thead><tr><th>Name</th></tr></thead><tbody><tr><td>&lt;b&gt;&amp;</td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_tsv() {
        let grid = Grid::new(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Number(1.0), CellValue::Text("x".into())]],
        )
        .unwrap();
        assert_eq!(grid.to_tsv(), "a\tb\n1\tx");
    }
}
