//! Live-feed and delete-rows primitives.
//!
//! Both operate on an already-resolved [`Sheet`]; the dispatcher takes care
//! of opening and saving the workbook.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::sheet::Sheet;
use crate::types::CellValue;

/// Push `values` into row 2 of a fixed-size scrolling window.
///
/// A blank row is inserted below the top row, the sheet's last row is
/// dropped, and `values` are written into the new row. A sheet with fewer
/// than two rows grows instead of dropping its only data.
///
/// # Errors
/// [`SyncError::Validation`] when `values` is empty.
pub fn update_live_feed(sheet: &mut Sheet, values: &[Value]) -> Result<()> {
    if values.is_empty() {
        return Err(SyncError::validation(
            "\"values\" must be defined in options",
        ));
    }
    sheet.ensure_size(1, values.len());
    sheet.insert_rows(1, 1)?;
    let rows = sheet.max_rows();
    if rows > 2 {
        sheet.delete_rows(rows - 1, 1)?;
    }
    let row: Vec<CellValue> = values.iter().map(CellValue::from_json).collect();
    sheet.set_values(1, 0, &[row]);
    debug!(sheet = sheet.name(), columns = values.len(), "Live feed row inserted");
    Ok(())
}

/// One `{key, value}` pair of a `matchOn` list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatchCriterion {
    /// Header text of the column to compare.
    pub key: String,
    pub value: Value,
}

/// Delete every data row whose cells equal all `criteria`.
///
/// Keys are looked up in the header row (row 1). Comparison is exact with
/// no type coercion. Returns the number of rows deleted.
///
/// # Errors
/// [`SyncError::Validation`] for an empty criteria list,
/// [`SyncError::UnknownColumn`] when a key is not a header value.
pub fn delete_rows(sheet: &mut Sheet, criteria: &[MatchCriterion]) -> Result<usize> {
    if criteria.is_empty() {
        return Err(SyncError::validation(
            "\"matchOn\" criteria must be defined in options",
        ));
    }

    let header = sheet.row_values(0);
    let columns = criteria
        .iter()
        .map(|c| {
            header
                .iter()
                .position(|h| !h.is_empty() && h.display() == c.key)
                .map(|col| (col, &c.value))
                .ok_or_else(|| SyncError::UnknownColumn(c.key.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    // bottom-up so earlier indices stay valid
    let doomed: Vec<usize> = (1..sheet.last_row())
        .rev()
        .filter(|&row| {
            columns
                .iter()
                .all(|(col, value)| sheet.value(row, *col).matches_json(value))
        })
        .collect();

    for &row in &doomed {
        sheet.delete_rows(row, 1)?;
    }
    debug!(sheet = sheet.name(), deleted = doomed.len(), "Rows deleted");
    Ok(doomed.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn abc_sheet() -> Sheet {
        let mut sheet = Sheet::with_size("Feed", 4, 2);
        sheet.set_values(
            0,
            0,
            &[
                vec!["a".into(), "b".into()],
                vec![1.0.into(), "x".into()],
                vec![2.0.into(), "y".into()],
                vec![1.0.into(), "z".into()],
            ],
        );
        sheet
    }

    fn criterion(key: &str, value: Value) -> MatchCriterion {
        MatchCriterion {
            key: key.into(),
            value,
        }
    }

    #[test]
    fn test_delete_rows_matches_numeric_header() {
        let mut sheet = Sheet::with_size("Feed", 3, 2);
        sheet.set_values(
            0,
            0,
            &[
                vec![2024.0.into(), "name".into()],
                vec![5.0.into(), "x".into()],
                vec![6.0.into(), "y".into()],
            ],
        );
        let deleted = delete_rows(&mut sheet, &[criterion("2024", json!(6))]).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(sheet.last_row(), 2);
    }

    #[test]
    fn test_delete_rows_single_criterion() {
        let mut sheet = abc_sheet();
        let deleted = delete_rows(&mut sheet, &[criterion("a", json!(1))]).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(
            sheet.data_values(),
            vec![
                vec![CellValue::from("a"), CellValue::from("b")],
                vec![CellValue::from(2.0), CellValue::from("y")],
            ]
        );
    }

    #[test]
    fn test_delete_rows_and_across_criteria() {
        let mut sheet = abc_sheet();
        let deleted = delete_rows(
            &mut sheet,
            &[criterion("a", json!(1)), criterion("b", json!("z"))],
        )
        .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(sheet.value(1, 1), &CellValue::from("x"));
        assert_eq!(sheet.value(2, 1), &CellValue::from("y"));
        assert!(sheet.value(3, 1).is_empty());
    }

    #[test]
    fn test_delete_rows_first_data_row_is_eligible() {
        let mut sheet = abc_sheet();
        delete_rows(&mut sheet, &[criterion("b", json!("x"))]).unwrap();
        assert_eq!(sheet.value(1, 1), &CellValue::from("y"));
    }

    #[test]
    fn test_delete_rows_no_type_coercion() {
        let mut sheet = abc_sheet();
        let deleted = delete_rows(&mut sheet, &[criterion("a", json!("1"))]).unwrap();
        assert_eq!(deleted, 0);
    }

    #[test]
    fn test_delete_rows_never_touches_header() {
        let mut sheet = abc_sheet();
        delete_rows(&mut sheet, &[criterion("a", json!("a"))]).unwrap();
        assert_eq!(sheet.value(0, 0), &CellValue::from("a"));
    }

    #[test]
    fn test_delete_rows_unknown_column() {
        let mut sheet = abc_sheet();
        let err = delete_rows(&mut sheet, &[criterion("c", json!(1))]).unwrap_err();
        assert!(matches!(err, SyncError::UnknownColumn(ref k) if k == "c"));
        assert_eq!(sheet.last_row(), 4);
    }

    #[test]
    fn test_delete_rows_requires_criteria() {
        let mut sheet = abc_sheet();
        let err = delete_rows(&mut sheet, &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "\"matchOn\" criteria must be defined in options"
        );
    }

    #[test]
    fn test_live_feed_keeps_window_size() {
        let mut sheet = Sheet::with_size("Feed", 4, 2);
        sheet.set_values(
            0,
            0,
            &[
                vec!["time".into(), "event".into()],
                vec!["t2".into(), "second".into()],
                vec!["t1".into(), "first".into()],
            ],
        );
        update_live_feed(&mut sheet, &[json!("t3"), json!("third")]).unwrap();
        assert_eq!(sheet.max_rows(), 4);
        assert_eq!(sheet.value(0, 0), &CellValue::from("time"));
        assert_eq!(sheet.value(1, 1), &CellValue::from("third"));
        assert_eq!(sheet.value(2, 1), &CellValue::from("second"));
        assert_eq!(sheet.value(3, 1), &CellValue::from("first"));

        update_live_feed(&mut sheet, &[json!("t4"), json!("fourth")]).unwrap();
        assert_eq!(sheet.max_rows(), 4);
        assert_eq!(sheet.value(1, 1), &CellValue::from("fourth"));
        assert_eq!(sheet.value(3, 1), &CellValue::from("second"));
    }

    #[test]
    fn test_live_feed_grows_tiny_sheet() {
        let mut sheet = Sheet::with_size("Feed", 1, 1);
        update_live_feed(&mut sheet, &[json!(5)]).unwrap();
        assert_eq!(sheet.max_rows(), 2);
        assert_eq!(sheet.value(1, 0), &CellValue::Number(5.0));
    }

    #[test]
    fn test_live_feed_requires_values() {
        let mut sheet = Sheet::with_size("Feed", 3, 1);
        assert!(matches!(
            update_live_feed(&mut sheet, &[]),
            Err(SyncError::Validation(_))
        ));
    }
}
