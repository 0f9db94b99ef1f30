use super::CellValue;
use crate::error::{Result, SyncError};

/// A rectangular table: one header row of column names plus data rows.
///
/// Every data row has exactly `header.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    header: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    /// # Errors
    /// Returns [`SyncError::Shape`] if any row's width differs from the header's.
    pub fn new(header: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != header.len())
        {
            return Err(SyncError::Shape(format!(
                "row {} has {} cells but the header has {}",
                idx + 1,
                row.len(),
                header.len()
            )));
        }
        Ok(Self { header, rows })
    }

    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut Vec<CellValue>> {
        self.rows.iter_mut()
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Number of sheet rows the grid occupies, header included.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len() + 1
    }

    /// Header (as text) followed by the data rows, ready to write to a sheet.
    #[must_use]
    pub fn to_values(&self) -> Vec<Vec<CellValue>> {
        let mut values = Vec::with_capacity(self.height());
        values.push(
            self.header
                .iter()
                .map(|h| CellValue::Text(h.clone()))
                .collect(),
        );
        values.extend(self.rows.iter().cloned());
        values
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_rejects_ragged_rows() {
        let err = Grid::new(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Number(1.0)]],
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Shape(_)));
    }

    #[test]
    fn test_to_values_includes_header() {
        let grid = Grid::new(vec!["a".into()], vec![vec![CellValue::Number(1.0)]]).unwrap();
        let values = grid.to_values();
        assert_eq!(values.len(), 2);
        assert_eq!(values.first().unwrap(), &vec![CellValue::Text("a".into())]);
    }
}
