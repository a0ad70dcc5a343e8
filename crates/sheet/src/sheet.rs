use crate::cell::CellValue;
use crate::error::{Result, SheetError};
use std::collections::HashMap;

/// A named table: an ordered set of column names over row-major cell data.
///
/// Invariant: every row holds exactly `columns().len()` cells. All mutating
/// operations preserve this by padding with `CellValue::Null` or truncating.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    column_index: HashMap<String, usize>,
}

impl Sheet {
    /// Create a new empty sheet
    #[must_use]
    pub fn new() -> Self {
        Self::with_name("Sheet1")
    }

    /// Create a new empty sheet with a name
    #[must_use]
    pub fn with_name(name: &str) -> Self {
        Sheet {
            name: name.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
            column_index: HashMap::new(),
        }
    }

    /// Create a sheet from column names and row data.
    ///
    /// Rows shorter than the header are padded with `Null`; longer rows are
    /// truncated.
    #[must_use]
    pub fn from_rows<T: Into<CellValue>>(
        name: &str,
        columns: Vec<String>,
        rows: Vec<Vec<T>>,
    ) -> Self {
        let width = columns.len();
        let column_index = build_column_index(&columns);
        let rows = rows
            .into_iter()
            .map(|row| {
                let mut row: Vec<CellValue> = row.into_iter().map(Into::into).collect();
                row.resize(width, CellValue::Null);
                row
            })
            .collect();

        Sheet {
            name: name.to_string(),
            columns,
            rows,
            column_index,
        }
    }

    /// Get the sheet name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Ordered column names
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get the number of rows (excluding the header)
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if the sheet has no data rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All data rows
    #[must_use]
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Resolve a column name to its 0-based index
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.column_index
            .get(name)
            .copied()
            .ok_or_else(|| SheetError::ColumnNotFound {
                name: name.to_string(),
            })
    }

    /// Get an entire column by name
    pub fn column_by_name(&self, name: &str) -> Result<Vec<&CellValue>> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Get a cell by row index and column name
    pub fn get(&self, row: usize, column: &str) -> Result<&CellValue> {
        let col = self.column_index(column)?;
        let row = self
            .rows
            .get(row)
            .ok_or(SheetError::RowIndexOutOfBounds {
                index: row,
                count: self.rows.len(),
            })?;
        Ok(&row[col])
    }

    /// Store a raw edit into a cell, normalizing it into a typed value.
    ///
    /// Returns the normalized value actually stored. Fails only on an
    /// unknown column or out-of-range row; the sheet is untouched then.
    pub fn set_cell(&mut self, row: usize, column: &str, raw: &str) -> Result<&CellValue> {
        let col = self.column_index(column)?;
        let count = self.rows.len();
        let row = self
            .rows
            .get_mut(row)
            .ok_or(SheetError::RowIndexOutOfBounds { index: row, count })?;
        row[col] = CellValue::normalize(raw);
        Ok(&row[col])
    }

    /// Append a row, padding unspecified trailing cells with `Null`.
    ///
    /// Excess cells beyond the column count are dropped. Always succeeds;
    /// returns the new row's index.
    pub fn row_append_padded<T: Into<CellValue>>(&mut self, values: Vec<T>) -> usize {
        let mut row: Vec<CellValue> = values.into_iter().map(Into::into).collect();
        row.resize(self.columns.len(), CellValue::Null);
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Delete rows at the given 0-based indices.
    ///
    /// Indices out of range are ignored, duplicates are collapsed. Always
    /// succeeds; returns the number of rows actually removed.
    pub fn row_delete_multi(&mut self, indices: &[usize]) -> usize {
        let mut indices: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.rows.len())
            .collect();
        indices.sort_unstable();
        indices.dedup();

        // Remove back-to-front so earlier indices stay valid
        for index in indices.iter().rev() {
            self.rows.remove(*index);
        }
        indices.len()
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}

fn build_column_index(columns: &[String]) -> HashMap<String, usize> {
    columns
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}
