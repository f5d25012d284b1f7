//! Rectangular data tables of named f64 columns
//!
//! The table is the unit of exchange with the fitting code: every column has
//! the same length, rows align by index, and construction rejects ragged
//! input instead of silently dropping rows.

use crate::error::{PermTestError, Result};
use std::collections::HashMap;
use std::path::Path;

/// A rectangular table of named numeric columns, rows aligned by index
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    /// Column order as supplied (CSV header order for loaded tables)
    names: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
    n_rows: usize,
}

impl DataTable {
    /// Build a table from (name, values) pairs
    ///
    /// Fails if the table is empty, a name repeats, or columns disagree on
    /// length.
    pub fn new(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        if columns.is_empty() {
            return Err(PermTestError::Table("table has no columns".to_string()));
        }

        let n_rows = columns[0].1.len();
        if n_rows == 0 {
            return Err(PermTestError::Table("table has no rows".to_string()));
        }

        let mut names = Vec::with_capacity(columns.len());
        let mut map = HashMap::with_capacity(columns.len());

        for (name, values) in columns {
            if values.len() != n_rows {
                return Err(PermTestError::Table(format!(
                    "column '{}' has {} rows, expected {}",
                    name,
                    values.len(),
                    n_rows
                )));
            }
            if map.insert(name.clone(), values).is_some() {
                return Err(PermTestError::Table(format!("duplicate column '{}'", name)));
            }
            names.push(name);
        }

        Ok(Self {
            names,
            columns: map,
            n_rows,
        })
    }

    /// Load a table from a CSV file with a header row; every cell must parse
    /// as f64
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| PermTestError::Table(format!("cannot open '{}': {}", path.display(), e)))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| PermTestError::Table(format!("cannot read CSV header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];

        for (row_idx, record) in reader.records().enumerate() {
            let record =
                record.map_err(|e| PermTestError::Table(format!("row {}: {}", row_idx + 1, e)))?;
            if record.len() != headers.len() {
                return Err(PermTestError::Table(format!(
                    "row {} has {} fields, expected {}",
                    row_idx + 1,
                    record.len(),
                    headers.len()
                )));
            }
            for (col_idx, cell) in record.iter().enumerate() {
                let value: f64 = cell.trim().parse().map_err(|_| {
                    PermTestError::Table(format!(
                        "row {}, column '{}': '{}' is not numeric",
                        row_idx + 1,
                        headers[col_idx],
                        cell
                    ))
                })?;
                columns[col_idx].push(value);
            }
        }

        Self::new(headers.into_iter().zip(columns).collect())
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Column names in original order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| PermTestError::Table(format!("no column named '{}'", name)))
    }

    /// Replace the values of an existing column, preserving length
    ///
    /// Used by the permutation generator to swap in a shuffled response.
    pub fn replace_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.n_rows {
            return Err(PermTestError::Table(format!(
                "replacement for '{}' has {} rows, expected {}",
                name,
                values.len(),
                self.n_rows
            )));
        }
        match self.columns.get_mut(name) {
            Some(col) => {
                *col = values;
                Ok(())
            }
            None => Err(PermTestError::Table(format!("no column named '{}'", name))),
        }
    }
}
