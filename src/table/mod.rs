// src/table/mod.rs
pub mod raw_table;

pub use raw_table::RawTable;

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, io::Write};

use crate::error::{NormalizeError, Result};

/// What a column means to the target layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Time,
    Latitude,
    Longitude,
    #[default]
    Plain,
}

impl ColumnRole {
    pub fn is_angle(&self) -> bool {
        matches!(self, ColumnRole::Latitude | ColumnRole::Longitude)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ColumnRole::Time => "time",
            ColumnRole::Latitude => "latitude",
            ColumnRole::Longitude => "longitude",
            ColumnRole::Plain => "plain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub role: ColumnRole,
    /// Set once the values have been converted from degrees; later conversions skip the column.
    pub in_radians: bool,
}

impl Column {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: ColumnRole::Plain,
            in_radians: false,
        }
    }

    pub fn with_role(name: impl Into<String>, role: ColumnRole) -> Self {
        Self {
            role,
            ..Self::plain(name)
        }
    }
}

/// A rectangular table: unique, ordered columns and rows aligned to them.
/// Every row holds exactly one value per column for the lifetime of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
    /// Source line of `rows[0]`, used to point value errors back at the file.
    first_data_line: usize,
}

impl NormalizedTable {
    /// Builds a table as if `headers` were line 1 of a plain CSV and `rows` followed it.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        Self::from_parts(headers, rows, 2)
    }

    pub(crate) fn from_parts(
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        first_data_line: usize,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(headers.len());
        for name in &headers {
            if !seen.insert(name.as_str()) {
                return Err(NormalizeError::DuplicateColumn(name.clone()));
            }
        }
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(NormalizeError::MalformedRow {
                    line: first_data_line + idx,
                    expected: headers.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self {
            columns: headers.into_iter().map(Column::plain).collect(),
            rows,
            first_data_line,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Source line number of the data row at `row_idx`.
    pub fn line_of(&self, row_idx: usize) -> usize {
        self.first_data_line + row_idx
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| NormalizeError::UnknownColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index_of(name).map(|idx| &self.columns[idx])
    }

    pub fn set_role(&mut self, name: &str, role: ColumnRole) -> Result<()> {
        let idx = self.require(name)?;
        self.columns[idx].role = role;
        Ok(())
    }

    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |row| row[idx].as_str())
    }

    /// Names of every column tagged `Time`, in table order.
    pub fn time_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.role == ColumnRole::Time)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Index of the single `Time` column.
    pub fn time_column(&self) -> Result<usize> {
        let mut found = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.role == ColumnRole::Time)
            .map(|(idx, _)| idx);
        match (found.next(), found.next()) {
            (Some(idx), None) => Ok(idx),
            (None, _) => Err(NormalizeError::MissingTimeColumn),
            (Some(_), Some(_)) => Err(NormalizeError::AmbiguousTimeColumn {
                columns: self.time_columns().into_iter().map(String::from).collect(),
            }),
        }
    }

    pub(crate) fn column_mut(&mut self, idx: usize) -> &mut Column {
        &mut self.columns[idx]
    }

    pub(crate) fn rename_column(&mut self, idx: usize, new_name: String) -> Result<()> {
        if self.columns[idx].name == new_name {
            return Ok(());
        }
        if self.index_of(&new_name).is_some() {
            return Err(NormalizeError::DuplicateColumn(new_name));
        }
        self.columns[idx].name = new_name;
        Ok(())
    }

    /// Overwrites the values of column `idx`; `values` must hold one entry per row.
    pub(crate) fn replace_values(&mut self, idx: usize, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.rows.len());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
    }

    /// Appends a column; `values` must hold one entry per row.
    pub(crate) fn push_column(&mut self, column: Column, values: Vec<String>) -> Result<()> {
        if self.index_of(&column.name).is_some() {
            return Err(NormalizeError::DuplicateColumn(column.name));
        }
        debug_assert_eq!(values.len(), self.rows.len());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        self.columns.push(column);
        Ok(())
    }

    pub(crate) fn remove_column(&mut self, idx: usize) -> Column {
        for row in &mut self.rows {
            row.remove(idx);
        }
        self.columns.remove(idx)
    }

    /// Moves column `idx` with all its values to position 0; the others keep their order.
    pub(crate) fn move_to_front(&mut self, idx: usize) {
        self.columns[..=idx].rotate_right(1);
        for row in &mut self.rows {
            row[..=idx].rotate_right(1);
        }
    }

    /// Writes the header and every row as delimited text.
    pub fn write_csv<W: Write>(&self, writer: W, delimiter: u8) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);
        wtr.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
