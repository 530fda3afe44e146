// src/locate/mod.rs
pub mod delimiter;

pub use delimiter::{detect_delimiter, Delimiter};

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NormalizeError, Result};
use crate::table::{NormalizedTable, RawTable};

/// Where the real table sits inside a raw file. All three indices are 1-based line numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundarySpec {
    pub header_line: usize,
    pub first_data_line: usize,
    pub last_data_line: usize,
}

impl BoundarySpec {
    pub fn new(header_line: usize, first_data_line: usize, last_data_line: usize) -> Self {
        Self {
            header_line,
            first_data_line,
            last_data_line,
        }
    }

    /// Checks the ordering of the three indices, independent of any file.
    pub fn validate_order(&self) -> Result<()> {
        self.check(usize::MAX)
    }

    /// Checks `1 <= header < first <= last <= total_lines`.
    pub fn validate(&self, total_lines: usize) -> Result<()> {
        self.check(total_lines)
    }

    fn check(&self, total_lines: usize) -> Result<()> {
        let ok = self.header_line >= 1
            && self.header_line < self.first_data_line
            && self.first_data_line <= self.last_data_line
            && self.last_data_line <= total_lines;
        if ok {
            Ok(())
        } else {
            Err(NormalizeError::InvalidBoundary {
                header_line: self.header_line,
                first_data_line: self.first_data_line,
                last_data_line: self.last_data_line,
                total_lines,
            })
        }
    }

    pub fn data_rows(&self) -> usize {
        self.last_data_line - self.first_data_line + 1
    }

    /// The concrete boundary for a file of `total_lines` lines.
    pub fn for_file(&self, end: DataEnd, total_lines: usize) -> BoundarySpec {
        match end {
            DataEnd::Fixed => *self,
            DataEnd::EndOfFile { footer_lines } => BoundarySpec {
                last_data_line: total_lines.saturating_sub(footer_lines),
                ..*self
            },
        }
    }
}

/// Where the data block stops in files other than the one a boundary was read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataEnd {
    /// Exactly at `last_data_line`.
    #[default]
    Fixed,
    /// `footer_lines` before the end of each file; 0 reads to the end.
    EndOfFile { footer_lines: usize },
}

/// Splits one line into trimmed fields. A blank line yields no fields.
fn split_line(line: &str, delimiter: u8) -> Result<Vec<String>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());
    match rdr.records().next() {
        Some(record) => Ok(record?.iter().map(str::to_string).collect()),
        None => Ok(Vec::new()),
    }
}

/// Parameter names on the header line, as `locate` would read them.
pub fn header_fields(
    raw: &RawTable,
    boundary: &BoundarySpec,
    delimiter: Delimiter,
) -> Result<Vec<String>> {
    boundary.validate(raw.len())?;
    let header = raw.line(boundary.header_line).unwrap_or_default();
    let sep = delimiter.resolve(header, boundary.header_line)?;
    let names = split_line(header, sep)?;
    if names.is_empty() {
        return Err(NormalizeError::EmptyColumnName {
            line: boundary.header_line,
            position: 1,
        });
    }
    if let Some(position) = names.iter().position(|n| n.is_empty()) {
        return Err(NormalizeError::EmptyColumnName {
            line: boundary.header_line,
            position: position + 1,
        });
    }
    Ok(names)
}

/// Extracts the header row and the contiguous data block described by `boundary`.
/// Everything before the header, between header and data, and after the last data
/// line is dropped. A data row whose width differs from the header fails the call.
#[tracing::instrument(level = "debug", skip(raw), fields(lines = raw.len()))]
pub fn locate(
    raw: &RawTable,
    boundary: &BoundarySpec,
    delimiter: Delimiter,
) -> Result<NormalizedTable> {
    let headers = header_fields(raw, boundary, delimiter)?;
    let header = raw.line(boundary.header_line).unwrap_or_default();
    let sep = delimiter.resolve(header, boundary.header_line)?;

    let mut rows = Vec::with_capacity(boundary.data_rows());
    for number in boundary.first_data_line..=boundary.last_data_line {
        let line = raw.line(number).unwrap_or_default();
        let fields = split_line(line, sep)?;
        if fields.len() != headers.len() {
            return Err(NormalizeError::MalformedRow {
                line: number,
                expected: headers.len(),
                found: fields.len(),
            });
        }
        rows.push(fields);
    }

    debug!(
        columns = headers.len(),
        rows = rows.len(),
        delimiter = %(sep as char).escape_default(),
        "located table"
    );
    NormalizedTable::from_parts(headers, rows, boundary.first_data_line)
}
