// src/error.rs
use thiserror::Error;

/// Everything the normalization pipeline can fail with.
///
/// Variants up to `InvalidTemplate` describe a bad configuration (boundary
/// indices, column references, delimiter policy); the rest describe the data.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(
        "invalid boundary: header line {header_line}, data lines {first_data_line}..={last_data_line} \
         (file has {total_lines} lines)"
    )]
    InvalidBoundary {
        header_line: usize,
        first_data_line: usize,
        last_data_line: usize,
        total_lines: usize,
    },

    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    #[error("duplicate column `{0}`")]
    DuplicateColumn(String),

    #[error("empty column name at position {position} of header line {line}")]
    EmptyColumnName { line: usize, position: usize },

    #[error("cannot detect a delimiter on header line {line}")]
    UndetectableDelimiter { line: usize },

    #[error("delimiter {0:?} is not a single ASCII character")]
    InvalidDelimiter(char),

    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    #[error("malformed row at line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("no column is tagged as the time column")]
    MissingTimeColumn,

    #[error("more than one column is tagged as the time column: {}", .columns.join(", "))]
    AmbiguousTimeColumn { columns: Vec<String> },

    #[error("template `{0}` not found")]
    TemplateNotFound(String),

    #[error("no stored template matches the header of {0}")]
    NoMatchingTemplate(String),

    #[error("{count} imports in one batch write to {path}")]
    DuplicateOutput { path: String, count: usize },

    #[error("invalid value `{value}` in column `{column}` at line {line}: {reason}")]
    InvalidValue {
        column: String,
        line: usize,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl NormalizeError {
    /// True for errors the user fixes by correcting a template or boundary.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            NormalizeError::InvalidBoundary { .. }
                | NormalizeError::UnknownColumn(_)
                | NormalizeError::DuplicateColumn(_)
                | NormalizeError::EmptyColumnName { .. }
                | NormalizeError::UndetectableDelimiter { .. }
                | NormalizeError::InvalidDelimiter(_)
                | NormalizeError::InvalidTemplate(_)
        )
    }
}

pub type Result<T, E = NormalizeError> = std::result::Result<T, E>;
