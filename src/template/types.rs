// src/template/types.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{NormalizeError, Result};
use crate::locate::{header_fields, BoundarySpec, DataEnd, Delimiter};
use crate::table::{ColumnRole, RawTable};
use crate::transform::{ConversionFlags, TimeDerivation};

/// A saved normalization recipe for one recurring file layout.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq)]
pub struct Template {
    pub name: String,
    pub boundary: BoundarySpec,
    /// How `boundary.last_data_line` carries over to files of other lengths.
    #[serde(default)]
    pub data_end: DataEnd,
    #[serde(default)]
    pub delimiter: Delimiter,
    /// Original column name → role. Columns not listed are `Plain`.
    #[serde(default)]
    pub column_roles: BTreeMap<String, ColumnRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_derivation: Option<TimeDerivation>,
    #[serde(default)]
    pub flags: ConversionFlags,
    /// Header fields of the file this template was characterized on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_signature: Option<Vec<String>>,
}

impl Template {
    pub fn new(name: impl Into<String>, boundary: BoundarySpec) -> Self {
        Self {
            name: name.into(),
            boundary,
            data_end: DataEnd::default(),
            delimiter: Delimiter::default(),
            column_roles: BTreeMap::new(),
            time_derivation: None,
            flags: ConversionFlags::default(),
            header_signature: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_data_end(mut self, data_end: DataEnd) -> Self {
        self.data_end = data_end;
        self
    }

    /// The boundary this template describes for `raw` specifically.
    pub fn boundary_for(&self, raw: &RawTable) -> BoundarySpec {
        self.boundary.for_file(self.data_end, raw.len())
    }

    pub fn with_role(mut self, column: impl Into<String>, role: ColumnRole) -> Self {
        self.column_roles.insert(column.into(), role);
        self
    }

    pub fn with_time_derivation(mut self, derivation: TimeDerivation) -> Self {
        self.time_derivation = Some(derivation);
        self
    }

    pub fn with_flags(mut self, flags: ConversionFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Records the header of `sample` so matching files can be recognised later.
    pub fn with_signature_from(mut self, sample: &RawTable) -> Result<Self> {
        let boundary = self.boundary_for(sample);
        self.header_signature = Some(header_fields(sample, &boundary, self.delimiter)?);
        Ok(self)
    }

    /// True when `raw` has this template's recorded header at this template's header line.
    pub fn matches(&self, raw: &RawTable) -> bool {
        match &self.header_signature {
            Some(sig) => header_fields(raw, &self.boundary_for(raw), self.delimiter)
                .map(|fields| &fields == sig)
                .unwrap_or(false),
            None => false,
        }
    }

    /// Checks everything that can be checked without a file.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        self.boundary.validate_order()?;
        self.delimiter.validate()?;

        if self.column_roles.keys().any(|c| c.trim().is_empty()) {
            return Err(invalid(format!(
                "template `{}` assigns a role to an empty column name",
                self.name
            )));
        }

        let time_columns: Vec<&str> = self
            .column_roles
            .iter()
            .filter(|(_, role)| **role == ColumnRole::Time)
            .map(|(name, _)| name.as_str())
            .collect();
        if time_columns.len() > 1 {
            return Err(invalid(format!(
                "template `{}` tags more than one time column: {}",
                self.name,
                time_columns.join(", ")
            )));
        }

        if let Some(d) = &self.time_derivation {
            if d.source_column.trim().is_empty() || d.output_column_name.trim().is_empty() {
                return Err(invalid(format!(
                    "template `{}` has a time derivation with an empty column name",
                    self.name
                )));
            }
            if let Some(time) = time_columns.first() {
                return Err(invalid(format!(
                    "template `{}` tags `{}` as the time column and also derives one from `{}`",
                    self.name, time, d.source_column
                )));
            }
            if let Some(role) = self.column_roles.get(&d.source_column) {
                if role.is_angle() {
                    return Err(invalid(format!(
                        "time source `{}` is also tagged {}",
                        d.source_column,
                        role.as_str()
                    )));
                }
            }
            let clashes = self
                .column_roles
                .iter()
                .any(|(name, role)| *name == d.output_column_name && *role != ColumnRole::Plain);
            if clashes {
                return Err(invalid(format!(
                    "derived time column `{}` collides with a tagged column",
                    d.output_column_name
                )));
            }
        }

        if let Some(sig) = &self.header_signature {
            if sig.is_empty() {
                return Err(invalid(format!(
                    "template `{}` has an empty header signature",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

fn invalid(msg: String) -> NormalizeError {
    NormalizeError::InvalidTemplate(msg)
}

/// Template names double as file stems.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(invalid("template name is empty".into()));
    }
    if name.starts_with('.') || name.contains(['/', '\\']) || name.chars().any(char::is_control) {
        return Err(invalid(format!(
            "template name `{}` must not start with `.` or contain path separators",
            name
        )));
    }
    Ok(())
}
