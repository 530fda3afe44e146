// src/transform/mod.rs
pub mod angles;
pub mod relocate;
pub mod time;

pub use angles::{convert_angles, radian_name};
pub use relocate::relocate_time_first;
pub use time::{compute_total_time, TimeDerivation, TimeFormat, TimeRule, DEFAULT_TIME_COLUMN};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NormalizeError, Result};
use crate::table::NormalizedTable;

/// Which column transformations run. They always run in field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionFlags {
    pub convert_angles: bool,
    pub rename_angle_columns: bool,
    pub compute_time: bool,
    pub relocate_time: bool,
}

impl Default for ConversionFlags {
    fn default() -> Self {
        Self {
            convert_angles: true,
            rename_angle_columns: true,
            compute_time: true,
            relocate_time: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    /// Angle columns converted, by their final names.
    pub converted_angles: Vec<String>,
    /// Canonical time column, when one was computed or confirmed.
    pub time_column: Option<String>,
}

/// Runs angle conversion, time computation and time relocation on `table`, as enabled.
///
/// The name returned by the time step is carried into the relocation step; the
/// column that ends up first must be that column.
pub fn transform(
    table: &mut NormalizedTable,
    derivation: Option<&TimeDerivation>,
    flags: &ConversionFlags,
) -> Result<TransformReport> {
    let mut report = TransformReport::default();

    if flags.convert_angles {
        report.converted_angles = convert_angles(table, flags.rename_angle_columns)?;
    }

    if flags.compute_time {
        report.time_column = Some(compute_total_time(table, derivation)?);
    }

    if flags.relocate_time {
        let moved = relocate_time_first(table)?;
        match &report.time_column {
            Some(expected) if *expected != moved => {
                return Err(NormalizeError::InvalidTemplate(format!(
                    "time column `{}` was derived but `{}` was relocated",
                    expected, moved
                )));
            }
            Some(_) => {}
            None => report.time_column = Some(moved),
        }
    }

    debug!(?report, "transformed table");
    Ok(report)
}
