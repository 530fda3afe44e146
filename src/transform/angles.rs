use tracing::{debug, warn};

use crate::error::{NormalizeError, Result};
use crate::table::NormalizedTable;

const DEGREE_SUFFIXES: [(&str, &str); 4] = [
    ("_degrees", "_rad"),
    ("_DEGREES", "_RAD"),
    ("_deg", "_rad"),
    ("_DEG", "_RAD"),
];

/// `lat_deg` → `lat_rad`, `LATITUDE` → `LATITUDE_RAD`.
pub fn radian_name(name: &str) -> String {
    for (deg, rad) in DEGREE_SUFFIXES {
        if let Some(stem) = name.strip_suffix(deg) {
            return format!("{}{}", stem, rad);
        }
    }
    format!("{}_RAD", name)
}

/// Converts every `Latitude`/`Longitude` column from degrees to radians (`v * π/180`).
///
/// Not idempotent on the data: a column is converted only while its `in_radians`
/// flag is unset, and the flag is set afterwards. Blank cells stay blank.
/// Returns the (possibly renamed) names of the columns converted by this call.
pub fn convert_angles(table: &mut NormalizedTable, rename: bool) -> Result<Vec<String>> {
    let targets: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.role.is_angle())
        .map(|(idx, _)| idx)
        .collect();

    let mut converted = Vec::with_capacity(targets.len());
    for idx in targets {
        let name = table.columns()[idx].name.clone();
        if table.columns()[idx].in_radians {
            warn!(column = %name, "already in radians, skipping");
            continue;
        }

        let mut values = Vec::with_capacity(table.num_rows());
        for (row, value) in table.column_values(idx).enumerate() {
            let v = value.trim();
            if v.is_empty() {
                values.push(String::new());
                continue;
            }
            let degrees: f64 = v
                .parse()
                .ok()
                .filter(|d: &f64| d.is_finite())
                .ok_or_else(|| NormalizeError::InvalidValue {
                    column: name.clone(),
                    line: table.line_of(row),
                    value: value.to_string(),
                    reason: "not a number of degrees".into(),
                })?;
            values.push(degrees.to_radians().to_string());
        }

        table.replace_values(idx, values);
        table.column_mut(idx).in_radians = true;

        let final_name = if rename { radian_name(&name) } else { name.clone() };
        table.rename_column(idx, final_name.clone())?;
        debug!(from = %name, to = %final_name, "converted degrees to radians");
        converted.push(final_name);
    }
    Ok(converted)
}
