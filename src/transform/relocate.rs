use tracing::debug;

use crate::error::Result;
use crate::table::NormalizedTable;

/// Moves the single `Time` column, values included, to index 0 and returns its name.
/// The other columns keep their relative order; a table already in that shape is unchanged.
pub fn relocate_time_first(table: &mut NormalizedTable) -> Result<String> {
    let idx = table.time_column()?;
    let name = table.columns()[idx].name.clone();
    if idx > 0 {
        table.move_to_front(idx);
        debug!(column = %name, from = idx, "moved time column first");
    }
    Ok(name)
}
