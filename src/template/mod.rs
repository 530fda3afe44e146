pub mod store;
pub mod types;
pub mod write;

pub use store::{RegistrySnapshot, TemplateRegistry};
pub use types::Template;
pub use write::write_template;

use tracing::debug;

use crate::error::Result;
use crate::locate::locate;
use crate::table::{NormalizedTable, RawTable};
use crate::transform::{transform, TransformReport};

/// Locates the table in `raw`, tags the template's column roles, and runs the
/// enabled transformations. The result is ready for the target converter.
pub fn apply(template: &Template, raw: &RawTable) -> Result<NormalizedTable> {
    apply_with_report(template, raw).map(|(table, _)| table)
}

#[tracing::instrument(level = "debug", skip_all, fields(template = %template.name))]
pub fn apply_with_report(
    template: &Template,
    raw: &RawTable,
) -> Result<(NormalizedTable, TransformReport)> {
    let boundary = template.boundary_for(raw);
    if boundary.last_data_line < raw.len() {
        debug!(
            ignored = raw.len() - boundary.last_data_line,
            "lines after the data block"
        );
    }
    let mut table = locate(raw, &boundary, template.delimiter)?;
    for (column, role) in &template.column_roles {
        table.set_role(column, *role)?;
    }
    let report = transform(
        &mut table,
        template.time_derivation.as_ref(),
        &template.flags,
    )?;
    debug!(rows = table.num_rows(), columns = table.num_columns(), "applied template");
    Ok((table, report))
}
