pub mod config;
pub mod error;
pub mod import;
pub mod locate;
pub mod table;
pub mod template;
pub mod transform;
pub mod utils;

pub use error::{NormalizeError, Result};
pub use import::{
    define_template, define_template_interactively, list_templates, run_import, run_imports,
    ImportJob, ImportReport, ImportSource, Prompter, TemplateAnswers,
};
pub use locate::{locate, BoundarySpec, DataEnd, Delimiter};
pub use table::{ColumnRole, NormalizedTable, RawTable};
pub use template::{apply, Template, TemplateRegistry};
pub use transform::{transform, ConversionFlags, TimeDerivation, TimeFormat, TimeRule};
