pub mod extractor;
pub mod model;
pub mod rows;
pub mod selector;
pub mod template;

pub use extractor::{extract_generic, extract_with_template};
pub use model::{TableCell, TableExtractionResult};
pub use selector::{resolve_template, select_template, MatchReason, TemplateMatch};
pub use template::{
    adapt_layout_row, builtin_for_record_type, builtin_templates, read_layout_row, TemplateSpec,
};
