//! Comparison engine: intent detection, value extraction, table building

pub mod detect;
pub mod extract;
pub mod table;

pub use detect::detect;
pub use extract::{extract_value, infer_parameters};
pub use table::build;
