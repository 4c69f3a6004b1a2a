//! Terminal output helpers

pub mod progress;
pub mod table;

pub use progress::create_spinner;
pub use table::{format_characters_table, format_models_table};
