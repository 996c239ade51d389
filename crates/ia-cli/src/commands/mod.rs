//! CLI command implementations.

pub mod menu;
pub mod run;

pub use menu::run_menu;
pub use run::{build_pipeline, print_outcome, run_selection, Selection};
