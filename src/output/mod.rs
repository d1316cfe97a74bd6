pub mod json;
pub mod table;

pub use json::render_json;
pub use table::{render_changes_table, render_snapshot_table};
