//! Table output formatting

use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

/// Rounded table with centered headers, or "No results found." when empty
pub fn format_table<T: Tabled>(rows: &[T]) -> String {
    format_table_or(rows, "No results found.")
}

/// Rounded table with centered headers, or `empty` when there are no rows
pub fn format_table_or<T: Tabled>(rows: &[T], empty: &str) -> String {
    if rows.is_empty() {
        return empty.to_string();
    }

    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string()
}
