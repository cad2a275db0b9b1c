//! Table output formatting

use tabled::builder::Builder;
use tabled::settings::{Alignment, Modify, Style, object::Rows};

use crate::result::TabularResult;

/// Format a result as a table, header row from the schema
pub fn format_table(result: &TabularResult) -> String {
    if result.is_empty() {
        return "No results found.".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(result.schema().iter().map(|c| c.name.as_str()));
    for row in result.rows() {
        builder.push_record(row.iter().map(|v| v.render()));
    }

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}
