//! Output formatting for query results

pub mod table;

use clap::ValueEnum;

use crate::error::Result;
use crate::result::TabularResult;

pub use table::format_table;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Rounded table for humans
    #[default]
    Table,
    /// Pretty-printed JSON rows for tooling
    Json,
}

/// Render a result in the selected format
pub fn render(result: &TabularResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(format_table(result)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&result.to_json_rows())?),
    }
}
