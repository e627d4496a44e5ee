mod cli;
mod json;
mod report;

pub use cli::print_cli_table;
pub use json::generate_json_string;
pub use report::generate_text_report;

use crate::scan::ScanReport;
use anyhow::Result;

/// Format of the report file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text report
    Text,
    /// JSON format for programmatic use
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'text' or 'json'", s)),
        }
    }
}

/// Format a report for file output
pub fn format_report_to_string(report: &ScanReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(generate_text_report(report)),
        OutputFormat::Json => generate_json_string(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("text"), Ok(OutputFormat::Text));
        assert_eq!(OutputFormat::from_str("TXT"), Ok(OutputFormat::Text));
        assert_eq!(OutputFormat::from_str("Json"), Ok(OutputFormat::Json));
        assert!(OutputFormat::from_str("sarif").is_err());
    }
}
