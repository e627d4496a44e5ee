use crate::scan::ScanReport;
use anyhow::Result;

pub fn generate_json_string(report: &ScanReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
