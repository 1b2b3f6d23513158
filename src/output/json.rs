use crate::report::AuditReport;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Write the audit report as pretty-printed JSON
pub fn write_report(report: &AuditReport, path: &Path) -> Result<()> {
    let json = to_pretty_json(report)?;

    std::fs::write(path, &json)
        .with_context(|| format!("Failed to write report to {:?}", path))?;

    Ok(())
}

/// Serialize any report value for stdout or a file
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize report to JSON")
}
