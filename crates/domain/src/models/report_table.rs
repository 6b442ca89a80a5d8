//! Tabular rendering of report execution results.

use serde::Serialize;

use crate::models::report::{ReportColumn, ReportRow};

/// Placeholder shown for a cell whose key is absent or null.
pub const MISSING_CELL: &str = "-";

/// Report results laid out in column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn render(columns: &[ReportColumn], rows: &[ReportRow]) -> Self {
        let keys: Vec<String> = columns.iter().map(ReportColumn::result_key).collect();
        let headers = columns.iter().map(|c| c.label.clone()).collect();
        let rows = rows
            .iter()
            .map(|row| keys.iter().map(|key| cell(row.get(key))).collect())
            .collect();
        Self { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

fn cell(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => MISSING_CELL.to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
