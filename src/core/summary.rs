use crate::domain::model::QueryResult;
use serde::{Deserialize, Serialize};

pub const SAMPLE_ROWS: usize = 10;
const DATE_COLUMN: &str = "metric_report_mst_month";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// 查詢結果的摘要，送進分析提示與 JSON 報告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    pub total_records: usize,
    pub columns: Vec<String>,
    pub date_range: DateRange,
    pub business_units: Vec<String>,
    pub metrics: Vec<String>,
    pub entry_types: Vec<String>,
    pub sample_data: Vec<serde_json::Map<String, serde_json::Value>>,
}

fn cell_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Distinct non-null values of `column`, first occurrence order.
fn distinct(result: &QueryResult, column: &str) -> Vec<String> {
    let Some(idx) = result.column_index(column) else {
        return Vec::new();
    };
    let mut values: Vec<String> = Vec::new();
    for row in &result.rows {
        if let Some(text) = row.get(idx).and_then(cell_text) {
            if !values.contains(&text) {
                values.push(text);
            }
        }
    }
    values
}

/// `MM-YYYY` sorts wrong as text; compare as (year, month) when the value has that shape.
fn date_key(value: &str) -> (String, String) {
    match value.split_once('-') {
        Some((month, year)) if month.len() == 2 && year.len() == 4 => {
            (year.to_string(), month.to_string())
        }
        _ => (value.to_string(), String::new()),
    }
}

fn date_range(result: &QueryResult) -> DateRange {
    let values = distinct(result, DATE_COLUMN);
    let start = values.iter().min_by_key(|v| date_key(v)).cloned();
    let end = values.iter().max_by_key(|v| date_key(v)).cloned();
    DateRange {
        start: start.unwrap_or_else(|| "Unknown".to_string()),
        end: end.unwrap_or_else(|| "Unknown".to_string()),
    }
}

impl DataSummary {
    pub fn from_result(result: &QueryResult) -> Self {
        Self {
            total_records: result.len(),
            columns: result.columns.clone(),
            date_range: date_range(result),
            business_units: distinct(result, "business_unit"),
            metrics: distinct(result, "metric_name"),
            entry_types: distinct(result, "entry_type"),
            sample_data: result.records().into_iter().take(SAMPLE_ROWS).collect(),
        }
    }

    pub fn metrics_preview(&self, limit: usize) -> String {
        let shown = self
            .metrics
            .iter()
            .take(limit)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if self.metrics.len() > limit {
            format!("{}...", shown)
        } else {
            shown
        }
    }
}
