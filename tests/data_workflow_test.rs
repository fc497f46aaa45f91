use async_trait::async_trait;
use chrono::NaiveDate;
use howto_bot::config::RunOptions;
use howto_bot::core::{
    AnalysisRequest, AnalysisService, QueryResult, Stage, StageStatus, Warehouse,
};
use howto_bot::{BotError, DataAnalysisPipeline, LocalStorage, Orchestrator, Result};
use serde_json::json;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct FakeWarehouse {
    result: QueryResult,
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn run_query(&self, sql: &str) -> Result<QueryResult> {
        self.queries.lock().unwrap().push(sql.to_string());
        Ok(self.result.clone())
    }
}

#[derive(Default)]
struct FakeAnalyzer {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl AnalysisService for FakeAnalyzer {
    async fn invoke(&self, request: &AnalysisRequest) -> Result<String> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok("## Key Findings\n\n- CSAT is above target".to_string())
    }

    fn model_id(&self) -> &str {
        "fake-model"
    }
}

fn scorecard_rows() -> QueryResult {
    QueryResult {
        columns: vec![
            "metric_report_mst_month".into(),
            "entry_type".into(),
            "business_unit".into(),
            "metric_name".into(),
            "metric_value".into(),
        ],
        rows: vec![
            vec![json!("01-2025"), json!("actual"), json!("CARE & SERVICES"), json!("CSAT"), json!(91.5)],
            vec![json!("01-2025"), json!("target"), json!("CARE & SERVICES"), json!("CSAT"), json!(90)],
            vec![json!("02-2025"), json!("actual"), json!("CARE & SERVICES"), json!("AHT"), json!(310)],
        ],
    }
}

fn build(
    dir: &TempDir,
    warehouse: Arc<FakeWarehouse>,
    analyzer: Arc<FakeAnalyzer>,
    focus: Option<&str>,
) -> DataAnalysisPipeline<LocalStorage, RunOptions> {
    let output = dir.path().to_str().unwrap().to_string();
    DataAnalysisPipeline::new(
        LocalStorage::new(output.clone()),
        RunOptions::new(output),
        warehouse,
        analyzer,
    )
    .with_focus(focus.map(str::to_string))
    .with_timestamp(
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap(),
    )
}

#[tokio::test]
async fn test_data_analysis_writes_markdown_and_json_reports() {
    let dir = TempDir::new().unwrap();
    let warehouse = Arc::new(FakeWarehouse {
        result: scorecard_rows(),
        queries: Mutex::new(Vec::new()),
    });
    let analyzer = Arc::new(FakeAnalyzer::default());

    let pipeline = build(&dir, warehouse.clone(), analyzer.clone(), Some("Compare CSAT to target"));
    let report = Orchestrator::new(pipeline).run().await;

    assert!(report.succeeded(), "{}", report);
    assert_eq!(report.status(Stage::Publish), Some(&StageStatus::Skipped));
    assert!(warehouse.queries.lock().unwrap()[0].contains("ba_corporate.scorecard_test_dn"));

    let prompt = analyzer.prompts.lock().unwrap()[0].clone();
    assert!(prompt.starts_with("Compare CSAT to target"));
    assert!(prompt.contains("Total Records: 3"));
    assert!(prompt.contains("Date Range: 01-2025 to 02-2025"));

    let markdown = fs::read_to_string(dir.path().join("redshift_analysis_20250301_093000.md")).unwrap();
    assert!(markdown.starts_with("# Scorecard Data Analysis - 2025-03-01"));
    assert!(markdown.contains("- **Metrics:** CSAT, AHT"));
    assert!(markdown.contains("- CSAT is above target"));

    let raw = fs::read_to_string(dir.path().join("redshift_analysis_20250301_093000.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["timestamp"], "2025-03-01T09:30:00");
    assert_eq!(json["custom_prompt"], "Compare CSAT to target");
    assert_eq!(json["data_summary"]["total_records"], 3);
    assert_eq!(json["data_summary"]["entry_types"], json!(["actual", "target"]));
    assert_eq!(json["analysis"], "## Key Findings\n\n- CSAT is above target");
}

#[tokio::test]
async fn test_empty_result_stops_before_analysis() {
    let dir = TempDir::new().unwrap();
    let warehouse = Arc::new(FakeWarehouse {
        result: QueryResult::default(),
        queries: Mutex::new(Vec::new()),
    });
    let analyzer = Arc::new(FakeAnalyzer::default());

    let report = Orchestrator::new(build(&dir, warehouse, analyzer.clone(), None))
        .run()
        .await;

    assert!(matches!(
        report.failure.as_ref().map(|f| &f.error),
        Some(BotError::ProcessingError { .. })
    ));
    assert_eq!(report.status(Stage::Document), Some(&StageStatus::NotAttempted));
    assert!(analyzer.prompts.lock().unwrap().is_empty());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_default_focus_when_none_given() {
    let dir = TempDir::new().unwrap();
    let warehouse = Arc::new(FakeWarehouse {
        result: scorecard_rows(),
        queries: Mutex::new(Vec::new()),
    });
    let analyzer = Arc::new(FakeAnalyzer::default());

    let pipeline = build(&dir, warehouse, analyzer.clone(), Some("   "))
        .with_sql("SELECT * FROM scorecard LIMIT 3");
    let report = Orchestrator::new(pipeline).run().await;

    assert!(report.succeeded());
    let prompt = analyzer.prompts.lock().unwrap()[0].clone();
    assert!(prompt.starts_with("Analyze this business scorecard data"));

    let raw = fs::read_to_string(dir.path().join("redshift_analysis_20250301_093000.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(json["custom_prompt"].is_null());
}
