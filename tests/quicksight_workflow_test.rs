use async_trait::async_trait;
use chrono::NaiveDate;
use howto_bot::config::RunOptions;
use howto_bot::core::{
    AnalysisRequest, AnalysisService, DashboardCatalog, DashboardDetails, DashboardSummary, Stage,
    StageStatus,
};
use howto_bot::{
    BotError, DashboardTarget, LocalStorage, Orchestrator, QuickSightPipeline, Result,
};
use serde_json::json;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct FakeCatalog {
    requested: Mutex<Vec<String>>,
}

#[async_trait]
impl DashboardCatalog for FakeCatalog {
    async fn search_dashboards(&self, keyword: &str) -> Result<Vec<DashboardSummary>> {
        let all = [("d1", "Care Scorecard"), ("d2", "Care Escalations")];
        Ok(all
            .iter()
            .filter(|(_, name)| name.to_lowercase().contains(&keyword.to_lowercase()))
            .map(|(id, name)| DashboardSummary {
                dashboard_id: id.to_string(),
                name: name.to_string(),
                created_time: None,
                last_updated_time: None,
            })
            .collect())
    }

    async fn dashboard_details(&self, dashboard_id: &str) -> Result<Option<DashboardDetails>> {
        self.requested.lock().unwrap().push(dashboard_id.to_string());
        if dashboard_id != "d1" {
            return Ok(None);
        }
        Ok(Some(DashboardDetails {
            dashboard: json!({
                "Name": "Care Scorecard",
                "LastUpdatedTime": 1735689600,
                "LastPublishedTime": 1735689600,
                "Version": {"VersionNumber": 3, "Status": "CREATION_SUCCESSFUL"}
            }),
            definition: Some(json!({
                "Sheets": [{"Name": "Overview", "Visuals": [{"BarChartVisual": {}}, {"KPIVisual": {}}]}],
                "FilterGroups": [{"FilterGroupId": "f1"}]
            })),
            datasets: vec![json!({"DataSetId": "ds-1", "Name": "Scorecard", "ImportMode": "SPICE"})],
        }))
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
        Ok("## Summary\n\n- Layout is clear".to_string())
    }

    fn model_id(&self) -> &str {
        "fake-model"
    }
}

fn build(
    dir: &TempDir,
    catalog: Arc<FakeCatalog>,
    analyzer: Arc<FakeAnalyzer>,
    target: DashboardTarget,
) -> QuickSightPipeline<LocalStorage, RunOptions> {
    let output = dir.path().to_str().unwrap().to_string();
    QuickSightPipeline::new(
        LocalStorage::new(output.clone()),
        RunOptions::new(output),
        catalog,
        analyzer,
        target,
    )
    .with_timestamp(
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap(),
    )
}

#[tokio::test]
async fn test_dashboard_analysis_writes_reports() {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(FakeCatalog::default());
    let analyzer = Arc::new(FakeAnalyzer::default());

    let pipeline = build(&dir, catalog.clone(), analyzer.clone(), DashboardTarget::Id("d1".into()))
        .with_focus(Some("Which filters exist?".to_string()));
    let report = Orchestrator::new(pipeline).run().await;

    assert!(report.succeeded(), "{}", report);
    assert_eq!(report.status(Stage::Publish), Some(&StageStatus::Skipped));

    let prompt = analyzer.prompts.lock().unwrap()[0].clone();
    assert!(prompt.starts_with("Which filters exist?"));
    assert!(prompt.contains("\"dashboard_id\": \"d1\""));

    let base = dir.path().join("quicksight_analysis_care_scorecard_20250301_093000");
    let markdown = fs::read_to_string(base.with_extension("md")).unwrap();
    assert!(markdown.starts_with("# Care Scorecard - Dashboard Analysis - 2025-03-01"));
    assert!(markdown.contains("- **Visual Types:** Bar Chart (1), KPI (1)"));
    assert!(markdown.contains("- **Scorecard** (ds-1): SPICE"));
    assert!(markdown.contains("- **Complexity:** Low"));
    assert!(markdown.contains("- Layout is clear"));

    let raw = fs::read_to_string(base.with_extension("json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["dashboard_id"], "d1");
    assert_eq!(json["analysis_method"], "quicksight_api");
    assert_eq!(json["analysis_timestamp"], "2025-03-01T09:30:00");
    assert_eq!(json["custom_prompt"], "Which filters exist?");
    assert_eq!(json["dashboard_analysis"]["definition"]["filters_count"], 1);
    assert_eq!(json["ai_analysis"], "## Summary\n\n- Layout is clear");
}

#[tokio::test]
async fn test_search_uses_first_match() {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(FakeCatalog::default());
    let analyzer = Arc::new(FakeAnalyzer::default());

    let pipeline = build(&dir, catalog.clone(), analyzer, DashboardTarget::Search("CARE".into()));
    let report = Orchestrator::new(pipeline).run().await;

    assert!(report.succeeded(), "{}", report);
    assert_eq!(*catalog.requested.lock().unwrap(), vec!["d1".to_string()]);
}

#[tokio::test]
async fn test_missing_dashboard_stops_before_analysis() {
    let dir = TempDir::new().unwrap();
    let analyzer = Arc::new(FakeAnalyzer::default());

    for target in [
        DashboardTarget::Id("unknown".into()),
        DashboardTarget::Search("finance".into()),
    ] {
        let pipeline = build(&dir, Arc::new(FakeCatalog::default()), analyzer.clone(), target);
        let report = Orchestrator::new(pipeline).run().await;

        assert!(matches!(
            report.failure.as_ref().map(|f| &f.error),
            Some(BotError::ProcessingError { .. })
        ));
        assert_eq!(report.status(Stage::Document), Some(&StageStatus::NotAttempted));
    }
    assert!(analyzer.prompts.lock().unwrap().is_empty());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
