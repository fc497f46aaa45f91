use crate::core::prompts::{data_analysis_prompt, default_data_focus, DATA_ANALYSIS_MAX_TOKENS};
use crate::core::summary::DataSummary;
use crate::core::template::{fields, Template};
use crate::core::{
    Analysis, AnalysisRequest, AnalysisService, ConfigProvider, Document, PageDraft,
    PublishedPage, Publisher, Result, Storage, Warehouse, Workflow,
};
use crate::utils::error::BotError;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;

pub const SCORECARD_QUERY: &str = "SELECT
  TO_CHAR(metric_report_mst_month, 'MM-YYYY') AS metric_report_mst_month,
  entry_type,
  business_unit,
  metric_name,
  region_name,
  CASE
    WHEN higher_is_better = 1 THEN 'true'
    WHEN higher_is_better = 0 THEN 'false'
    ELSE NULL
  END AS higher_is_better,
  SUM(metric_value) AS metric_value
FROM ba_corporate.scorecard_test_dn
WHERE metric_report_mst_month >= '2025-01-01'
AND business_unit = 'CARE & SERVICES'
GROUP BY
  metric_report_mst_month,
  entry_type,
  business_unit,
  metric_name,
  region_name,
  higher_is_better
ORDER BY
  metric_report_mst_month,
  business_unit;";

/// JSON report written next to the markdown one.
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub timestamp: String,
    pub data_summary: &'a DataSummary,
    pub analysis: &'a str,
    pub custom_prompt: Option<&'a str>,
}

/// Warehouse query → AI insights → report files → optional Confluence page.
pub struct DataAnalysisPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    warehouse: Arc<dyn Warehouse>,
    analyzer: Arc<dyn AnalysisService>,
    publisher: Option<Arc<dyn Publisher>>,
    sql: String,
    focus: Option<String>,
    now: NaiveDateTime,
}

impl<S: Storage, C: ConfigProvider> DataAnalysisPipeline<S, C> {
    pub fn new(
        storage: S,
        config: C,
        warehouse: Arc<dyn Warehouse>,
        analyzer: Arc<dyn AnalysisService>,
    ) -> Self {
        Self {
            storage,
            config,
            warehouse,
            analyzer,
            publisher: None,
            sql: SCORECARD_QUERY.to_string(),
            focus: None,
            now: chrono::Local::now().naive_local(),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    /// Blank focus text falls back to the default questions.
    pub fn with_focus(mut self, focus: Option<String>) -> Self {
        self.focus = focus.filter(|f| !f.trim().is_empty());
        self
    }

    pub fn with_timestamp(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    fn stamp(&self) -> String {
        self.now.format("%Y%m%d_%H%M%S").to_string()
    }
}

#[async_trait]
impl<S: Storage, C: ConfigProvider> Workflow for DataAnalysisPipeline<S, C> {
    async fn analyze(&self) -> Result<Analysis> {
        tracing::info!("🗄️ Querying warehouse");
        let result = self.warehouse.run_query(&self.sql).await?;
        if result.is_empty() {
            return Err(BotError::ProcessingError {
                message: "Query returned no rows to analyze".to_string(),
            });
        }

        let summary = DataSummary::from_result(&result);
        tracing::info!(
            "📊 {} records, {} business unit(s), {} metric(s)",
            summary.total_records,
            summary.business_units.len(),
            summary.metrics.len()
        );

        let prompt = data_analysis_prompt(&summary, self.focus.as_deref());
        let text = self
            .analyzer
            .invoke(&AnalysisRequest::text(prompt, DATA_ANALYSIS_MAX_TOKENS))
            .await?;

        Ok(Analysis {
            text,
            structured: Some(serde_json::to_value(&summary)?),
            sources: Vec::new(),
        })
    }

    async fn document(&self, analysis: &Analysis) -> Result<Document> {
        let value = analysis.structured.clone().ok_or_else(|| BotError::ProcessingError {
            message: "Analysis is missing the data summary".to_string(),
        })?;
        let summary: DataSummary = serde_json::from_value(value)?;

        let title = self.config.page_title().map(str::to_string).unwrap_or_else(|| {
            format!("Scorecard Data Analysis - {}", self.now.format("%Y-%m-%d"))
        });

        let content = Template::data_report().render(&fields([
            ("title", title.clone()),
            ("analysis_date", self.now.format("%Y-%m-%d %H:%M:%S").to_string()),
            ("model", self.analyzer.model_id().to_string()),
            ("total_records", summary.total_records.to_string()),
            ("columns", summary.columns.join(", ")),
            (
                "date_range",
                format!("{} to {}", summary.date_range.start, summary.date_range.end),
            ),
            ("business_units", summary.business_units.join(", ")),
            ("metrics", summary.metrics_preview(10)),
            ("entry_types", summary.entry_types.join(", ")),
            (
                "focus",
                self.focus.clone().unwrap_or_else(|| default_data_focus().to_string()),
            ),
            ("analysis", analysis.text.trim().to_string()),
        ]))?;

        let report = AnalysisReport {
            timestamp: self.now.format("%Y-%m-%dT%H:%M:%S").to_string(),
            data_summary: &summary,
            analysis: &analysis.text,
            custom_prompt: self.focus.as_deref(),
        };
        let json_name = format!("redshift_analysis_{}.json", self.stamp());
        self.storage
            .write_file(&json_name, serde_json::to_string_pretty(&report)?.as_bytes())
            .await?;
        tracing::info!("💾 Report saved to: {}", self.storage.location(&json_name));

        let md_name = format!("redshift_analysis_{}.md", self.stamp());
        self.storage.write_file(&md_name, content.as_bytes()).await?;

        Ok(Document {
            title,
            content,
            page_content: None,
            artifact_path: Some(self.storage.location(&md_name)),
            attachments: Vec::new(),
        })
    }

    async fn publish(&self, document: &Document) -> Result<Option<PublishedPage>> {
        if !self.config.publish_enabled() {
            return Ok(None);
        }
        let publisher = self.publisher.as_ref().ok_or_else(|| BotError::ConfigValidationError {
            field: "publish".to_string(),
            message: "Publishing requested but no Confluence client is configured".to_string(),
        })?;
        publisher.publish(&PageDraft::from(document)).await.map(Some)
    }
}
