use crate::core::dashboard_metadata::DashboardAnalysis;
use crate::core::prompts::{
    dashboard_metadata_prompt, default_dashboard_focus, DASHBOARD_METADATA_MAX_TOKENS,
};
use crate::core::template::{fields, Template};
use crate::core::{
    Analysis, AnalysisRequest, AnalysisService, ConfigProvider, DashboardCatalog, Document,
    PageDraft, PublishedPage, Publisher, Result, Storage, Workflow,
};
use crate::utils::error::BotError;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;

/// Which dashboard to analyze.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardTarget {
    Id(String),
    /// 名稱關鍵字，取第一個符合的
    Search(String),
}

#[derive(Debug, Serialize)]
struct QuickSightReport<'a> {
    dashboard_id: &'a str,
    analysis_timestamp: String,
    analysis_method: &'static str,
    dashboard_analysis: &'a DashboardAnalysis,
    ai_analysis: &'a str,
    custom_prompt: Option<&'a str>,
}

/// File-name safe version of a dashboard name.
fn safe_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "dashboard".to_string()
    } else {
        trimmed.to_string()
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join("; ")
    }
}

/// Dashboard metadata → AI insights → report files → optional Confluence page.
pub struct QuickSightPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    catalog: Arc<dyn DashboardCatalog>,
    analyzer: Arc<dyn AnalysisService>,
    publisher: Option<Arc<dyn Publisher>>,
    target: DashboardTarget,
    focus: Option<String>,
    now: NaiveDateTime,
}

impl<S: Storage, C: ConfigProvider> QuickSightPipeline<S, C> {
    pub fn new(
        storage: S,
        config: C,
        catalog: Arc<dyn DashboardCatalog>,
        analyzer: Arc<dyn AnalysisService>,
        target: DashboardTarget,
    ) -> Self {
        Self {
            storage,
            config,
            catalog,
            analyzer,
            publisher: None,
            target,
            focus: None,
            now: chrono::Local::now().naive_local(),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
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

    async fn resolve_target(&self) -> Result<String> {
        match &self.target {
            DashboardTarget::Id(id) => Ok(id.clone()),
            DashboardTarget::Search(keyword) => {
                let found = self.catalog.search_dashboards(keyword).await?;
                let first = found.first().ok_or_else(|| BotError::ProcessingError {
                    message: format!("No dashboards found matching '{}'", keyword),
                })?;
                if found.len() > 1 {
                    tracing::info!(
                        "{} dashboards match '{}', using {} ({})",
                        found.len(),
                        keyword,
                        first.name,
                        first.dashboard_id
                    );
                }
                Ok(first.dashboard_id.clone())
            }
        }
    }
}

#[async_trait]
impl<S: Storage, C: ConfigProvider> Workflow for QuickSightPipeline<S, C> {
    async fn analyze(&self) -> Result<Analysis> {
        let dashboard_id = self.resolve_target().await?;
        tracing::info!("🔍 Reading dashboard {}", dashboard_id);

        let details = self
            .catalog
            .dashboard_details(&dashboard_id)
            .await?
            .ok_or_else(|| BotError::ProcessingError {
                message: format!("Dashboard {} not found", dashboard_id),
            })?;
        if details.definition.is_none() {
            tracing::warn!("No definition available, analyzing basic metadata only");
        }

        let analysis = DashboardAnalysis::from_details(&dashboard_id, &details);
        tracing::info!(
            "📊 {} sheet(s), {} dataset(s), complexity {}",
            analysis.metadata.sheets_count,
            analysis.datasets.total_datasets,
            analysis.insights.complexity_label()
        );

        let prompt = dashboard_metadata_prompt(&analysis, self.focus.as_deref());
        let text = self
            .analyzer
            .invoke(&AnalysisRequest::text(prompt, DASHBOARD_METADATA_MAX_TOKENS))
            .await?;

        Ok(Analysis {
            text,
            structured: Some(serde_json::to_value(&analysis)?),
            sources: Vec::new(),
        })
    }

    async fn document(&self, analysis: &Analysis) -> Result<Document> {
        let value = analysis.structured.clone().ok_or_else(|| BotError::ProcessingError {
            message: "Analysis is missing the dashboard metadata".to_string(),
        })?;
        let dashboard: DashboardAnalysis = serde_json::from_value(value)?;
        let metadata = &dashboard.metadata;
        let definition = dashboard.definition.clone().unwrap_or_default();

        let title = self.config.page_title().map(str::to_string).unwrap_or_else(|| {
            format!("{} - Dashboard Analysis - {}", metadata.name, self.now.format("%Y-%m-%d"))
        });
        let unknown = || "Unknown".to_string();

        let visual_types = if definition.visual_types.is_empty() {
            "None".to_string()
        } else {
            definition
                .visual_types
                .iter()
                .map(|(kind, count)| format!("{} ({})", kind, count))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let datasets = if metadata.datasets.is_empty() {
            "No dataset details available.".to_string()
        } else {
            metadata
                .datasets
                .iter()
                .map(|d| format!("- **{}** ({}): {}", d.name, d.id, d.import_mode))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let content = Template::quicksight_report().render(&fields([
            ("title", title.clone()),
            ("dashboard_id", metadata.dashboard_id.clone()),
            ("analysis_date", self.now.format("%Y-%m-%d %H:%M:%S").to_string()),
            ("model", self.analyzer.model_id().to_string()),
            ("version", metadata.version.to_string()),
            ("status", metadata.status.clone()),
            ("created_time", metadata.created_time.clone().unwrap_or_else(unknown)),
            ("last_updated_time", metadata.last_updated_time.clone().unwrap_or_else(unknown)),
            (
                "last_published_time",
                metadata.last_published_time.clone().unwrap_or_else(unknown),
            ),
            ("sheets_count", metadata.sheets_count.to_string()),
            ("visuals_count", definition.visuals_count.to_string()),
            ("visual_types", visual_types),
            ("filters_count", definition.filters_count.to_string()),
            ("datasets", datasets),
            ("complexity", dashboard.insights.complexity_label().to_string()),
            (
                "performance_considerations",
                list_or_none(&dashboard.insights.performance_considerations),
            ),
            ("potential_issues", list_or_none(&dashboard.insights.potential_issues)),
            ("best_practices", list_or_none(&dashboard.insights.best_practices)),
            (
                "focus",
                self.focus.clone().unwrap_or_else(|| default_dashboard_focus().to_string()),
            ),
            ("analysis", analysis.text.trim().to_string()),
        ]))?;

        let report = QuickSightReport {
            dashboard_id: &metadata.dashboard_id,
            analysis_timestamp: self.now.format("%Y-%m-%dT%H:%M:%S").to_string(),
            analysis_method: "quicksight_api",
            dashboard_analysis: &dashboard,
            ai_analysis: &analysis.text,
            custom_prompt: self.focus.as_deref(),
        };
        let base = format!("quicksight_analysis_{}_{}", safe_name(&metadata.name), self.stamp());

        let json_name = format!("{}.json", base);
        self.storage
            .write_file(&json_name, serde_json::to_string_pretty(&report)?.as_bytes())
            .await?;
        tracing::info!("💾 Report saved to: {}", self.storage.location(&json_name));

        let md_name = format!("{}.md", base);
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
