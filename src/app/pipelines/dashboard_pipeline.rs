use crate::core::images::load_images;
use crate::core::prompts::{
    documentation_prompt, extraction_prompt, unified_prompt, DOCUMENTATION_MAX_TOKENS,
    EXTRACTION_MAX_TOKENS, UNIFIED_MAX_TOKENS,
};
use crate::core::storage_format::extract_title;
use crate::core::template::{fields, Template};
use crate::core::{
    Analysis, AnalysisRequest, AnalysisService, ConfigProvider, Document, PageDraft,
    PublishedPage, Publisher, Result, Storage, Workflow,
};
use crate::utils::error::BotError;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How screenshots are turned into documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// 先抽取結構化 JSON，再交給第二個提示寫文件
    #[default]
    Agents,
    /// One prompt straight to the finished guide
    Unified,
}

/// Pulls the JSON object out of a model reply that may be wrapped in prose or code fences.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string())
}

/// Screenshots → guide → optional Confluence page.
pub struct DashboardPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    analyzer: Arc<dyn AnalysisService>,
    publisher: Option<Arc<dyn Publisher>>,
    images: Vec<String>,
    mode: AnalysisMode,
    now: NaiveDateTime,
}

impl<S: Storage, C: ConfigProvider> DashboardPipeline<S, C> {
    pub fn new(
        storage: S,
        config: C,
        analyzer: Arc<dyn AnalysisService>,
        images: Vec<String>,
        mode: AnalysisMode,
    ) -> Self {
        Self {
            storage,
            config,
            analyzer,
            publisher: None,
            images,
            mode,
            now: chrono::Local::now().naive_local(),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_timestamp(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    pub fn output_file_name(&self, first_image: &Path) -> String {
        let stem = first_image
            .file_stem()
            .map(|s| s.to_string_lossy().replace(' ', "_"))
            .unwrap_or_else(|| "dashboard".to_string());
        format!(
            "dashboard_howto_{}_{}.md",
            stem,
            self.now.format("%Y%m%d_%H%M%S")
        )
    }

    fn title_for(&self, documentation: &str) -> String {
        if let Some(title) = self.config.page_title() {
            return title.to_string();
        }
        extract_title(documentation).unwrap_or_else(|| {
            format!("Dashboard User Guide - {}", self.now.format("%Y-%m-%d"))
        })
    }

    async fn write_documentation(&self, analysis: &Analysis) -> Result<String> {
        match self.mode {
            AnalysisMode::Unified => Ok(analysis.text.trim().to_string()),
            AnalysisMode::Agents => {
                let data = match &analysis.structured {
                    Some(value) => serde_json::to_string_pretty(value)?,
                    None => analysis.text.clone(),
                };
                tracing::info!("📚 Writing documentation from extracted analysis");
                let request = AnalysisRequest::text(documentation_prompt(&data), DOCUMENTATION_MAX_TOKENS);
                let html = self.analyzer.invoke(&request).await?;
                Ok(html.trim().to_string())
            }
        }
    }

    /// Copies each screenshot to `images/` next to the guide; returns the markdown embeds.
    async fn copy_screenshots(&self, sources: &[PathBuf]) -> Result<String> {
        let mut embeds = Vec::new();
        for (i, source) in sources.iter().enumerate() {
            let name = file_name(source);
            let bytes = tokio::fs::read(source).await?;
            self.storage
                .write_file(&format!("images/{}", name), &bytes)
                .await?;
            embeds.push(format!("### View {}: {}\n\n![{}](images/{})", i + 1, name, name, name.replace(' ', "%20")));
        }
        Ok(embeds.join("\n\n"))
    }
}

#[async_trait]
impl<S: Storage, C: ConfigProvider> Workflow for DashboardPipeline<S, C> {
    async fn analyze(&self) -> Result<Analysis> {
        let images = load_images(&self.images)?;
        let sources: Vec<PathBuf> = images.iter().map(|i| i.path.clone()).collect();

        let request = match self.mode {
            AnalysisMode::Agents => {
                tracing::info!("🔍 Extracting dashboard intelligence from {} image(s)", images.len());
                AnalysisRequest::text(extraction_prompt(), EXTRACTION_MAX_TOKENS)
            }
            AnalysisMode::Unified => {
                tracing::info!("🔍 Generating unified guide from {} image(s)", images.len());
                AnalysisRequest::text(unified_prompt(images.len()), UNIFIED_MAX_TOKENS)
            }
        }
        .with_images(images);

        let text = self.analyzer.invoke(&request).await?;
        let structured = match self.mode {
            AnalysisMode::Agents => {
                let parsed = extract_json(&text);
                if parsed.is_none() {
                    tracing::warn!("⚠️ Extraction reply was not valid JSON, passing raw text on");
                }
                parsed
            }
            AnalysisMode::Unified => None,
        };

        Ok(Analysis {
            text,
            structured,
            sources,
        })
    }

    async fn document(&self, analysis: &Analysis) -> Result<Document> {
        let first = analysis.sources.first().ok_or_else(|| BotError::ProcessingError {
            message: "Analysis has no source images".to_string(),
        })?;

        let documentation = self.write_documentation(analysis).await?;
        let screenshots = self.copy_screenshots(&analysis.sources).await?;
        let title = self.title_for(&documentation);

        let analysis_date = self.now.format("%B %d, %Y at %I:%M %p").to_string();
        let model = self.analyzer.model_id().to_string();

        // local image links do not resolve on the wiki; the publisher embeds attachments instead
        let page_content = format!(
            "{}\n<p><strong>Screenshot Analysis Date:</strong> {}</p>\n<p><em>Generated using {} analysis</em></p>",
            documentation, analysis_date, model,
        );

        let content = Template::dashboard_guide().render(&fields([
            ("title", title.clone()),
            ("documentation", documentation),
            ("screenshots", screenshots),
            ("analysis_date", analysis_date),
            ("model", model),
        ]))?;

        let file_name = self.output_file_name(first);
        self.storage.write_file(&file_name, content.as_bytes()).await?;

        Ok(Document {
            title,
            content,
            page_content: Some(page_content),
            artifact_path: Some(self.storage.location(&file_name)),
            attachments: analysis.sources.clone(),
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
