use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 已編碼、可直接送進分析服務的圖片
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub path: PathBuf,
    pub media_type: String,
    /// base64 encoded file bytes
    pub data: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub images: Vec<ImageAttachment>,
    pub prompt: String,
    pub max_tokens: u32,
    /// None uses the client's configured temperature
    pub temperature: Option<f32>,
}

impl AnalysisRequest {
    pub fn text(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            images: Vec::new(),
            prompt: prompt.into(),
            max_tokens,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.images = images;
        self
    }
}

/// Output of the first stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub text: String,
    pub structured: Option<serde_json::Value>,
    pub sources: Vec<PathBuf>,
}

/// Output of the second stage: formatted content already written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub content: String,
    /// Page body when it differs from the local file (e.g. without local image links)
    #[serde(default)]
    pub page_content: Option<String>,
    pub artifact_path: Option<String>,
    pub attachments: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDraft {
    pub title: String,
    pub content: String,
    pub attachments: Vec<PathBuf>,
}

impl From<&Document> for PageDraft {
    fn from(document: &Document) -> Self {
        Self {
            title: document.title.clone(),
            content: document
                .page_content
                .clone()
                .unwrap_or_else(|| document.content.clone()),
            attachments: document.attachments.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPage {
    pub id: String,
    pub url: String,
    pub version: u64,
}

/// One row of a dashboard listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub dashboard_id: String,
    pub name: String,
    pub created_time: Option<String>,
    pub last_updated_time: Option<String>,
}

/// 儀表板的原始 API 文件：描述、定義與引用的資料集
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardDetails {
    pub dashboard: serde_json::Value,
    pub definition: Option<serde_json::Value>,
    pub datasets: Vec<serde_json::Value>,
}

/// 倉儲查詢結果，欄位順序與查詢一致
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Rows as JSON objects keyed by column name.
    pub fn records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analyze,
    Document,
    Publish,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Analyze, Stage::Document, Stage::Publish];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Analyze => "analyze",
            Stage::Document => "document",
            Stage::Publish => "publish",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Skipped,
    Failed(String),
    NotAttempted,
}

impl StageStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
}
