use crate::domain::model::{
    Analysis, AnalysisRequest, DashboardDetails, DashboardSummary, Document, PageDraft,
    PublishedPage, QueryResult,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Where `path` ends up, for reporting.
    fn location(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn page_title(&self) -> Option<&str>;
    fn publish_enabled(&self) -> bool;
}

/// 圖片/文字分析服務
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn invoke(&self, request: &AnalysisRequest) -> Result<String>;
    fn model_id(&self) -> &str;
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn run_query(&self, sql: &str) -> Result<QueryResult>;
}

/// Source of BI dashboard metadata.
#[async_trait]
pub trait DashboardCatalog: Send + Sync {
    /// Dashboards whose name contains `keyword`, ignoring case.
    async fn search_dashboards(&self, keyword: &str) -> Result<Vec<DashboardSummary>>;
    /// `Ok(None)` when the dashboard does not exist.
    async fn dashboard_details(&self, dashboard_id: &str) -> Result<Option<DashboardDetails>>;
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, page: &PageDraft) -> Result<PublishedPage>;
}

/// The three fixed stages a run goes through, in order.
#[async_trait]
pub trait Workflow: Send + Sync {
    async fn analyze(&self) -> Result<Analysis>;
    async fn document(&self, analysis: &Analysis) -> Result<Document>;
    /// `Ok(None)` when publishing was not requested.
    async fn publish(&self, document: &Document) -> Result<Option<PublishedPage>>;
}
