pub mod dashboard_metadata;
pub mod images;
pub mod orchestrator;
pub mod prompts;
pub mod storage_format;
pub mod summary;
pub mod template;

pub use crate::domain::model::{
    Analysis, AnalysisRequest, DashboardDetails, DashboardSummary, Document, ImageAttachment,
    PageDraft, PublishedPage, QueryResult, Stage, StageReport, StageStatus,
};
pub use crate::domain::ports::{
    AnalysisService, ConfigProvider, DashboardCatalog, Publisher, Storage, Warehouse, Workflow,
};
pub use crate::utils::error::Result;
pub use orchestrator::{Orchestrator, RunReport, StageFailure};
