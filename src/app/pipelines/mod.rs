pub mod dashboard_pipeline;
pub mod data_pipeline;
pub mod quicksight_pipeline;

pub use dashboard_pipeline::{AnalysisMode, DashboardPipeline};
pub use data_pipeline::{DataAnalysisPipeline, SCORECARD_QUERY};
pub use quicksight_pipeline::{DashboardTarget, QuickSightPipeline};
