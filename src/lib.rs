pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{
    BedrockClient, ConfluenceClient, LocalStorage, QuickSightClient, WarehouseClient,
};
pub use app::pipelines::{
    AnalysisMode, DashboardPipeline, DashboardTarget, DataAnalysisPipeline, QuickSightPipeline,
};
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{RunOptions, Settings};
pub use core::{Orchestrator, RunReport};
pub use utils::error::{BotError, Result};
