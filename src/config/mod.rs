#[cfg(feature = "cli")]
pub mod cli;
pub mod run_options;
pub mod settings;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use run_options::RunOptions;
pub use settings::{
    AnalysisSettings, PublishSettings, QuickSightSettings, Settings, WarehouseSettings,
};
