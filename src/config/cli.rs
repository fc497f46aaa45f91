use crate::app::pipelines::dashboard_pipeline::AnalysisMode;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "howto-bot")]
#[command(about = "Generate dashboard user guides from screenshots and publish them to Confluence")]
pub struct CliConfig {
    /// Dashboard screenshots; leave empty to pick from recent images
    pub images: Vec<String>,

    #[arg(long, value_enum, default_value_t = AnalysisMode::Agents)]
    pub mode: AnalysisMode,

    /// Page title; derived from the analysis when omitted
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, help = "Publish the generated guide to Confluence")]
    pub publish: bool,

    /// Output directory, overrides HOWTO_OUTPUT_DIR
    #[arg(long)]
    pub output_path: Option<String>,

    /// Optional TOML file layered over the environment
    #[arg(short, long)]
    pub config: Option<String>,

    /// Extra directories to scan for recent screenshots
    #[arg(long, value_delimiter = ',')]
    pub scan_dirs: Vec<String>,

    #[arg(long, help = "Validate inputs and show what would run")]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process resource usage per stage")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl CliConfig {
    /// 指令列參數優先於設定檔
    pub fn resolve_output_path(&mut self, settings_output_dir: &str) {
        if self.output_path.is_none() {
            self.output_path = Some(settings_output_dir.to_string());
        }
    }
}

impl ConfigProvider for CliConfig {
    fn output_path(&self) -> &str {
        self.output_path
            .as_deref()
            .unwrap_or(crate::config::settings::DEFAULT_OUTPUT_DIR)
    }

    fn page_title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn publish_enabled(&self) -> bool {
        self.publish
    }
}

impl Validate for CliConfig {
    /// Image arguments are checked one by one when loaded, so a bad one is skipped rather than fatal.
    fn validate(&self) -> Result<()> {
        validate_path("output_path", self.output_path())
    }
}
