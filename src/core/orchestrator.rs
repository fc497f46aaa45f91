use crate::core::{PublishedPage, Stage, StageReport, StageStatus, Workflow};
use crate::utils::error::BotError;
use crate::utils::monitor::SystemMonitor;
use std::fmt;
use std::time::Instant;

#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: BotError,
}

/// 一次執行的結果：每個階段的狀態與最終產出
#[derive(Debug)]
pub struct RunReport {
    pub stages: Vec<StageReport>,
    pub artifact_path: Option<String>,
    pub page_url: Option<String>,
    pub failure: Option<StageFailure>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            stages: Vec::new(),
            artifact_path: None,
            page_url: None,
            failure: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none() && self.stages.iter().all(|s| s.status.is_success())
    }

    pub fn status(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| &s.status)
    }

    fn record(&mut self, stage: Stage, status: StageStatus) {
        self.stages.push(StageReport { stage, status });
    }

    fn fail(mut self, stage: Stage, error: BotError) -> Self {
        tracing::error!("❌ Stage {} failed: {}", stage, error);
        self.record(stage, StageStatus::Failed(error.to_string()));
        for later in Stage::ALL.iter().skip_while(|s| **s != stage).skip(1) {
            self.record(*later, StageStatus::NotAttempted);
        }
        self.failure = Some(StageFailure { stage, error });
        self
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.stages {
            let line = match &report.status {
                StageStatus::Completed => "✅ completed".to_string(),
                StageStatus::Skipped => "⏭️ skipped".to_string(),
                StageStatus::Failed(reason) => format!("❌ failed: {}", reason),
                StageStatus::NotAttempted => "⏸️ not attempted".to_string(),
            };
            writeln!(f, "{:<9} {}", report.stage, line)?;
        }
        if let Some(path) = &self.artifact_path {
            writeln!(f, "📁 Output saved to: {}", path)?;
        }
        if let Some(url) = &self.page_url {
            writeln!(f, "🔗 Page: {}", url)?;
        }
        Ok(())
    }
}

/// Runs analyze, document and publish in order, stopping at the first failure.
pub struct Orchestrator<W: Workflow> {
    workflow: W,
    monitor: Option<SystemMonitor>,
}

impl<W: Workflow> Orchestrator<W> {
    pub fn new(workflow: W) -> Self {
        Self {
            workflow,
            monitor: None,
        }
    }

    pub fn new_with_monitoring(workflow: W, monitor_enabled: bool) -> Self {
        let monitor = monitor_enabled.then(|| SystemMonitor::new(true));
        Self { workflow, monitor }
    }

    pub fn workflow(&self) -> &W {
        &self.workflow
    }

    fn log_stats(&self, phase: &str) {
        if let Some(monitor) = &self.monitor {
            monitor.log_stats(phase);
        }
    }

    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::new();
        let started = Instant::now();
        self.log_stats("Run started");

        tracing::info!("🔍 Stage 1/3: analyze");
        let analysis = match self.workflow.analyze().await {
            Ok(analysis) => analysis,
            Err(e) => return report.fail(Stage::Analyze, e),
        };
        report.record(Stage::Analyze, StageStatus::Completed);
        tracing::debug!("Analysis returned {} characters", analysis.text.len());
        self.log_stats("Analysis completed");

        tracing::info!("📝 Stage 2/3: document");
        let document = match self.workflow.document(&analysis).await {
            Ok(document) => document,
            Err(e) => return report.fail(Stage::Document, e),
        };
        report.record(Stage::Document, StageStatus::Completed);
        report.artifact_path = document.artifact_path.clone();
        if let Some(path) = &report.artifact_path {
            tracing::info!("💾 Document saved to: {}", path);
        }
        self.log_stats("Document written");

        tracing::info!("📤 Stage 3/3: publish");
        match self.workflow.publish(&document).await {
            Ok(Some(PublishedPage { url, .. })) => {
                tracing::info!("✅ Published: {}", url);
                report.page_url = Some(url);
                report.record(Stage::Publish, StageStatus::Completed);
            }
            Ok(None) => {
                tracing::info!("⏭️ Publishing not requested");
                report.record(Stage::Publish, StageStatus::Skipped);
            }
            Err(e) => return report.fail(Stage::Publish, e),
        }

        self.log_stats("Run completed");
        if let Some(monitor) = &self.monitor {
            monitor.log_final_stats();
        }
        tracing::info!("🏁 Run finished in {:?}", started.elapsed());
        report
    }
}
