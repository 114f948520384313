use crate::core::orchestrator::Orchestrator;
use crate::core::report::generate_report;
use crate::domain::model::{PassReport, ReportSummary};
use crate::domain::ports::ItemStore;
use crate::utils::error::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// 串接 scrape 與 report 兩個動作
pub struct HarvestEngine {
    store: Arc<dyn ItemStore>,
    orchestrator: Orchestrator,
    output_dir: PathBuf,
}

impl HarvestEngine {
    pub fn new(store: Arc<dyn ItemStore>, orchestrator: Orchestrator, output_dir: PathBuf) -> Self {
        Self {
            store,
            orchestrator,
            output_dir,
        }
    }

    pub async fn scrape(&self) -> Result<PassReport> {
        tracing::info!(
            "🚀 Running {} collectors: {}",
            self.orchestrator.collector_names().len(),
            self.orchestrator.collector_names().join(", ")
        );
        let pass = self.orchestrator.run_all().await?;
        if let Ok(json) = serde_json::to_string(&pass) {
            tracing::debug!("Pass outcomes: {}", json);
        }
        Ok(pass)
    }

    pub fn report(&self) -> Result<ReportSummary> {
        generate_report(Arc::clone(&self.store), &self.output_dir)
    }

    /// scrape 完成後才產生報表
    pub async fn run(&self, scrape: bool, report: bool) -> Result<(Option<PassReport>, Option<ReportSummary>)> {
        let pass = if scrape { Some(self.scrape().await?) } else { None };
        let summary = if report { Some(self.report()?) } else { None };
        Ok((pass, summary))
    }
}
