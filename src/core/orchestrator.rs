use crate::core::adapter::CollectorAdapter;
use crate::domain::model::{CollectorOutcome, PassReport};
use crate::domain::ports::{Collector, ItemStore};
use crate::utils::error::{ErrorCategory, Result};
use crate::utils::monitor::SystemMonitor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Concurrent,
}

/// 依宣告順序執行所有 collector，單一 collector 失敗不影響其他 collector
pub struct Orchestrator {
    store: Arc<dyn ItemStore>,
    adapters: Vec<Arc<CollectorAdapter>>,
    mode: ExecutionMode,
    monitor: Option<SystemMonitor>,
    span: tracing::Span,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self {
            store,
            adapters: Vec::new(),
            mode: ExecutionMode::Sequential,
            monitor: None,
            span: tracing::info_span!("orchestrator"),
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// 啟用或禁用系統監控
    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        let monitor = SystemMonitor::new(enabled);
        self.monitor = monitor.is_enabled().then_some(monitor);
        self
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// 註冊 collector；註冊順序即執行順序
    pub fn register(&mut self, collector: Box<dyn Collector>) {
        let span = tracing::info_span!(parent: &self.span, "collector", name = %collector.name());
        let adapter = CollectorAdapter::new(collector).with_span(span);
        self.adapters.push(Arc::new(adapter));
    }

    pub fn collector_names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }

    /// 執行一次完整 pass
    ///
    /// 只有 `ensure_schema` 失敗時回傳錯誤；collector 的失敗只會出現在結果中。
    pub async fn run_all(&self) -> Result<PassReport> {
        self.span.in_scope(|| tracing::info!("Creating database tables..."));
        self.store.ensure_schema()?;

        let outcomes = match self.mode {
            ExecutionMode::Sequential => self.run_sequential().await,
            ExecutionMode::Concurrent => self.run_concurrent().await,
        };
        let report = PassReport { outcomes };

        self.span.in_scope(|| {
            tracing::info!(
                "🏁 Orchestration pass finished: {} succeeded, {} failed, {} items written",
                report.succeeded().count(),
                report.failed().count(),
                report.items_written()
            );
            match self.store.count() {
                Ok(total) => tracing::info!("📦 Item store now holds {} items", total),
                Err(e) => tracing::warn!("⚠️ Could not count stored items: {}", e),
            }
            for failed in report.failed() {
                tracing::warn!(
                    "⚠️ {} failed this pass ({:?}, {} items written before failing)",
                    failed.collector,
                    failed.error,
                    failed.items_written
                );
            }
        });

        Ok(report)
    }

    async fn run_sequential(&self) -> Vec<CollectorOutcome> {
        let mut outcomes = Vec::with_capacity(self.adapters.len());

        for adapter in &self.adapters {
            self.span
                .in_scope(|| tracing::info!("Running {} collector...", adapter.name()));
            self.log_stats(&format!("Before {}", adapter.name()));

            outcomes.push(adapter.invoke(self.store.as_ref()).await);

            self.log_stats(&format!("After {}", adapter.name()));
        }

        outcomes
    }

    async fn run_concurrent(&self) -> Vec<CollectorOutcome> {
        self.log_stats("Concurrent pass started");

        let mut tasks = JoinSet::new();
        for (index, adapter) in self.adapters.iter().enumerate() {
            let adapter = Arc::clone(adapter);
            let store = Arc::clone(&self.store);
            tasks.spawn(async move { (index, adapter.invoke(store.as_ref()).await) });
        }

        let mut slots: Vec<Option<CollectorOutcome>> = vec![None; self.adapters.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => {
                    self.span
                        .in_scope(|| tracing::error!("❌ Collector task aborted: {}", e));
                }
            }
        }

        self.log_stats("Concurrent pass completed");

        // 被中止的 task 沒有結果，補上失敗記錄
        slots
            .into_iter()
            .zip(&self.adapters)
            .map(|(slot, adapter)| {
                slot.unwrap_or_else(|| {
                    CollectorOutcome::failure(
                        adapter.name(),
                        ErrorCategory::Internal,
                        "collector task aborted".to_string(),
                        Duration::ZERO,
                    )
                })
            })
            .collect()
    }

    fn log_stats(&self, phase: &str) {
        if let Some(monitor) = &self.monitor {
            monitor.log_stats(phase);
        }
    }
}
