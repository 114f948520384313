use crate::domain::model::{CollectorOutcome, Item, NewItem};
use crate::domain::ports::{Collector, ItemStore};
use crate::utils::error::{ErrorCategory, Result};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::Instrument;

/// 統一包裝各種 collector，把失敗轉為結構化的 outcome
pub struct CollectorAdapter {
    collector: Box<dyn Collector>,
    span: tracing::Span,
}

impl CollectorAdapter {
    pub fn new(collector: Box<dyn Collector>) -> Self {
        let span = tracing::info_span!("collector", name = %collector.name());
        Self { collector, span }
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn name(&self) -> &str {
        self.collector.name()
    }

    /// 執行一次 collector；不會回傳錯誤，panic 也會轉成失敗結果
    pub async fn invoke(&self, store: &dyn ItemStore) -> CollectorOutcome {
        let started = Instant::now();
        let name = self.collector.name();
        let counting = CountingStore::new(store);

        let result = AssertUnwindSafe(
            self.collector
                .run(&counting)
                .instrument(self.span.clone()),
        )
        .catch_unwind()
        .await;
        let duration = started.elapsed();
        let appended = counting.appended();

        self.span.in_scope(|| match result {
            Ok(Ok(items_written)) => {
                tracing::info!(
                    "✅ Collector finished: {} (items: {}, duration: {:?})",
                    name,
                    items_written,
                    duration
                );
                CollectorOutcome::success(name, items_written, duration)
            }
            Ok(Err(e)) => {
                tracing::error!(
                    "❌ Collector failed: {} (Category: {:?}): {}",
                    name,
                    e.category(),
                    e
                );
                tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                CollectorOutcome::failure(name, e.category(), e.to_string(), duration)
                    .with_items_written(appended)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!("💥 Collector panicked: {}: {}", name, message);
                CollectorOutcome::failure(
                    name,
                    ErrorCategory::Internal,
                    format!("collector panicked: {}", message),
                    duration,
                )
                .with_items_written(appended)
            }
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// 記錄單次執行中成功 append 的筆數，失敗時用來回報已寫入的部分
struct CountingStore<'a> {
    inner: &'a dyn ItemStore,
    appended: AtomicUsize,
}

impl<'a> CountingStore<'a> {
    fn new(inner: &'a dyn ItemStore) -> Self {
        Self {
            inner,
            appended: AtomicUsize::new(0),
        }
    }

    fn appended(&self) -> usize {
        self.appended.load(Ordering::Relaxed)
    }
}

impl ItemStore for CountingStore<'_> {
    fn ensure_schema(&self) -> Result<()> {
        self.inner.ensure_schema()
    }

    fn append(&self, item: NewItem) -> Result<Item> {
        let stored = self.inner.append(item)?;
        self.appended.fetch_add(1, Ordering::Relaxed);
        Ok(stored)
    }

    fn all(&self) -> Result<Vec<Item>> {
        self.inner.all()
    }

    fn count(&self) -> Result<usize> {
        self.inner.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SqliteItemStore;
    use crate::utils::error::HarvestError;
    use async_trait::async_trait;

    struct FixedCollector {
        titles: Vec<&'static str>,
    }

    #[async_trait]
    impl Collector for FixedCollector {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn run(&self, store: &dyn ItemStore) -> Result<usize> {
            for title in &self.titles {
                store.append(NewItem::new(*title, "$1.00", "fixed"))?;
            }
            Ok(self.titles.len())
        }
    }

    struct TimingOutCollector;

    #[async_trait]
    impl Collector for TimingOutCollector {
        fn name(&self) -> &str {
            "browser"
        }

        async fn run(&self, _store: &dyn ItemStore) -> Result<usize> {
            Err(HarvestError::Timeout {
                collector: "browser".to_string(),
                seconds: 10,
            })
        }
    }

    /// 寫入部分資料後才失敗
    struct HalfwayCollector;

    #[async_trait]
    impl Collector for HalfwayCollector {
        fn name(&self) -> &str {
            "crawler"
        }

        async fn run(&self, store: &dyn ItemStore) -> Result<usize> {
            store.append(NewItem::unpriced("Page one quote", "crawler"))?;
            store.append(NewItem::unpriced("Another quote", "crawler"))?;
            Err(HarvestError::Collector {
                collector: "crawler".to_string(),
                message: "page 2 returned garbage".to_string(),
            })
        }
    }

    struct PanickingCollector;

    #[async_trait]
    impl Collector for PanickingCollector {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn run(&self, store: &dyn ItemStore) -> Result<usize> {
            store.append(NewItem::unpriced("Before crash", "panicky"))?;
            let pages: Vec<usize> = Vec::new();
            Ok(pages[3])
        }
    }

    fn store() -> SqliteItemStore {
        let store = SqliteItemStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store
    }

    #[tokio::test]
    async fn test_invoke_reports_success() {
        let store = store();
        let adapter = CollectorAdapter::new(Box::new(FixedCollector {
            titles: vec!["A", "B"],
        }));

        let outcome = adapter.invoke(&store).await;

        assert!(outcome.succeeded);
        assert_eq!(outcome.error, None);
        assert_eq!(outcome.items_written, 2);
        assert_eq!(store.all().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invoke_absorbs_failure() {
        let store = store();
        let adapter = CollectorAdapter::new(Box::new(TimingOutCollector));

        let outcome = adapter.invoke(&store).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.collector, "browser");
        assert_eq!(outcome.error, Some(ErrorCategory::Timeout));
        assert!(outcome.message.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_storage_failure_fails_only_this_collector() {
        // 尚未建立資料表，append 會失敗
        let store = SqliteItemStore::open_in_memory().unwrap();
        let adapter = CollectorAdapter::new(Box::new(FixedCollector { titles: vec!["A"] }));

        let outcome = adapter.invoke(&store).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.error, Some(ErrorCategory::Storage));
    }

    #[tokio::test]
    async fn test_failure_counts_items_written_before_error() {
        let store = store();
        let adapter = CollectorAdapter::new(Box::new(HalfwayCollector));

        let outcome = adapter.invoke(&store).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.items_written, 2);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invoke_turns_panic_into_internal_failure() {
        let store = store();
        let adapter = CollectorAdapter::new(Box::new(PanickingCollector));

        let outcome = adapter.invoke(&store).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.error, Some(ErrorCategory::Internal));
        assert!(outcome.message.unwrap().contains("panicked"));
        assert_eq!(outcome.items_written, 1);
    }
}
