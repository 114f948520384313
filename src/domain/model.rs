use crate::utils::error::ErrorCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 缺價格時 collector 寫入的標記值
pub const PRICE_UNAVAILABLE: &str = "N/A";

/// 已寫入 Item Store 的記錄，建立後不再變更
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub price: String,
    pub source: String,
    pub scraped_at: DateTime<Utc>,
}

/// collector 產出、尚未分配 id 的記錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub price: String,
    pub source: String,
}

impl NewItem {
    pub fn new(title: impl Into<String>, price: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            price: price.into(),
            source: source.into(),
        }
    }

    pub fn unpriced(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(title, PRICE_UNAVAILABLE, source)
    }
}

/// 價格字串的解析結果
#[derive(Debug, Clone, PartialEq)]
pub enum PriceValue {
    Parsed(f64),
    Unparsed(String),
    Unpriced,
}

impl PriceValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PriceValue::Parsed(value) => Some(*value),
            _ => None,
        }
    }
}

/// 清理後表格中的一列，保留原始價格字串
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedItem {
    pub item: Item,
    pub price_value: PriceValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedItem {
    pub id: i64,
    pub title: String,
    pub price: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Consolidated {
    pub cleaned: Vec<CleanedItem>,
    pub top_ranked: Vec<RankedItem>,
}

impl Consolidated {
    pub fn row_count(&self) -> usize {
        self.cleaned.len()
    }

    /// 解析失敗的列數 (不含 N/A)
    pub fn unparsed_count(&self) -> usize {
        self.cleaned
            .iter()
            .filter(|row| matches!(row.price_value, PriceValue::Unparsed(_)))
            .count()
    }
}

/// 單一 collector 執行一次的結果
#[derive(Debug, Clone, Serialize)]
pub struct CollectorOutcome {
    pub collector: String,
    pub succeeded: bool,
    pub error: Option<ErrorCategory>,
    pub message: Option<String>,
    pub items_written: usize,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl CollectorOutcome {
    pub fn success(collector: &str, items_written: usize, duration: Duration) -> Self {
        Self {
            collector: collector.to_string(),
            succeeded: true,
            error: None,
            message: None,
            items_written,
            duration,
        }
    }

    pub fn failure(collector: &str, kind: ErrorCategory, message: String, duration: Duration) -> Self {
        Self {
            collector: collector.to_string(),
            succeeded: false,
            error: Some(kind),
            message: Some(message),
            items_written: 0,
            duration,
        }
    }

    /// 失敗前已寫入 store 的筆數仍計入
    pub fn with_items_written(mut self, items_written: usize) -> Self {
        self.items_written = items_written;
        self
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

/// 一次 orchestration pass 的所有結果，依宣告順序排列
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub outcomes: Vec<CollectorOutcome>,
}

impl PassReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &CollectorOutcome> {
        self.outcomes.iter().filter(|o| o.succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CollectorOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded)
    }

    pub fn items_written(&self) -> usize {
        self.outcomes.iter().map(|o| o.items_written).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub row_count: usize,
    pub ranked_count: usize,
    pub table_path: std::path::PathBuf,
    pub chart_path: Option<std::path::PathBuf>,
}
