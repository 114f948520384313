use crate::domain::model::{CleanedItem, Consolidated, Item, PriceValue, RankedItem, PRICE_UNAVAILABLE};
use crate::domain::ports::ItemStore;
use crate::utils::error::{HarvestError, Result};
use std::collections::HashSet;
use std::sync::Arc;

pub const TOP_N: usize = 10;

const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];

/// 將價格字串轉為數值；"N/A" 為 `Unpriced`，無法解析者保留原文
pub fn parse_price(raw: &str) -> PriceValue {
    let trimmed = raw.trim();
    if trimmed == PRICE_UNAVAILABLE {
        return PriceValue::Unpriced;
    }

    let without_symbol = trimmed
        .strip_prefix(CURRENCY_SYMBOLS)
        .unwrap_or(trimmed)
        .trim_start();
    let digits: String = without_symbol.chars().filter(|c| *c != ',').collect();

    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() => PriceValue::Parsed(value),
        _ => PriceValue::Unparsed(raw.to_string()),
    }
}

/// 去重、過濾空白標題、解析價格並選出最高價的前 N 筆
///
/// 重複標題以 store 順序中第一次出現者為準。
pub fn consolidate(items: Vec<Item>) -> Consolidated {
    let mut seen = HashSet::new();
    let mut cleaned = Vec::new();

    for item in items {
        if !seen.insert(item.title.clone()) {
            continue;
        }
        if item.title.trim().is_empty() {
            continue;
        }

        let price_value = parse_price(&item.price);
        if let PriceValue::Unparsed(original) = &price_value {
            tracing::warn!(
                "⚠️ Unparseable price {:?} for item {} ({}), excluded from ranking",
                original,
                item.id,
                item.title
            );
        }

        cleaned.push(CleanedItem { item, price_value });
    }

    let mut priced: Vec<RankedItem> = cleaned
        .iter()
        .filter_map(|row| {
            row.price_value.as_f64().map(|value| RankedItem {
                id: row.item.id,
                title: row.item.title.clone(),
                price: row.item.price.clone(),
                value,
            })
        })
        .collect();

    // sort_by 為穩定排序，同價者維持原順序
    priced.sort_by(|a, b| b.value.total_cmp(&a.value));
    priced.truncate(TOP_N);

    Consolidated {
        cleaned,
        top_ranked: priced,
    }
}

/// 從 Item Store 讀取完整快照並整理
pub struct Consolidator {
    store: Arc<dyn ItemStore>,
    span: tracing::Span,
}

impl Consolidator {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self {
            store,
            span: tracing::info_span!("consolidator"),
        }
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn run(&self) -> Result<Consolidated> {
        let _entered = self.span.enter();

        let items = self.store.all().map_err(|e| HarvestError::Consolidation {
            message: e.to_string(),
        })?;
        tracing::debug!("📥 Loaded {} stored items", items.len());

        let consolidated = consolidate(items);
        tracing::info!(
            "🔄 Cleaned {} unique items ({} ranked, {} unparseable prices)",
            consolidated.row_count(),
            consolidated.top_ranked.len(),
            consolidated.unparsed_count()
        );

        Ok(consolidated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn items(rows: &[(&str, &str)]) -> Vec<Item> {
        rows.iter()
            .enumerate()
            .map(|(i, (title, price))| Item {
                id: i as i64 + 1,
                title: title.to_string(),
                price: price.to_string(),
                source: "test".to_string(),
                scraped_at: Utc::now(),
            })
            .collect()
    }

    fn titles_and_prices(result: &Consolidated) -> Vec<(&str, &str)> {
        result
            .cleaned
            .iter()
            .map(|row| (row.item.title.as_str(), row.item.price.as_str()))
            .collect()
    }

    #[test]
    fn test_parse_price_variants() {
        assert_eq!(parse_price("$123.45"), PriceValue::Parsed(123.45));
        assert_eq!(parse_price("1,299.00"), PriceValue::Parsed(1299.0));
        assert_eq!(parse_price(" $ 2,000 "), PriceValue::Parsed(2000.0));
        assert_eq!(parse_price("€15"), PriceValue::Parsed(15.0));
        assert_eq!(parse_price("N/A"), PriceValue::Unpriced);
        assert_eq!(
            parse_price("not-a-price"),
            PriceValue::Unparsed("not-a-price".to_string())
        );
        assert_eq!(parse_price("$"), PriceValue::Unparsed("$".to_string()));
        assert_eq!(parse_price("inf"), PriceValue::Unparsed("inf".to_string()));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let result = consolidate(items(&[("A", "$1"), ("B", "$2"), ("A", "$3")]));
        assert_eq!(titles_and_prices(&result), vec![("A", "$1"), ("B", "$2")]);
        assert_eq!(result.cleaned[0].item.id, 1);
    }

    #[test]
    fn test_blank_titles_are_excluded() {
        let result = consolidate(items(&[
            ("   ", "$500"),
            ("", "$600"),
            ("Chair", "N/A"),
            ("\t", "N/A"),
        ]));
        assert_eq!(titles_and_prices(&result), vec![("Chair", "N/A")]);
        assert!(result.top_ranked.is_empty());
    }

    #[test]
    fn test_top_n_is_bounded_and_descending() {
        let rows: Vec<(String, String)> = (1..=15)
            .map(|n| (format!("Item {}", n), format!("${}.00", n * 7 % 16)))
            .collect();
        let refs: Vec<(&str, &str)> = rows.iter().map(|(t, p)| (t.as_str(), p.as_str())).collect();

        let result = consolidate(items(&refs));

        assert_eq!(result.cleaned.len(), 15);
        assert_eq!(result.top_ranked.len(), TOP_N);
        assert!(result
            .top_ranked
            .windows(2)
            .all(|w| w[0].value > w[1].value));
        assert_eq!(result.top_ranked[0].value, 15.0);
    }

    #[test]
    fn test_ties_keep_store_order() {
        let result = consolidate(items(&[("A", "$5"), ("B", "$9"), ("C", "$5"), ("D", "$5")]));
        let ranked: Vec<&str> = result.top_ranked.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(ranked, vec!["B", "A", "C", "D"]);
    }

    #[test]
    fn test_unparseable_price_is_kept_but_not_ranked() {
        let result = consolidate(items(&[
            ("Widget", "not-a-price"),
            ("Gadget", "$20.00"),
            ("Gizmo", "$1,050.50"),
        ]));

        assert_eq!(result.cleaned.len(), 3);
        assert_eq!(result.cleaned[0].item.price, "not-a-price");
        assert_eq!(result.unparsed_count(), 1);

        let ranked: Vec<(&str, f64)> = result
            .top_ranked
            .iter()
            .map(|r| (r.title.as_str(), r.value))
            .collect();
        assert_eq!(ranked, vec![("Gizmo", 1050.5), ("Gadget", 20.0)]);
    }

    #[test]
    fn test_unpriced_items_stay_in_cleaned_table() {
        let result = consolidate(items(&[("Quote", "N/A"), ("Book", "$3")]));
        assert_eq!(result.cleaned.len(), 2);
        assert_eq!(result.cleaned[0].price_value, PriceValue::Unpriced);
        assert_eq!(result.top_ranked.len(), 1);
    }
}
