use crate::domain::model::{NewItem, PRICE_UNAVAILABLE};
use crate::utils::error::{HarvestError, Result};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// 已編譯的 CSS selector 組
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    pub item: Selector,
    pub title: Selector,
    pub price: Option<Selector>,
    pub next: Option<Selector>,
}

impl SiteSelectors {
    pub fn parse(
        item: &str,
        title: &str,
        price: Option<&str>,
        next: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            item: compile(item)?,
            title: compile(title)?,
            price: price.map(compile).transpose()?,
            next: next.map(compile).transpose()?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| HarvestError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// 一頁的擷取結果
#[derive(Debug, Default)]
pub struct PageExtract {
    pub items: Vec<NewItem>,
    pub next_url: Option<Url>,
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 解析 HTML；`Html` 不是 Send，因此不可跨越 await
pub fn extract_page(body: &str, page_url: &Url, selectors: &SiteSelectors, source: &str) -> PageExtract {
    let document = Html::parse_document(body);
    let mut items = Vec::new();

    for container in document.select(&selectors.item) {
        let Some(title_el) = container.select(&selectors.title).next() else {
            tracing::debug!("Skipping container without a title element on {}", page_url);
            continue;
        };
        let title = element_text(title_el);

        let price = selectors
            .price
            .as_ref()
            .and_then(|sel| container.select(sel).next())
            .map(element_text)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| PRICE_UNAVAILABLE.to_string());

        items.push(NewItem::new(title, price, source));
    }

    let next_url = selectors
        .next
        .as_ref()
        .and_then(|sel| document.select(sel).next())
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| page_url.join(href).ok());

    PageExtract { items, next_url }
}
