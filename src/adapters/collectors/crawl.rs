use super::html::{extract_page, SiteSelectors};
use super::http::{build_client, fetch};
use crate::domain::ports::{Collector, ItemStore};
use crate::utils::error::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

pub const DEFAULT_MAX_PAGES: usize = 5;

/// 跟隨「下一頁」連結的結構化爬蟲
pub struct CrawlCollector {
    name: String,
    start_url: Url,
    selectors: SiteSelectors,
    max_pages: usize,
    client: Client,
}

impl CrawlCollector {
    pub fn new(
        name: &str,
        start_url: &str,
        selectors: SiteSelectors,
        max_pages: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let start_url = Url::parse(start_url).map_err(|e| HarvestError::InvalidConfigValueError {
            field: format!("collectors.{}.start_url", name),
            value: start_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            name: name.to_string(),
            start_url,
            selectors,
            max_pages: max_pages.max(1),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl Collector for CrawlCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, store: &dyn ItemStore) -> Result<usize> {
        let mut visited = HashSet::new();
        let mut next = Some(self.start_url.clone());
        let mut written = 0;

        while let Some(url) = next.take() {
            if visited.len() >= self.max_pages {
                tracing::debug!("Reached max_pages ({}) for {}", self.max_pages, self.name);
                break;
            }
            if !visited.insert(url.clone()) {
                tracing::debug!("Already visited {}, stopping", url);
                break;
            }

            let body = fetch(&self.client, &url).await?;
            let page = extract_page(&body, &url, &self.selectors, &self.name);
            tracing::debug!("📄 Page {} yielded {} items", url, page.items.len());

            for item in page.items {
                store.append(item)?;
                written += 1;
            }
            next = page.next_url;
        }

        tracing::info!("📥 {} items across {} pages", written, visited.len());
        Ok(written)
    }
}
