use super::html::{extract_page, SiteSelectors};
use crate::domain::ports::{Collector, ItemStore};
use crate::utils::error::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(concat!("price-harvest/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

pub(crate) async fn fetch(client: &Client, url: &Url) -> Result<String> {
    tracing::debug!("Making request to: {}", url);
    let response = client.get(url.clone()).send().await?;
    tracing::debug!("Response status: {}", response.status());
    Ok(response.error_for_status()?.text().await?)
}

/// 單頁靜態 HTTP 擷取
pub struct StaticPageCollector {
    name: String,
    url: Url,
    selectors: SiteSelectors,
    client: Client,
}

impl StaticPageCollector {
    pub fn new(name: &str, url: &str, selectors: SiteSelectors, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| HarvestError::InvalidConfigValueError {
            field: format!("collectors.{}.url", name),
            value: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            name: name.to_string(),
            url,
            selectors,
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl Collector for StaticPageCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, store: &dyn ItemStore) -> Result<usize> {
        let body = fetch(&self.client, &self.url).await?;
        let page = extract_page(&body, &self.url, &self.selectors, &self.name);

        let found = page.items.len();
        for item in page.items {
            store.append(item)?;
        }

        tracing::info!("📥 {} items from {}", found, self.url);
        Ok(found)
    }
}
