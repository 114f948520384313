use crate::adapters::collectors::{
    crawl::DEFAULT_MAX_PAGES, CommandCollector, CrawlCollector, SiteSelectors, StaticPageCollector,
};
use crate::core::orchestrator::ExecutionMode;
use crate::domain::ports::Collector;
use crate::utils::error::{HarvestError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_COMMAND_TIMEOUT_SECONDS: u64 = 120;

/// collectors.toml：collector 宣告順序即執行順序
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorsConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub collectors: Vec<CollectorConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub mode: ExecutionMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub timeout_seconds: Option<u64>,
    #[serde(flatten)]
    pub kind: CollectorKind,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectorKind {
    Static {
        url: String,
        item_selector: String,
        title_selector: String,
        price_selector: Option<String>,
    },
    Crawl {
        start_url: String,
        item_selector: String,
        title_selector: String,
        price_selector: Option<String>,
        next_selector: Option<String>,
        max_pages: Option<usize>,
    },
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl CollectorConfig {
    fn timeout(&self) -> Duration {
        let default = match self.kind {
            CollectorKind::Command { .. } => DEFAULT_COMMAND_TIMEOUT_SECONDS,
            _ => DEFAULT_HTTP_TIMEOUT_SECONDS,
        };
        Duration::from_secs(self.timeout_seconds.unwrap_or(default))
    }

    pub fn build(&self) -> Result<Box<dyn Collector>> {
        let timeout = self.timeout();

        let collector: Box<dyn Collector> = match &self.kind {
            CollectorKind::Static {
                url,
                item_selector,
                title_selector,
                price_selector,
            } => {
                let selectors = SiteSelectors::parse(
                    item_selector,
                    title_selector,
                    price_selector.as_deref(),
                    None,
                )?;
                Box::new(StaticPageCollector::new(&self.name, url, selectors, timeout)?)
            }
            CollectorKind::Crawl {
                start_url,
                item_selector,
                title_selector,
                price_selector,
                next_selector,
                max_pages,
            } => {
                let selectors = SiteSelectors::parse(
                    item_selector,
                    title_selector,
                    price_selector.as_deref(),
                    next_selector.as_deref(),
                )?;
                Box::new(CrawlCollector::new(
                    &self.name,
                    start_url,
                    selectors,
                    max_pages.unwrap_or(DEFAULT_MAX_PAGES),
                    timeout,
                )?)
            }
            CollectorKind::Command { program, args } => {
                Box::new(CommandCollector::new(&self.name, program, args.clone(), timeout))
            }
        };

        Ok(collector)
    }
}

impl CollectorsConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| HarvestError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HarvestError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| HarvestError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn enabled_collectors(&self) -> impl Iterator<Item = &CollectorConfig> {
        self.collectors.iter().filter(|c| c.enabled)
    }

    /// 依宣告順序建立啟用中的 collector
    pub fn build_collectors(&self) -> Result<Vec<Box<dyn Collector>>> {
        self.enabled_collectors().map(CollectorConfig::build).collect()
    }
}

impl Validate for CollectorsConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_unique_names(
            "collectors.name",
            self.collectors.iter().map(|c| c.name.as_str()),
        )?;

        for collector in &self.collectors {
            validation::validate_non_empty_string("collectors.name", &collector.name)?;
            if let Some(timeout) = collector.timeout_seconds {
                validation::validate_positive_number(
                    &format!("collectors.{}.timeout_seconds", collector.name),
                    timeout,
                    1,
                )?;
            }

            match &collector.kind {
                CollectorKind::Static { url, .. } => {
                    validation::validate_url(&format!("collectors.{}.url", collector.name), url)?;
                }
                CollectorKind::Crawl {
                    start_url,
                    max_pages,
                    ..
                } => {
                    validation::validate_url(
                        &format!("collectors.{}.start_url", collector.name),
                        start_url,
                    )?;
                    if let Some(pages) = max_pages {
                        validation::validate_positive_number(
                            &format!("collectors.{}.max_pages", collector.name),
                            *pages as u64,
                            1,
                        )?;
                    }
                }
                CollectorKind::Command { program, .. } => {
                    validation::validate_non_empty_string(
                        &format!("collectors.{}.program", collector.name),
                        program,
                    )?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[run]
mode = "sequential"

[[collectors]]
name = "amazon"
kind = "static"
url = "https://www.amazon.com/s?k=laptop"
item_selector = "div.s-result-item"
title_selector = "h2 span"
price_selector = "span.a-offscreen"

[[collectors]]
name = "ebay"
kind = "command"
program = "node"
args = ["scrapers/ebay.js", "--headless"]
timeout_seconds = 90

[[collectors]]
name = "quotes"
kind = "crawl"
start_url = "https://quotes.toscrape.com/"
item_selector = "div.quote"
title_selector = "span.text"
next_selector = "li.next a"
max_pages = 3

[[collectors]]
name = "disabled"
enabled = false
kind = "command"
program = "true"
"#;

    #[test]
    fn test_parse_collectors_in_declared_order() {
        let config = CollectorsConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.run.mode, ExecutionMode::Sequential);
        let names: Vec<&str> = config.collectors.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["amazon", "ebay", "quotes", "disabled"]);
        assert!(config.validate().is_ok());

        match &config.collectors[1].kind {
            CollectorKind::Command { program, args } => {
                assert_eq!(program, "node");
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
        assert_eq!(config.collectors[1].timeout(), Duration::from_secs(90));
        assert_eq!(
            config.collectors[0].timeout(),
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECONDS)
        );
    }

    #[test]
    fn test_build_skips_disabled_collectors() {
        let config = CollectorsConfig::from_toml_str(SAMPLE).unwrap();
        let collectors = config.build_collectors().unwrap();

        let names: Vec<&str> = collectors.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["amazon", "ebay", "quotes"]);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PRICE_HARVEST_TEST_URL", "https://shop.example.com/deals");

        let toml_content = r#"
[[collectors]]
name = "deals"
kind = "static"
url = "${PRICE_HARVEST_TEST_URL}"
item_selector = "li"
title_selector = "a"
"#;

        let config = CollectorsConfig::from_toml_str(toml_content).unwrap();
        match &config.collectors[0].kind {
            CollectorKind::Static { url, .. } => assert_eq!(url, "https://shop.example.com/deals"),
            other => panic!("unexpected kind: {:?}", other),
        }

        std::env::remove_var("PRICE_HARVEST_TEST_URL");
    }

    #[test]
    fn test_validation_rejects_duplicates_and_bad_urls() {
        let duplicate = r#"
[[collectors]]
name = "a"
kind = "command"
program = "echo"

[[collectors]]
name = "a"
kind = "command"
program = "echo"
"#;
        let config = CollectorsConfig::from_toml_str(duplicate).unwrap();
        assert!(config.validate().is_err());

        let bad_url = r#"
[[collectors]]
name = "b"
kind = "crawl"
start_url = "not-a-url"
item_selector = "div"
title_selector = "span"
"#;
        let config = CollectorsConfig::from_toml_str(bad_url).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_selector_fails_build() {
        let toml_content = r#"
[[collectors]]
name = "broken"
kind = "static"
url = "https://example.com"
item_selector = "div[["
title_selector = "a"
"#;
        let config = CollectorsConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.build_collectors(),
            Err(HarvestError::Selector { .. })
        ));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let toml_content = r#"
[[collectors]]
name = "x"
kind = "carrier-pigeon"
"#;
        assert!(CollectorsConfig::from_toml_str(toml_content).is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = CollectorsConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.enabled_collectors().count(), 3);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = CollectorsConfig::from_file("/nonexistent/collectors.toml").unwrap_err();
        assert!(matches!(err, HarvestError::ConfigError { .. }));
    }
}
