use crate::domain::model::{NewItem, PRICE_UNAVAILABLE};
use crate::domain::ports::{Collector, ItemStore};
use crate::utils::error::{HarvestError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// 外部程式每行輸出一筆 JSON
#[derive(Debug, Deserialize)]
struct ScrapedLine {
    title: String,
    #[serde(default)]
    price: Option<String>,
}

/// 以外部程式執行的 collector (例如瀏覽器自動化腳本)
///
/// 程式結束碼為 0 時才寫入 store；非 0 或逾時則不寫入任何 item。
pub struct CommandCollector {
    name: String,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandCollector {
    pub fn new(name: &str, program: &str, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args,
            timeout,
        }
    }

    fn parse_output(&self, stdout: &str) -> Vec<NewItem> {
        let mut items = Vec::new();

        for (line_no, line) in stdout.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<ScrapedLine>(line) {
                Ok(parsed) => {
                    let price = parsed
                        .price
                        .filter(|p| !p.trim().is_empty())
                        .unwrap_or_else(|| PRICE_UNAVAILABLE.to_string());
                    items.push(NewItem::new(parsed.title, price, self.name.as_str()));
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ {}: skipping malformed output line {}: {}",
                        self.name,
                        line_no + 1,
                        e
                    );
                }
            }
        }

        items
    }
}

#[async_trait]
impl Collector for CommandCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, store: &dyn ItemStore) -> Result<usize> {
        tracing::debug!("Spawning {} {:?}", self.program, self.args);

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // 逾時時 future 被丟棄，kill_on_drop 會終止子程序
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| HarvestError::Timeout {
                collector: self.name.clone(),
                seconds: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(HarvestError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let items = self.parse_output(&stdout);

        let found = items.len();
        for item in items {
            store.append(item)?;
        }

        tracing::info!("📥 {} items from {}", found, self.program);
        Ok(found)
    }
}
