use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "price-harvest")]
#[command(about = "Run product collectors into a shared store and build a cleaned price report")]
pub struct CliConfig {
    #[arg(long, help = "Run all registered collectors")]
    pub scrape: bool,

    #[arg(long, help = "Generate the cleaned item table and price chart")]
    pub report: bool,

    #[arg(long, default_value = "collectors.toml", help = "Collector registry file")]
    pub config: PathBuf,

    #[arg(long, default_value = "data_output/items.db", help = "SQLite item store")]
    pub database: PathBuf,

    #[arg(long, default_value = "data_output/reports", help = "Report output directory")]
    pub output_dir: PathBuf,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log JSON lines instead of compact text")]
    pub json_logs: bool,

    #[arg(long, help = "Log CPU and memory around each collector")]
    pub monitor: bool,
}

impl CliConfig {
    /// 沒有指定任何動作時只印出用法
    pub fn has_action(&self) -> bool {
        self.scrape || self.report
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("database", &self.database.to_string_lossy())?;
        validation::validate_path("output_dir", &self.output_dir.to_string_lossy())?;
        if self.scrape {
            validation::validate_path("config", &self.config.to_string_lossy())?;
        }
        Ok(())
    }
}
