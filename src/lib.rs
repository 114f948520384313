pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use crate::adapters::SqliteItemStore;
pub use config::CollectorsConfig;
pub use crate::core::{
    consolidator::{consolidate, parse_price, Consolidator},
    etl::HarvestEngine,
    orchestrator::{ExecutionMode, Orchestrator},
    report::{generate_report, ReportEmitter},
};
pub use domain::model::{CollectorOutcome, Item, NewItem, PassReport, PriceValue, ReportSummary};
pub use domain::ports::{Collector, ItemStore};
pub use utils::error::{HarvestError, Result};
