pub mod adapter;
pub mod consolidator;
pub mod etl;
pub mod orchestrator;
pub mod report;

pub use crate::domain::model::{Consolidated, Item, NewItem, PassReport, ReportSummary};
pub use crate::domain::ports::{Collector, ItemStore};
pub use crate::utils::error::Result;
