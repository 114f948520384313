use crate::core::consolidator::Consolidator;
use crate::domain::model::{CleanedItem, RankedItem, ReportSummary};
use crate::domain::ports::ItemStore;
use crate::utils::error::{HarvestError, Result};
use plotters::prelude::*;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

pub const TABLE_FILENAME: &str = "item_summary.csv";
pub const CHART_FILENAME: &str = "top_10_prices.svg";

const CHART_SIZE: (u32, u32) = (1000, 600);

#[derive(Debug, Serialize)]
struct TableRow<'a> {
    id: i64,
    title: &'a str,
    price: &'a str,
}

/// 輸出清理後的表格與前 N 名價格長條圖
pub struct ReportEmitter {
    span: tracing::Span,
}

impl Default for ReportEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEmitter {
    pub fn new() -> Self {
        Self {
            span: tracing::info_span!("report"),
        }
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn emit(
        &self,
        cleaned: &[CleanedItem],
        top_ranked: &[RankedItem],
        output_dir: &Path,
    ) -> Result<ReportSummary> {
        let _entered = self.span.enter();

        std::fs::create_dir_all(output_dir)?;

        let table_path = output_dir.join(TABLE_FILENAME);
        let table = render_table(cleaned)?;
        write_atomic(&table_path, &table)?;
        tracing::debug!("💾 Wrote {} rows to {}", cleaned.len(), table_path.display());

        let chart_path = if top_ranked.is_empty() {
            tracing::info!("⏭️ No priced items, skipping chart");
            None
        } else {
            let path = output_dir.join(CHART_FILENAME);
            let svg = render_chart(top_ranked)?;
            write_atomic(&path, svg.as_bytes())?;
            tracing::debug!("💾 Wrote chart of {} items to {}", top_ranked.len(), path.display());
            Some(path)
        };

        Ok(ReportSummary {
            row_count: cleaned.len(),
            ranked_count: top_ranked.len(),
            table_path,
            chart_path,
        })
    }
}

/// 欄位固定為 id,title,price；不含時間戳記，同樣輸入必得同樣輸出
fn render_table(cleaned: &[CleanedItem]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if cleaned.is_empty() {
        writer.write_record(["id", "title", "price"])?;
    }
    for row in cleaned {
        writer.serialize(TableRow {
            id: row.item.id,
            title: &row.item.title,
            price: &row.item.price,
        })?;
    }

    writer.into_inner().map_err(|e| HarvestError::Io(e.into_error()))
}

fn render_chart(top_ranked: &[RankedItem]) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let max_value = top_ranked.iter().map(|r| r.value).fold(0.0_f64, f64::max);
        let x_max = if max_value > 0.0 { max_value * 1.05 } else { 1.0 };
        let bars = top_ranked.len();

        let mut chart = ChartBuilder::on(&root)
            .caption("Top 10 Most Expensive Items", ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(320)
            .build_cartesian_2d(0.0..x_max, (0..bars).into_segmented())
            .map_err(chart_error)?;

        // 最高價排在最上方
        let label = |value: &SegmentValue<usize>| match value {
            SegmentValue::CenterOf(index) => (bars - 1)
                .checked_sub(*index)
                .and_then(|rank| top_ranked.get(rank))
                .map(|r| truncate_label(&r.title))
                .unwrap_or_default(),
            _ => String::new(),
        };

        chart
            .configure_mesh()
            .disable_y_mesh()
            .x_desc("Price ($)")
            .y_labels(bars)
            .y_label_formatter(&label)
            .draw()
            .map_err(chart_error)?;

        chart
            .draw_series(top_ranked.iter().enumerate().map(|(rank, item)| {
                let row = bars - 1 - rank;
                let mut bar = Rectangle::new(
                    [
                        (0.0, SegmentValue::Exact(row)),
                        (item.value, SegmentValue::Exact(row + 1)),
                    ],
                    BLUE.mix(0.7).filled(),
                );
                bar.set_margin(4, 4, 0, 0);
                bar
            }))
            .map_err(chart_error)?;

        root.present().map_err(chart_error)?;
    }
    Ok(svg)
}

fn truncate_label(title: &str) -> String {
    const MAX_CHARS: usize = 48;
    if title.chars().count() <= MAX_CHARS {
        title.to_string()
    } else {
        let mut short: String = title.chars().take(MAX_CHARS - 1).collect();
        short.push('…');
        short
    }
}

fn chart_error<E: std::fmt::Display>(e: E) -> HarvestError {
    HarvestError::Chart {
        message: e.to_string(),
    }
}

/// 先寫入同目錄的暫存檔再 rename，避免留下寫到一半的檔案
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| HarvestError::Io(e.error))?;
    Ok(())
}

/// 讀取 store、整理並輸出報表
pub fn generate_report(store: Arc<dyn ItemStore>, output_dir: &Path) -> Result<ReportSummary> {
    let span = tracing::info_span!("generate_report", output_dir = %output_dir.display());
    span.in_scope(|| tracing::info!("Generating final report..."));

    // 尚未 scrape 過的資料庫也能產生只有表頭的報表
    store.ensure_schema()?;
    let consolidated = Consolidator::new(store)
        .with_span(tracing::info_span!(parent: &span, "consolidate"))
        .run()?;
    let summary = ReportEmitter::new()
        .with_span(tracing::info_span!(parent: &span, "emit"))
        .emit(&consolidated.cleaned, &consolidated.top_ranked, output_dir)?;

    span.in_scope(|| tracing::info!("Final cleaned item count: {}", summary.row_count));
    Ok(summary)
}
