use clap::{CommandFactory, Parser};
use price_harvest::utils::error::{ErrorSeverity, HarvestError};
use price_harvest::utils::{logger, validation::Validate};
use price_harvest::{CliConfig, CollectorsConfig, HarvestEngine, Orchestrator, SqliteItemStore};
use std::sync::Arc;

fn fail(e: &HarvestError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn build_orchestrator(config: &CliConfig, store: Arc<SqliteItemStore>) -> Result<Orchestrator, HarvestError> {
    let mut orchestrator = Orchestrator::new(store).with_monitoring(config.monitor);
    if !config.scrape {
        return Ok(orchestrator);
    }

    tracing::info!("📁 Loading collectors from: {}", config.config.display());
    let collectors = CollectorsConfig::from_file(&config.config)?;
    collectors.validate()?;

    orchestrator = orchestrator.with_mode(collectors.run.mode);
    for collector in collectors.build_collectors()? {
        orchestrator.register(collector);
    }
    Ok(orchestrator)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if !config.has_action() {
        CliConfig::command().print_help()?;
        println!();
        return Ok(());
    }

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        fail(&e);
    }

    let store = match SqliteItemStore::open(&config.database) {
        Ok(store) => Arc::new(store),
        Err(e) => fail(&e),
    };

    let orchestrator = match build_orchestrator(&config, Arc::clone(&store)) {
        Ok(orchestrator) => orchestrator,
        Err(e) => fail(&e),
    };

    let engine = HarvestEngine::new(store, orchestrator, config.output_dir.clone());

    match engine.run(config.scrape, config.report).await {
        Ok((pass, summary)) => {
            if let Some(pass) = pass {
                println!(
                    "✅ Scrape finished: {} collectors succeeded, {} failed, {} items stored",
                    pass.succeeded().count(),
                    pass.failed().count(),
                    pass.items_written()
                );
            }
            if let Some(summary) = summary {
                println!("\n✅ Final Report");
                println!("Cleaned, unique items: {}", summary.row_count);
                println!("Saved: {}", summary.table_path.display());
                if let Some(chart) = summary.chart_path {
                    println!("Saved: {}", chart.display());
                }
            }
        }
        Err(e) => fail(&e),
    }

    Ok(())
}
