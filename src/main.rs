use clap::Parser;
use parquet_etl::app::{exit_with_error, report_success, run_pipeline};
use parquet_etl::utils::{logger, validation::Validate};
use parquet_etl::CliConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose, config.json_logs);

    tracing::info!("Starting parquet-etl");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        exit_with_error(&e);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }
    let summary_json = config.summary_json;

    match run_pipeline(config, monitor_enabled).await {
        Ok(summary) => report_success(&summary, summary_json)?,
        Err(e) => exit_with_error(&e),
    }

    Ok(())
}
