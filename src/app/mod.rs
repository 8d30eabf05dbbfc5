// Application layer: wiring shared by the binaries.

use crate::adapters::Bucket;
use crate::config::cli::LocalStorage;
use crate::core::{etl::EtlEngine, pipeline::ParquetPipeline, ConfigProvider, RunSummary, Storage};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::is_storage_url;

/// 依輸出位置選擇 storage (本地目錄或 bucket) 並執行整個 ETL
pub async fn run_pipeline<C: ConfigProvider>(config: C, monitor_enabled: bool) -> Result<RunSummary> {
    let output_path = config.output_path().to_string();

    if is_storage_url(&output_path) {
        let storage = Bucket::open(&output_path, &config.storage_options())?;
        run_with_storage(storage, config, monitor_enabled).await
    } else {
        run_with_storage(LocalStorage::new(output_path), config, monitor_enabled).await
    }
}

async fn run_with_storage<S: Storage, C: ConfigProvider>(
    storage: S,
    config: C,
    monitor_enabled: bool,
) -> Result<RunSummary> {
    let pipeline = ParquetPipeline::new(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);
    engine.run().await
}

pub fn report_success(summary: &RunSummary, as_json: bool) -> Result<()> {
    tracing::info!("✅ ETL process completed successfully!");
    tracing::info!("📁 Output saved to: {}", summary.output);

    if as_json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!("{}", summary.rows);
        println!("✅ ETL process completed successfully!");
        println!("📁 Output saved to: {}", summary.output);
    }
    Ok(())
}

/// 記錄錯誤並依嚴重程度結束程序
pub fn exit_with_error(e: &EtlError) -> ! {
    tracing::error!(
        "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    std::process::exit(e.exit_code())
}
