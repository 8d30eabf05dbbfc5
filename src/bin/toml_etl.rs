use clap::Parser;
use parquet_etl::app::{exit_with_error, report_success, run_pipeline};
use parquet_etl::core::ConfigProvider;
use parquet_etl::utils::{logger, validation::Validate};
use parquet_etl::{LocalStorage, ParquetPipeline, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "parquet-etl driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "etl-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Only read the footer and list the remote file's layout
    #[arg(long)]
    dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    summary_json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_cli_logger(args.verbose, config.json_logs());

    tracing::info!("🚀 Starting TOML-based parquet ETL");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    if let Err(e) = config.validate() {
        exit_with_error(&e);
    }

    display_config_summary(&config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - footer only, nothing is written");
        perform_dry_run(config).await;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run_pipeline(config, monitor_enabled).await {
        Ok(summary) => report_success(&summary, args.summary_json)?,
        Err(e) => exit_with_error(&e),
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig) {
    let read = config.read_options();
    tracing::info!("📋 Pipeline: {}", config.pipeline.name);
    if let Some(description) = &config.pipeline.description {
        tracing::info!("   {}", description);
    }
    tracing::info!("   Source: {} / {}", config.source_url(), config.object_name());
    tracing::info!(
        "   Read: {} x {} rows, {} byte buffer",
        read.batches,
        read.batch_size,
        read.buffer_size
    );
    if !read.columns.is_empty() {
        tracing::info!("   Columns: {}", read.columns.join(", "));
    }
    tracing::info!(
        "   Output: {}/{} ({})",
        config.output_path(),
        config.output_file(),
        config.write_options().compression
    );
}

async fn perform_dry_run(config: TomlConfig) {
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = ParquetPipeline::new(storage, config);

    match pipeline.inspect().await {
        Ok(info) => {
            println!("📦 {} ({} bytes)", info.key, info.size);
            println!("   row groups: {}", info.row_groups);
            println!("   rows: {}", info.rows);
            println!("   columns: {}", info.columns.join(", "));
            println!("   remote reads: {}", info.remote_reads);
        }
        Err(e) => exit_with_error(&e),
    }
}
