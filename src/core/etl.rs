use crate::core::{Pipeline, RunSummary};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started_at = chrono::Utc::now();
        tracing::info!("🚀 Starting ETL process for {}", self.pipeline.source());
        self.monitor.log_stats("Start");

        // Extract
        tracing::info!("📥 Reading remote parquet...");
        let extracted = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Decoded {} batches with {} remote reads ({} bytes)",
            extracted.batches.len(),
            extracted.reads.calls,
            extracted.reads.bytes
        );
        self.monitor.log_stats("Extract");

        // Transform
        tracing::info!("🔄 Assembling table...");
        let table = self.pipeline.transform(extracted).await?;
        tracing::info!(
            "🔄 Table has {} rows and {} columns",
            table.num_rows(),
            table.num_columns()
        );
        self.monitor.log_stats("Transform");

        // Load
        tracing::info!("💾 Writing parquet...");
        let loaded = self.pipeline.load(table).await?;
        tracing::info!("💾 Wrote {} bytes to {}", loaded.bytes_written, loaded.output);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(RunSummary {
            source: self.pipeline.source(),
            object: loaded.source_object,
            object_size: loaded.source_size,
            remote_reads: loaded.reads.calls,
            bytes_fetched: loaded.reads.bytes,
            batches: loaded.batches,
            rows: loaded.rows,
            columns: loaded.columns,
            output: loaded.output,
            bytes_written: loaded.bytes_written,
            started_at,
            finished_at: chrono::Utc::now(),
        })
    }
}
