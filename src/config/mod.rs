pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::model::{ReadOptions, WriteOptions, DEFAULT_METADATA_SIZE_HINT};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE_URL: &str = "gs://druid-demo.gorill-stage.io";
pub const DEFAULT_OBJECT: &str = "safegraph/2020/01/green_tripdata_2020-01.parquet";
pub const DEFAULT_OUTPUT_FILE: &str = "out.parquet";

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "parquet-etl")]
#[command(about = "Read one batch of a remote Parquet file and write it back out locally")]
pub struct CliConfig {
    /// Bucket URL (gs://, s3://, az://, file://, ...)
    #[arg(long, default_value = DEFAULT_SOURCE_URL)]
    pub source_url: String,

    /// Object key (or key fragment) inside the bucket
    #[arg(long, default_value = DEFAULT_OBJECT)]
    pub object: String,

    /// Output directory, or a bucket URL
    #[arg(long, default_value = ".")]
    pub output_path: String,

    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    pub output_file: String,

    #[arg(long, default_value = "1000")]
    pub batch_size: usize,

    /// Number of batches to read
    #[arg(long, default_value = "1")]
    pub batches: usize,

    /// Maximum bytes per remote range read
    #[arg(long, default_value = "1048576")]
    pub buffer_size: usize,

    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    #[arg(long, default_value = "uncompressed")]
    pub compression: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Print the run summary as JSON")]
    pub summary_json: bool,
}

impl ConfigProvider for CliConfig {
    fn source_url(&self) -> &str {
        &self.source_url
    }

    fn object_name(&self) -> &str {
        &self.object
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_file(&self) -> &str {
        &self.output_file
    }

    fn read_options(&self) -> ReadOptions {
        ReadOptions {
            batch_size: self.batch_size,
            batches: self.batches,
            buffer_size: self.buffer_size,
            metadata_size_hint: Some(DEFAULT_METADATA_SIZE_HINT),
            columns: self.columns.clone(),
        }
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions {
            compression: self.compression.clone(),
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_storage_url("source_url", &self.source_url)?;
        validation::validate_non_empty_string("object", &self.object)?;
        validate_output("output_path", &self.output_path, &self.output_file)?;
        validate_read_options(&self.read_options())?;
        validation::validate_compression("compression", &self.compression)?;
        Ok(())
    }
}

pub(crate) fn validate_output(field_name: &str, output_path: &str, output_file: &str) -> Result<()> {
    if validation::is_storage_url(output_path) {
        validation::validate_storage_url(field_name, output_path)?;
    } else {
        validation::validate_path(field_name, output_path)?;
    }
    validation::validate_path("output_file", output_file)?;
    validation::validate_file_extension("output_file", output_file, &["parquet"])
}

pub(crate) fn validate_read_options(options: &ReadOptions) -> Result<()> {
    validation::validate_positive_number("batch_size", options.batch_size, 1)?;
    validation::validate_positive_number("batches", options.batches, 1)?;
    validation::validate_range("buffer_size", options.buffer_size, 4 * 1024, 256 * 1024 * 1024)?;
    for column in &options.columns {
        validation::validate_non_empty_string("columns", column)?;
    }
    Ok(())
}
