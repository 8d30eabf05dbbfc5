use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use object_store::ObjectMeta;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use serde::{Deserialize, Serialize};

use crate::utils::error::{EtlError, Result};

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_BATCHES: usize = 1;
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;
pub const DEFAULT_METADATA_SIZE_HINT: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOptions {
    /// 每個 batch 的列數
    pub batch_size: usize,
    /// 要讀取的 batch 數量
    pub batches: usize,
    /// 單次遠端 range read 的最大位元組數
    pub buffer_size: usize,
    /// 讀取 footer 時預先抓取的位元組數
    pub metadata_size_hint: Option<usize>,
    /// 只讀取這些欄位，空白代表全部
    pub columns: Vec<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batches: DEFAULT_BATCHES,
            buffer_size: DEFAULT_BUFFER_SIZE,
            metadata_size_hint: Some(DEFAULT_METADATA_SIZE_HINT),
            columns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    pub compression: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression: "uncompressed".to_string(),
        }
    }
}

impl WriteOptions {
    pub fn parquet_compression(&self) -> Result<Compression> {
        match self.compression.to_ascii_lowercase().as_str() {
            "uncompressed" => Ok(Compression::UNCOMPRESSED),
            "snappy" => Ok(Compression::SNAPPY),
            "gzip" => Ok(Compression::GZIP(GzipLevel::default())),
            "zstd" => Ok(Compression::ZSTD(ZstdLevel::default())),
            "lz4" => Ok(Compression::LZ4_RAW),
            other => Err(EtlError::InvalidConfigValueError {
                field: "compression".to_string(),
                value: other.to_string(),
                reason: "Unknown compression codec".to_string(),
            }),
        }
    }
}

/// 遠端讀取統計的快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadStatsSnapshot {
    pub calls: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct Extracted {
    pub object: ObjectMeta,
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
    pub reads: ReadStatsSnapshot,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub object: ObjectMeta,
    pub reads: ReadStatsSnapshot,
    pub batch_count: usize,
    pub batch: RecordBatch,
}

impl Table {
    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadResult {
    pub output: String,
    pub bytes_written: usize,
    pub rows: usize,
    pub columns: usize,
    pub batches: usize,
    pub source_object: String,
    pub source_size: usize,
    pub reads: ReadStatsSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub source: String,
    pub object: String,
    pub object_size: usize,
    pub remote_reads: usize,
    pub bytes_fetched: u64,
    pub batches: usize,
    pub rows: usize,
    pub columns: usize,
    pub output: String,
    pub bytes_written: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: usize,
    pub row_groups: usize,
    pub rows: i64,
    pub columns: Vec<String>,
    pub remote_reads: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_read_options_match_demo_constants() {
        let options = ReadOptions::default();
        assert_eq!(options.batch_size, 1000);
        assert_eq!(options.batches, 1);
        assert_eq!(options.buffer_size, 1024 * 1024);
        assert!(options.columns.is_empty());
    }

    #[test]
    fn test_parquet_compression() {
        let mut options = WriteOptions::default();
        assert_eq!(
            options.parquet_compression().unwrap(),
            Compression::UNCOMPRESSED
        );

        options.compression = "Snappy".to_string();
        assert_eq!(options.parquet_compression().unwrap(), Compression::SNAPPY);

        options.compression = "bogus".to_string();
        assert!(options.parquet_compression().is_err());
    }
}
