use crate::adapters::{Bucket, RangeReader};
use crate::core::{ConfigProvider, Extracted, LoadResult, Pipeline, Storage, Table};
use crate::domain::model::ObjectInfo;
use crate::utils::error::{EtlError, Result};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use parquet::arrow::{ArrowWriter, ParquetRecordBatchStreamBuilder, ProjectionMask};
use parquet::file::properties::WriterProperties;
use parquet::schema::types::SchemaDescriptor;

pub struct ParquetPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    bucket: Option<Bucket>,
}

impl<S: Storage, C: ConfigProvider> ParquetPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            bucket: None,
        }
    }

    /// 使用已開啟的 bucket，而不是依 `source_url` 建立
    pub fn with_bucket(storage: S, config: C, bucket: Bucket) -> Self {
        Self {
            storage,
            config,
            bucket: Some(bucket),
        }
    }

    fn bucket(&self) -> Result<Bucket> {
        match &self.bucket {
            Some(bucket) => Ok(bucket.clone()),
            None => Bucket::open(self.config.source_url(), &self.config.storage_options()),
        }
    }

    async fn open_reader(&self) -> Result<(RangeReader, object_store::ObjectMeta)> {
        let bucket = self.bucket()?;
        let options = self.config.read_options();

        let meta = bucket.locate(self.config.object_name()).await?;
        tracing::info!(
            "📦 Found {} ({} bytes) in {}",
            meta.location,
            meta.size,
            bucket.url()
        );

        let reader = RangeReader::new(bucket.store(), &meta)
            .with_buffer_size(options.buffer_size)
            .with_metadata_size_hint(options.metadata_size_hint);
        Ok((reader, meta))
    }

    /// 只讀取 footer，回報 row group、列數與欄位，不解碼資料
    pub async fn inspect(&self) -> Result<ObjectInfo> {
        let (reader, meta) = self.open_reader().await?;
        let stats = reader.stats();

        let builder = ParquetRecordBatchStreamBuilder::new(reader).await?;
        let metadata = builder.metadata();
        let columns = builder
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();

        Ok(ObjectInfo {
            key: meta.location.to_string(),
            size: meta.size,
            row_groups: metadata.num_row_groups(),
            rows: metadata.file_metadata().num_rows(),
            columns,
            remote_reads: stats.snapshot().calls,
        })
    }
}

/// 依欄位名稱建立 projection；未指定時選取 row group 0 的所有 leaf 欄位
fn projection(
    descr: &SchemaDescriptor,
    row_group_columns: usize,
    columns: &[String],
) -> Result<ProjectionMask> {
    if columns.is_empty() {
        return Ok(ProjectionMask::leaves(descr, 0..row_group_columns));
    }

    let roots = descr.root_schema().get_fields();
    let indices = columns
        .iter()
        .map(|name| {
            roots
                .iter()
                .position(|field| field.name() == name.as_str())
                .ok_or_else(|| EtlError::ColumnNotFound { name: name.clone() })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ProjectionMask::roots(descr, indices))
}

/// 把表格切成每份 `batch_size` 列 (最後一份可能較少)
fn rechunk(table: &RecordBatch, batch_size: usize) -> Vec<RecordBatch> {
    let step = batch_size.max(1);
    (0..table.num_rows())
        .step_by(step)
        .map(|offset| table.slice(offset, step.min(table.num_rows() - offset)))
        .collect()
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ParquetPipeline<S, C> {
    fn source(&self) -> String {
        self.config.source_url().to_string()
    }

    async fn extract(&self) -> Result<Extracted> {
        let options = self.config.read_options();
        let (reader, meta) = self.open_reader().await?;
        let stats = reader.stats();

        let builder = ParquetRecordBatchStreamBuilder::new(reader).await?;

        let num_row_groups = builder.metadata().num_row_groups();
        if num_row_groups == 0 {
            return Err(EtlError::InvalidParquet {
                message: format!("{} has no row groups", meta.location),
            });
        }
        let row_group_columns = builder.metadata().row_group(0).num_columns();
        tracing::debug!(
            "File has {} row groups, {} leaf columns",
            num_row_groups,
            row_group_columns
        );

        let mask = projection(builder.parquet_schema(), row_group_columns, &options.columns)?;
        let mut stream = builder
            .with_batch_size(options.batch_size)
            .with_projection(mask)
            .build()?;
        let schema = stream.schema().clone();

        // stream 的 batch 不會跨越 row group，需持續讀取直到湊滿 batch_size * batches 列
        let target = options.batch_size.saturating_mul(options.batches);
        let mut decoded = Vec::new();
        let mut rows = 0;
        while rows < target {
            let Some(batch) = stream.try_next().await? else {
                break;
            };
            tracing::debug!("Decoded batch with {} rows", batch.num_rows());
            let take = (target - rows).min(batch.num_rows());
            decoded.push(batch.slice(0, take));
            rows += take;
        }
        drop(stream);

        let batches = rechunk(&concat_batches(&schema, &decoded)?, options.batch_size);
        tracing::debug!("Gathered {} rows into {} batches", rows, batches.len());

        let reads = stats.snapshot();
        tracing::info!("made {} calls", reads.calls);

        Ok(Extracted {
            object: meta,
            schema,
            batches,
            reads,
        })
    }

    async fn transform(&self, data: Extracted) -> Result<Table> {
        let batch_count = data.batches.len();
        let batch = concat_batches(&data.schema, &data.batches)?;

        Ok(Table {
            object: data.object,
            reads: data.reads,
            batch_count,
            batch,
        })
    }

    async fn load(&self, table: Table) -> Result<LoadResult> {
        let compression = self.config.write_options().parquet_compression()?;
        // 所有列寫進同一個 row group
        let props = WriterProperties::builder()
            .set_compression(compression)
            .set_max_row_group_size(table.num_rows().max(1))
            .build();

        let mut writer = ArrowWriter::try_new(Vec::new(), table.schema(), Some(props))?;
        writer.write(&table.batch)?;
        let data = writer.into_inner()?;

        let output_file = self.config.output_file();
        self.storage.write_file(output_file, &data).await?;

        Ok(LoadResult {
            output: self.storage.describe(output_file),
            bytes_written: data.len(),
            rows: table.num_rows(),
            columns: table.num_columns(),
            batches: table.batch_count,
            source_object: table.object.location.to_string(),
            source_size: table.object.size,
            reads: table.reads,
        })
    }
}
