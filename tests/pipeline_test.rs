use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use parquet_etl::core::Pipeline;
use parquet_etl::{Bucket, CliConfig, EtlEngine, EtlError, LocalStorage, ParquetPipeline};
use tempfile::TempDir;

const OBJECT: &str = "safegraph/2020/01/green_tripdata_2020-01.parquet";

fn trips_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("VendorID", DataType::Int64, false),
        Field::new("store_and_fwd_flag", DataType::Utf8, true),
        Field::new("fare_amount", DataType::Float64, true),
    ]))
}

/// 產生 `rows` 列、每個 row group `row_group_size` 列的 parquet 檔
fn trips_parquet(rows: usize, row_group_size: usize) -> Vec<u8> {
    let schema = trips_schema();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values((0..rows as i64).map(|i| i % 3))),
            Arc::new(StringArray::from_iter_values(
                (0..rows).map(|i| if i % 2 == 0 { "N" } else { "Y" }),
            )),
            Arc::new(Float64Array::from_iter_values(
                (0..rows).map(|i| i as f64 * 1.5),
            )),
        ],
    )
    .unwrap();

    let props = WriterProperties::builder()
        .set_max_row_group_size(row_group_size)
        .build();
    let mut writer = ArrowWriter::try_new(Vec::new(), schema, Some(props)).unwrap();
    writer.write(&batch).unwrap();
    writer.into_inner().unwrap()
}

async fn source_bucket(key: &str, data: Vec<u8>) -> Bucket {
    let store = Arc::new(InMemory::new());
    store
        .put(&Path::from(key), PutPayload::from(data))
        .await
        .unwrap();
    Bucket::with_store("memory://source", store, Path::default())
}

fn config_for(output_dir: &TempDir) -> CliConfig {
    CliConfig {
        source_url: "memory://source".to_string(),
        object: OBJECT.to_string(),
        output_path: output_dir.path().to_str().unwrap().to_string(),
        output_file: "out.parquet".to_string(),
        batch_size: 1000,
        batches: 1,
        buffer_size: 1024 * 1024,
        columns: vec![],
        compression: "uncompressed".to_string(),
        verbose: false,
        monitor: false,
        json_logs: false,
        summary_json: false,
    }
}

fn read_output(path: &std::path::Path) -> (usize, usize, Vec<RecordBatch>) {
    let file = std::fs::File::open(path).unwrap();
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
    let row_groups = builder.metadata().num_row_groups();
    let batches: Vec<RecordBatch> = builder.build().unwrap().map(|b| b.unwrap()).collect();
    let rows = batches.iter().map(|b| b.num_rows()).sum();
    (rows, row_groups, batches)
}

#[tokio::test]
async fn test_reads_one_batch_and_writes_local_parquet() {
    let output_dir = TempDir::new().unwrap();
    let bucket = source_bucket(OBJECT, trips_parquet(2500, 1200)).await;

    let storage = LocalStorage::new(output_dir.path().to_str().unwrap().to_string());
    let pipeline = ParquetPipeline::with_bucket(storage, config_for(&output_dir), bucket);
    let summary = EtlEngine::new(pipeline).run().await.unwrap();

    assert_eq!(summary.rows, 1000);
    assert_eq!(summary.batches, 1);
    assert_eq!(summary.columns, 3);
    assert_eq!(summary.object, OBJECT);
    assert!(summary.remote_reads > 0);
    assert!(summary.bytes_fetched > 0);
    assert!(summary.output.ends_with("out.parquet"));

    let (rows, row_groups, batches) = read_output(&output_dir.path().join("out.parquet"));
    assert_eq!(rows, 1000);
    assert_eq!(row_groups, 1);
    assert_eq!(batches[0].schema().fields().len(), 3);

    let fares = batches[0]
        .column(2)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(fares.value(10), 15.0);
}

#[tokio::test]
async fn test_reading_stops_at_end_of_file() {
    let output_dir = TempDir::new().unwrap();
    let bucket = source_bucket(OBJECT, trips_parquet(25, 10)).await;

    let mut config = config_for(&output_dir);
    config.batch_size = 10;
    config.batches = 5;

    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = ParquetPipeline::with_bucket(storage, config, bucket);

    let extracted = pipeline.extract().await.unwrap();
    assert_eq!(extracted.batches.len(), 3);

    let table = pipeline.transform(extracted).await.unwrap();
    assert_eq!(table.num_rows(), 25);

    let loaded = pipeline.load(table).await.unwrap();
    assert_eq!(loaded.rows, 25);
    assert_eq!(read_output(&output_dir.path().join("out.parquet")).0, 25);
}

#[tokio::test]
async fn test_batches_span_row_groups() {
    let output_dir = TempDir::new().unwrap();
    let bucket = source_bucket(OBJECT, trips_parquet(100, 30)).await;

    let mut config = config_for(&output_dir);
    config.batch_size = 20;
    config.batches = 3;

    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = ParquetPipeline::with_bucket(storage, config, bucket);

    let extracted = pipeline.extract().await.unwrap();
    let sizes: Vec<usize> = extracted.batches.iter().map(|b| b.num_rows()).collect();
    assert_eq!(sizes, vec![20, 20, 20]);

    let table = pipeline.transform(extracted).await.unwrap();
    assert_eq!(table.num_rows(), 60);
    assert_eq!(table.batch_count, 3);

    // 第二個 row group 從第 30 列開始，列順序必須連續
    let fares = table
        .batch
        .column(2)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(fares.value(35), 52.5);
    assert_eq!(fares.value(59), 88.5);
}

#[tokio::test]
async fn test_batch_smaller_than_row_group() {
    let output_dir = TempDir::new().unwrap();
    let bucket = source_bucket(OBJECT, trips_parquet(100, 50)).await;

    let mut config = config_for(&output_dir);
    config.batch_size = 20;
    config.batches = 2;

    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = ParquetPipeline::with_bucket(storage, config, bucket);
    let summary = EtlEngine::new(pipeline).run().await.unwrap();

    assert_eq!(summary.rows, 40);
    assert_eq!(summary.batches, 2);
    assert_eq!(read_output(&output_dir.path().join("out.parquet")).0, 40);
}

#[tokio::test]
async fn test_column_projection() {
    let output_dir = TempDir::new().unwrap();
    let bucket = source_bucket(OBJECT, trips_parquet(50, 50)).await;

    let mut config = config_for(&output_dir);
    config.columns = vec!["fare_amount".to_string(), "VendorID".to_string()];
    config.compression = "zstd".to_string();

    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = ParquetPipeline::with_bucket(storage, config, bucket);
    let summary = EtlEngine::new(pipeline).run().await.unwrap();
    assert_eq!(summary.columns, 2);

    let (_, _, batches) = read_output(&output_dir.path().join("out.parquet"));
    let schema = batches[0].schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    // projection 保留檔案中的欄位順序
    assert_eq!(names, vec!["VendorID", "fare_amount"]);
}

#[tokio::test]
async fn test_unknown_column_fails() {
    let output_dir = TempDir::new().unwrap();
    let bucket = source_bucket(OBJECT, trips_parquet(10, 10)).await;

    let mut config = config_for(&output_dir);
    config.columns = vec!["tip_amount".to_string()];

    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = ParquetPipeline::with_bucket(storage, config, bucket);
    let err = pipeline.extract().await.unwrap_err();
    assert!(matches!(err, EtlError::ColumnNotFound { name } if name == "tip_amount"));
}

#[tokio::test]
async fn test_file_without_row_groups_is_invalid() {
    let output_dir = TempDir::new().unwrap();
    let writer = ArrowWriter::try_new(Vec::new(), trips_schema(), None).unwrap();
    let empty = writer.into_inner().unwrap();
    let bucket = source_bucket(OBJECT, empty).await;

    let storage = LocalStorage::new(output_dir.path().to_str().unwrap().to_string());
    let pipeline = ParquetPipeline::with_bucket(storage, config_for(&output_dir), bucket);
    let err = EtlEngine::new(pipeline).run().await.unwrap_err();

    assert!(matches!(err, EtlError::InvalidParquet { .. }));
    assert!(!output_dir.path().join("out.parquet").exists());
}

#[tokio::test]
async fn test_missing_object() {
    let output_dir = TempDir::new().unwrap();
    let bucket = source_bucket("other/file.parquet", trips_parquet(10, 10)).await;

    let storage = LocalStorage::new(output_dir.path().to_str().unwrap().to_string());
    let pipeline = ParquetPipeline::with_bucket(storage, config_for(&output_dir), bucket);
    let err = pipeline.extract().await.unwrap_err();
    assert!(matches!(err, EtlError::ObjectNotFound { .. }));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_object_located_by_key_fragment() {
    let output_dir = TempDir::new().unwrap();
    let bucket = source_bucket(OBJECT, trips_parquet(30, 30)).await;

    let mut config = config_for(&output_dir);
    config.object = "safegraph/2020/01/green_tripdata".to_string();

    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = ParquetPipeline::with_bucket(storage, config, bucket);
    let extracted = pipeline.extract().await.unwrap();
    assert_eq!(extracted.object.location.as_ref(), OBJECT);
}

#[tokio::test]
async fn test_inspect_reads_footer_only() {
    let output_dir = TempDir::new().unwrap();
    let bucket = source_bucket(OBJECT, trips_parquet(100, 40)).await;

    let storage = LocalStorage::new(output_dir.path().to_str().unwrap().to_string());
    let pipeline = ParquetPipeline::with_bucket(storage, config_for(&output_dir), bucket);
    let info = pipeline.inspect().await.unwrap();

    assert_eq!(info.key, OBJECT);
    assert_eq!(info.row_groups, 3);
    assert_eq!(info.rows, 100);
    assert_eq!(
        info.columns,
        vec!["VendorID", "store_and_fwd_flag", "fare_amount"]
    );
    assert!(info.remote_reads >= 1);
    assert!(!output_dir.path().join("out.parquet").exists());
}

#[tokio::test]
async fn test_output_written_back_to_bucket() {
    let output_dir = TempDir::new().unwrap();
    let source = source_bucket(OBJECT, trips_parquet(20, 20)).await;

    let out_store = Arc::new(InMemory::new());
    let output = Bucket::with_store("memory://out", out_store.clone(), Path::from("exports"));

    let pipeline = ParquetPipeline::with_bucket(output, config_for(&output_dir), source);
    let summary = EtlEngine::new(pipeline).run().await.unwrap();
    assert_eq!(summary.output, "memory://out/out.parquet");

    let written = out_store
        .head(&Path::from("exports/out.parquet"))
        .await
        .unwrap();
    assert_eq!(written.size, summary.bytes_written);
}

#[tokio::test]
async fn test_file_url_source_end_to_end() {
    let source_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(source_dir.path().join("raw")).unwrap();
    std::fs::write(
        source_dir.path().join("raw/trips.parquet"),
        trips_parquet(1500, 500),
    )
    .unwrap();

    let mut config = config_for(&output_dir);
    config.source_url = format!("file://{}", source_dir.path().display());
    config.object = "raw/trips.parquet".to_string();
    config.output_file = "sample.parquet".to_string();
    config.compression = "snappy".to_string();

    // 1000 列跨越兩個 500 列的 row group
    let summary = parquet_etl::app::run_pipeline(config, false).await.unwrap();
    assert_eq!(summary.rows, 1000);
    assert_eq!(summary.batches, 1);

    let (rows, row_groups, _) = read_output(&output_dir.path().join("sample.parquet"));
    assert_eq!(rows, 1000);
    assert_eq!(row_groups, 1);
}
