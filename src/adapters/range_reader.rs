use std::io::SeekFrom;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore};
use parquet::arrow::async_reader::AsyncFileReader;
use parquet::errors::{ParquetError, Result as ParquetResult};
use parquet::file::metadata::{ParquetMetaData, ParquetMetaDataReader};

use crate::domain::model::{ReadStatsSnapshot, DEFAULT_BUFFER_SIZE};
use crate::utils::error::{EtlError, Result};

/// 遠端呼叫次數與抓取的位元組數。
///
/// reader 交給 parquet stream 之後仍可透過這個 handle 讀取統計。
#[derive(Debug, Default)]
pub struct ReadStats {
    calls: AtomicUsize,
    bytes: AtomicU64,
}

impl ReadStats {
    fn record(&self, len: usize) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReadStatsSnapshot {
        ReadStatsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

/// Random-access view of one remote object, backed by object store range reads.
///
/// Every read goes straight to the store: there is no caching, and a read
/// longer than `buffer_size` is split into sequential range requests. All
/// reads take `&mut self` through [`AsyncFileReader`], so the parquet reader
/// fetches one range at a time.
#[derive(Debug)]
pub struct RangeReader {
    store: Arc<dyn ObjectStore>,
    location: Path,
    size: usize,
    position: u64,
    buffer_size: usize,
    metadata_size_hint: Option<usize>,
    stats: Arc<ReadStats>,
}

impl RangeReader {
    pub fn new(store: Arc<dyn ObjectStore>, meta: &ObjectMeta) -> Self {
        Self {
            store,
            location: meta.location.clone(),
            size: meta.size,
            position: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
            metadata_size_hint: None,
            stats: Arc::new(ReadStats::default()),
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn with_metadata_size_hint(mut self, hint: Option<usize>) -> Self {
        self.metadata_size_hint = hint;
        self
    }

    pub fn stats(&self) -> Arc<ReadStats> {
        Arc::clone(&self.stats)
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// 讀取 `[offset, offset + len)`。不會移動游標。
    pub async fn read_at(&self, offset: usize, len: usize) -> Result<Bytes> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= self.size)
            .ok_or(EtlError::ReadOutOfRange {
                offset: offset as u64,
                len,
                size: self.size as u64,
            })?;

        if len == 0 {
            return Ok(Bytes::new());
        }

        tracing::debug!("reading {} bytes at offset {}", len, offset);

        if len <= self.buffer_size {
            return self.fetch(offset..end).await;
        }

        let mut buf = BytesMut::with_capacity(len);
        let mut start = offset;
        while start < end {
            let chunk_end = (start + self.buffer_size).min(end);
            buf.extend_from_slice(&self.fetch(start..chunk_end).await?);
            start = chunk_end;
        }
        Ok(buf.freeze())
    }

    /// 從游標位置讀取，遇到物件結尾會截短。
    pub async fn read(&mut self, len: usize) -> Result<Bytes> {
        let position = usize::try_from(self.position).unwrap_or(usize::MAX);
        if position >= self.size {
            return Ok(Bytes::new());
        }

        let bytes = self.read_at(position, len.min(self.size - position)).await?;
        self.position += bytes.len() as u64;
        Ok(bytes)
    }

    /// 可以移到物件結尾之後，但不能是負數位置。
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(offset) => (0, offset as i128),
            SeekFrom::Current(delta) => (self.position, delta as i128),
            SeekFrom::End(delta) => (self.size as u64, delta as i128),
        };

        let target = base as i128 + delta;
        if target < 0 {
            return Err(EtlError::InvalidSeek {
                message: format!("negative position {}", target),
            });
        }

        self.position = u64::try_from(target).map_err(|_| EtlError::InvalidSeek {
            message: format!("position {} overflows", target),
        })?;
        Ok(self.position)
    }

    pub fn close(self) -> ReadStatsSnapshot {
        let snapshot = self.stats.snapshot();
        tracing::info!("made {} calls", snapshot.calls);
        snapshot
    }

    async fn fetch(&self, range: Range<usize>) -> Result<Bytes> {
        let bytes = self.store.get_range(&self.location, range).await?;
        self.stats.record(bytes.len());
        Ok(bytes)
    }
}

impl AsyncFileReader for RangeReader {
    fn get_bytes(&mut self, range: Range<usize>) -> BoxFuture<'_, ParquetResult<Bytes>> {
        Box::pin(async move {
            if range.end < range.start {
                return Err(ParquetError::General(format!(
                    "invalid range {}..{}",
                    range.start, range.end
                )));
            }
            self.read_at(range.start, range.end - range.start)
                .await
                .map_err(|e| ParquetError::External(Box::new(e)))
        })
    }

    fn get_metadata(&mut self) -> BoxFuture<'_, ParquetResult<Arc<ParquetMetaData>>> {
        Box::pin(async move {
            let file_size = self.size;
            let hint = self.metadata_size_hint;
            let metadata = ParquetMetaDataReader::new()
                .with_prefetch_hint(hint)
                .load_and_finish(self, file_size)
                .await?;
            Ok(Arc::new(metadata))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use object_store::PutPayload;

    async fn reader_over(data: Vec<u8>) -> RangeReader {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let location = Path::from("bucket/object.bin");
        store
            .put(&location, PutPayload::from(data))
            .await
            .unwrap();
        let meta = store.head(&location).await.unwrap();
        RangeReader::new(store, &meta)
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_read_at_counts_calls() {
        let data = sample(100);
        let reader = reader_over(data.clone()).await;

        let bytes = reader.read_at(10, 20).await.unwrap();
        assert_eq!(&bytes[..], &data[10..30]);

        let empty = reader.read_at(100, 0).await.unwrap();
        assert!(empty.is_empty());

        let stats = reader.close();
        assert_eq!(stats.calls, 1);
        assert_eq!(stats.bytes, 20);
    }

    #[tokio::test]
    async fn test_large_reads_are_split_by_buffer_size() {
        let data = sample(1000);
        let reader = reader_over(data.clone()).await.with_buffer_size(300);
        let stats = reader.stats();

        let bytes = reader.read_at(0, 1000).await.unwrap();
        assert_eq!(&bytes[..], &data[..]);
        // ceil(1000 / 300)
        assert_eq!(stats.snapshot().calls, 4);
        assert_eq!(stats.snapshot().bytes, 1000);
    }

    #[tokio::test]
    async fn test_read_past_end_fails() {
        let reader = reader_over(sample(50)).await;
        let err = reader.read_at(40, 20).await.unwrap_err();
        assert!(matches!(
            err,
            EtlError::ReadOutOfRange {
                offset: 40,
                len: 20,
                size: 50
            }
        ));
        assert_eq!(reader.stats().snapshot().calls, 0);
    }

    #[tokio::test]
    async fn test_seek_and_read() {
        let data = sample(64);
        let mut reader = reader_over(data.clone()).await;
        assert_eq!(reader.size(), 64);

        assert_eq!(reader.seek(SeekFrom::Start(8)).unwrap(), 8);
        assert_eq!(reader.seek(SeekFrom::Current(4)).unwrap(), 12);
        let bytes = reader.read(4).await.unwrap();
        assert_eq!(&bytes[..], &data[12..16]);
        assert_eq!(reader.position(), 16);

        assert_eq!(reader.seek(SeekFrom::End(-6)).unwrap(), 58);
        let tail = reader.read(100).await.unwrap();
        assert_eq!(&tail[..], &data[58..]);
        assert!(reader.read(1).await.unwrap().is_empty());

        // 結尾之後可以 seek，但不能是負數
        assert_eq!(reader.seek(SeekFrom::End(10)).unwrap(), 74);
        assert!(reader.seek(SeekFrom::Current(-100)).is_err());
        assert_eq!(reader.position(), 74);
    }

    #[tokio::test]
    async fn test_get_bytes_maps_errors() {
        let mut reader = reader_over(sample(10)).await;
        let bytes = reader.get_bytes(2..6).await.unwrap();
        assert_eq!(bytes.len(), 4);
        assert!(matches!(
            reader.get_bytes(5..20).await,
            Err(ParquetError::External(_))
        ));
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let mut reader = reader_over(sample(10)).await;
        #[allow(clippy::reversed_empty_ranges)]
        let result = reader.get_bytes(6..2).await;
        assert!(matches!(result, Err(ParquetError::General(msg)) if msg.contains("6..2")));
        assert_eq!(reader.stats().snapshot().calls, 0);
    }
}
