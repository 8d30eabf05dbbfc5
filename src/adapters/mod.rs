// Adapters layer: concrete implementations for external systems (object storage, parquet I/O).

pub mod bucket;
pub mod range_reader;

pub use bucket::Bucket;
pub use range_reader::{RangeReader, ReadStats};
