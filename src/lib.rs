pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{Bucket, RangeReader};
pub use config::{cli::LocalStorage, toml_config::TomlConfig, CliConfig};
pub use crate::core::{etl::EtlEngine, pipeline::ParquetPipeline};
pub use utils::error::{EtlError, Result};
