pub mod etl;
pub mod pipeline;

pub use crate::domain::model::{Extracted, LoadResult, RunSummary, Table};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
