use crate::domain::model::{Extracted, LoadResult, ReadOptions, Table, WriteOptions};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 給日誌與摘要使用的完整輸出位置
    fn describe(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn source_url(&self) -> &str;
    fn object_name(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_file(&self) -> &str;
    fn read_options(&self) -> ReadOptions;
    fn write_options(&self) -> WriteOptions;
    /// 傳給 object store builder 的額外設定
    fn storage_options(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    fn source(&self) -> String;
    async fn extract(&self) -> Result<Extracted>;
    async fn transform(&self, data: Extracted) -> Result<Table>;
    async fn load(&self, table: Table) -> Result<LoadResult>;
}
