use std::sync::Arc;

use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use url::Url;

use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};

const CREDENTIAL_PREFIXES: &[&str] = &["google_", "aws_", "azure_"];

/// 一個 object store 以及它在 URL 中的 key 前綴。
#[derive(Debug, Clone)]
pub struct Bucket {
    url: String,
    store: Arc<dyn ObjectStore>,
    prefix: Path,
}

impl Bucket {
    /// 由 `gs://bucket`、`s3://bucket/prefix`、`file:///dir` 之類的 URL 開啟。
    ///
    /// 認證資訊從環境變數讀取 (例如 `GOOGLE_SERVICE_ACCOUNT`、`AWS_REGION`)，
    /// `options` 會覆蓋同名的環境設定。
    pub fn open(url: &str, options: &[(String, String)]) -> Result<Self> {
        let parsed = Url::parse(url)?;

        let env_options = std::env::vars()
            .map(|(key, value)| (key.to_ascii_lowercase(), value))
            .filter(|(key, _)| CREDENTIAL_PREFIXES.iter().any(|p| key.starts_with(p)));
        let explicit = options
            .iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), value.clone()));

        let (store, prefix) = object_store::parse_url_opts(&parsed, env_options.chain(explicit))?;
        tracing::debug!("Opened bucket {} (prefix '{}')", url, prefix);

        Ok(Self {
            url: url.to_string(),
            store: Arc::from(store),
            prefix,
        })
    }

    pub fn with_store(url: impl Into<String>, store: Arc<dyn ObjectStore>, prefix: Path) -> Self {
        Self {
            url: url.into(),
            store,
            prefix,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }

    /// 把相對 key 接到 bucket 前綴後面
    pub fn resolve(&self, name: &str) -> Path {
        let relative = Path::from(name);
        self.prefix.parts().chain(relative.parts()).collect()
    }

    /// 找出 `name` 對應的物件。先用 head 精確比對，找不到再列出上層目錄，
    /// 回傳第一個 key 包含 `name` 的物件。
    pub async fn locate(&self, name: &str) -> Result<ObjectMeta> {
        let location = self.resolve(name);

        match self.store.head(&location).await {
            Ok(meta) => return Ok(meta),
            Err(object_store::Error::NotFound { .. }) => {
                tracing::debug!("No exact match for {}, listing parent prefix", location);
            }
            Err(e) => return Err(e.into()),
        }

        let parts: Vec<_> = location.parts().collect();
        let parent: Path = parts[..parts.len().saturating_sub(1)]
            .iter()
            .cloned()
            .collect();
        let needle = location.as_ref();

        let mut listing = self.store.list(Some(&parent));
        while let Some(meta) = listing.try_next().await? {
            if meta.location.as_ref().contains(needle) {
                tracing::debug!("Matched {} by listing", meta.location);
                return Ok(meta);
            }
        }

        Err(EtlError::ObjectNotFound {
            name: name.to_string(),
            location: self.url.clone(),
        })
    }
}

impl Storage for Bucket {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = self.store.get(&self.resolve(path)).await?.bytes().await?;
        Ok(data.to_vec())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.store
            .put(&self.resolve(path), PutPayload::from(data.to_vec()))
            .await?;
        Ok(())
    }

    fn describe(&self, path: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), path)
    }
}
