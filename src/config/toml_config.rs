use crate::core::ConfigProvider;
use crate::domain::model::{
    ReadOptions, WriteOptions, DEFAULT_BATCHES, DEFAULT_BATCH_SIZE, DEFAULT_BUFFER_SIZE,
    DEFAULT_METADATA_SIZE_HINT,
};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub read: ReadConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    pub object: String,
    /// object store builder 設定，例如 `google_service_account` 或 `aws_region`
    pub options: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadConfig {
    pub batch_size: Option<usize>,
    pub batches: Option<usize>,
    pub buffer_size: Option<usize>,
    pub metadata_size_hint: Option<usize>,
    pub columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_file: Option<String>,
    pub compression: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GCS_BUCKET})，任何未設定的變數都視為缺少的配置
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        if let Some(missing) = re
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .find(|var_name| std::env::var(var_name).is_err())
        {
            return Err(EtlError::MissingConfigError { field: missing });
        }

        let result = re.replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        use crate::utils::validation::*;

        validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validate_storage_url("source.url", &self.source.url)?;
        validate_non_empty_string("source.object", &self.source.object)?;
        super::validate_output("load.output_path", &self.load.output_path, self.resolved_output_file())?;
        super::validate_read_options(&self.read_options())?;
        validate_compression("load.compression", &self.write_options().compression)?;

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }

    fn resolved_output_file(&self) -> &str {
        self.load
            .output_file
            .as_deref()
            .unwrap_or(super::DEFAULT_OUTPUT_FILE)
    }
}

impl ConfigProvider for TomlConfig {
    fn source_url(&self) -> &str {
        &self.source.url
    }

    fn object_name(&self) -> &str {
        &self.source.object
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_file(&self) -> &str {
        self.resolved_output_file()
    }

    fn read_options(&self) -> ReadOptions {
        ReadOptions {
            batch_size: self.read.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            batches: self.read.batches.unwrap_or(DEFAULT_BATCHES),
            buffer_size: self.read.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE),
            metadata_size_hint: Some(
                self.read
                    .metadata_size_hint
                    .unwrap_or(DEFAULT_METADATA_SIZE_HINT),
            ),
            columns: self.read.columns.clone().unwrap_or_default(),
        }
    }

    fn write_options(&self) -> WriteOptions {
        self.load
            .compression
            .as_ref()
            .map(|compression| WriteOptions {
                compression: compression.clone(),
            })
            .unwrap_or_default()
    }

    fn storage_options(&self) -> Vec<(String, String)> {
        self.source
            .options
            .as_ref()
            .map(|options| {
                options
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
