use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),

    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Object '{name}' not found in {location}")]
    ObjectNotFound { name: String, location: String },

    #[error("Invalid parquet: {message}")]
    InvalidParquet { message: String },

    #[error("Read of {len} bytes at offset {offset} exceeds object size {size}")]
    ReadOutOfRange { offset: u64, len: usize, size: u64 },

    #[error("Invalid seek: {message}")]
    InvalidSeek { message: String },

    #[error("Column '{name}' not found in file schema")]
    ColumnNotFound { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Storage,
    Format,
    Io,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::UrlError(_) => ErrorCategory::Configuration,
            EtlError::ObjectStoreError(_) | EtlError::ObjectNotFound { .. } => {
                ErrorCategory::Storage
            }
            EtlError::ParquetError(_)
            | EtlError::ArrowError(_)
            | EtlError::InvalidParquet { .. }
            | EtlError::ColumnNotFound { .. } => ErrorCategory::Format,
            EtlError::IoError(_)
            | EtlError::ReadOutOfRange { .. }
            | EtlError::InvalidSeek { .. } => ErrorCategory::Io,
            EtlError::SerializationError(_) => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 遠端存取失敗通常可以重試
            EtlError::ObjectStoreError(_) => ErrorSeverity::Medium,
            EtlError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::ObjectStoreError(_) => {
                "Check network access and storage credentials (e.g. GOOGLE_SERVICE_ACCOUNT, AWS_ACCESS_KEY_ID), then retry".to_string()
            }
            EtlError::ObjectNotFound { name, location } => {
                format!("Verify that '{}' exists under {}", name, location)
            }
            EtlError::ParquetError(_) | EtlError::InvalidParquet { .. } => {
                "Make sure the source object is a valid Parquet file".to_string()
            }
            EtlError::ArrowError(_) => {
                "The decoded batches could not be assembled; check the source schema".to_string()
            }
            EtlError::ColumnNotFound { .. } => {
                "Run toml_etl --dry-run to list the available columns".to_string()
            }
            EtlError::IoError(_) => {
                "Check that the output directory exists and is writable".to_string()
            }
            EtlError::ReadOutOfRange { .. } | EtlError::InvalidSeek { .. } => {
                "The object may have changed during the read; retry the run".to_string()
            }
            EtlError::UrlError(_) => {
                "Use a URL like gs://bucket, s3://bucket/prefix or file:///path".to_string()
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Review the command line flags or the TOML configuration file".to_string()
            }
            EtlError::SerializationError(_) => "Re-run with --verbose for details".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Storage => format!("Could not access remote storage: {}", self),
            ErrorCategory::Format => format!("Could not decode the Parquet file: {}", self),
            ErrorCategory::Io => format!("I/O failure: {}", self),
            ErrorCategory::Processing => format!("Processing failed: {}", self),
        }
    }

    /// 依嚴重程度對應程序結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
