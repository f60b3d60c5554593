use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("No dated partition found for dimension '{dimension}'")]
    NoPartitionFound { dimension: String },

    #[error("Failed to load table from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: Box<EtlError>,
    },

    #[error("Transform failed for dimension '{dimension}': {message}")]
    Transform { dimension: String, message: String },

    #[error("Failed to persist table to {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: Box<EtlError>,
    },

    #[error("Storage {operation} failed for {path}: {message}")]
    StorageError {
        operation: &'static str,
        path: String,
        message: String,
    },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

/// Coarse classification used for logging and run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoPartition,
    Load,
    Transform,
    Persist,
    Config,
    Internal,
}

impl EtlError {
    pub fn transform(dimension: impl Into<String>, message: impl Into<String>) -> Self {
        EtlError::Transform {
            dimension: dimension.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::NoPartitionFound { .. } => ErrorKind::NoPartition,
            EtlError::Load { .. } => ErrorKind::Load,
            EtlError::Transform { .. } | EtlError::ProcessingError { .. } => ErrorKind::Transform,
            EtlError::Persist { .. } => ErrorKind::Persist,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorKind::Config,
            _ => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
