pub mod cli;
#[cfg(feature = "lambda")]
pub mod lambda;
#[cfg(feature = "s3")]
pub mod s3;
pub mod toml_config;

use crate::core::source::PathLayout;
use crate::core::transforms::Dimension;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use std::path::PathBuf;
use toml_config::TomlConfig;
use url::Url;

pub const DEFAULT_STORAGE: &str = "./data";
pub const DEFAULT_RAW_PREFIX: &str = "raw";
pub const DEFAULT_CLEAN_PREFIX: &str = "clean";

#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "dimension-etl")]
#[command(about = "Cleans the latest raw dimension exports into dated parquet partitions")]
pub struct CliConfig {
    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Local directory, file:// or s3://bucket[/prefix] URI")]
    pub storage: Option<String>,

    #[arg(long, help = "AWS region for s3:// storage, defaults to the AWS config chain")]
    pub region: Option<String>,

    #[arg(long, value_delimiter = ',', help = "Dimensions to process, in order")]
    pub dimensions: Vec<String>,

    #[arg(long)]
    pub raw_prefix: Option<String>,

    #[arg(long)]
    pub clean_prefix: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Merges flags over the optional config file over built-in defaults.
    pub fn into_settings(self) -> Result<Settings> {
        let file = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        let mut settings = Settings::from_toml(file);

        if let Some(storage) = self.storage {
            settings.storage_uri = storage;
        }
        if self.region.is_some() {
            settings.region = self.region;
        }
        if !self.dimensions.is_empty() {
            settings.dimensions = self.dimensions;
        }
        if let Some(raw_prefix) = self.raw_prefix {
            settings.raw_prefix = raw_prefix;
        }
        if let Some(clean_prefix) = self.clean_prefix {
            settings.clean_prefix = clean_prefix;
        }
        settings.verbose = self.verbose;
        Ok(settings)
    }
}

/// Where the raw and clean zones live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    Local(PathBuf),
    S3 { bucket: String, prefix: String },
}

impl StorageTarget {
    pub fn parse(uri: &str) -> Result<Self> {
        if !uri.contains("://") {
            return Ok(StorageTarget::Local(PathBuf::from(uri)));
        }

        let url = Url::parse(uri).map_err(|e| EtlError::InvalidConfigValueError {
            field: "storage.uri".to_string(),
            value: uri.to_string(),
            reason: format!("Invalid URI format: {}", e),
        })?;

        match url.scheme() {
            "file" => url
                .to_file_path()
                .map(StorageTarget::Local)
                .map_err(|_| EtlError::InvalidConfigValueError {
                    field: "storage.uri".to_string(),
                    value: uri.to_string(),
                    reason: "file:// URI must be an absolute path".to_string(),
                }),
            "s3" => {
                let bucket = url.host_str().unwrap_or_default().to_string();
                validation::validate_non_empty_string("storage.uri", &bucket)?;
                Ok(StorageTarget::S3 {
                    bucket,
                    prefix: url.path().trim_matches('/').to_string(),
                })
            }
            scheme => Err(EtlError::InvalidConfigValueError {
                field: "storage.uri".to_string(),
                value: uri.to_string(),
                reason: format!("Unsupported storage scheme: {}", scheme),
            }),
        }
    }
}

/// Fully resolved run settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub storage_uri: String,
    pub region: Option<String>,
    pub dimensions: Vec<String>,
    pub raw_prefix: String,
    pub clean_prefix: String,
    pub log_level: Option<String>,
    pub json_logs: bool,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_uri: DEFAULT_STORAGE.to_string(),
            region: None,
            dimensions: Dimension::ALL.iter().map(|d| d.to_string()).collect(),
            raw_prefix: DEFAULT_RAW_PREFIX.to_string(),
            clean_prefix: DEFAULT_CLEAN_PREFIX.to_string(),
            log_level: None,
            json_logs: false,
            verbose: false,
        }
    }
}

impl Settings {
    pub fn from_toml(file: TomlConfig) -> Self {
        let mut settings = Settings::default();

        if let Some(storage) = file.storage {
            if let Some(uri) = storage.uri {
                settings.storage_uri = uri;
            }
            settings.region = storage.region;
        }
        if let Some(pipeline) = file.pipeline {
            if let Some(dimensions) = pipeline.dimensions {
                settings.dimensions = dimensions;
            }
            if let Some(raw_prefix) = pipeline.raw_prefix {
                settings.raw_prefix = raw_prefix;
            }
            if let Some(clean_prefix) = pipeline.clean_prefix {
                settings.clean_prefix = clean_prefix;
            }
        }
        if let Some(logging) = file.logging {
            settings.log_level = logging.level;
            settings.json_logs = logging.json.unwrap_or(false);
        }
        settings
    }

    pub fn layout(&self) -> PathLayout {
        PathLayout::new(self.raw_prefix.clone(), self.clean_prefix.clone())
    }

    pub fn parsed_dimensions(&self) -> Result<Vec<Dimension>> {
        self.dimensions.iter().map(|d| d.parse()).collect()
    }

    pub fn storage_target(&self) -> Result<StorageTarget> {
        StorageTarget::parse(&self.storage_uri)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_storage_uri("storage.uri", &self.storage_uri)?;
        validation::validate_key_prefix("pipeline.raw_prefix", &self.raw_prefix)?;
        validation::validate_key_prefix("pipeline.clean_prefix", &self.clean_prefix)?;

        if self.dimensions.is_empty() {
            return Err(EtlError::ConfigValidationError {
                field: "pipeline.dimensions".to_string(),
                message: "At least one dimension must be configured".to_string(),
            });
        }
        let dimensions = self.parsed_dimensions()?;
        let names: Vec<String> = dimensions.iter().map(|d| d.to_string()).collect();
        validation::validate_unique("pipeline.dimensions", &names)?;

        if let StorageTarget::S3 { .. } = self.storage_target()? {
            if cfg!(not(feature = "s3")) {
                return Err(EtlError::ConfigError {
                    message: "s3:// storage requires the 's3' feature".to_string(),
                });
            }
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}
