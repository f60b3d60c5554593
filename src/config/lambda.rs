use crate::config::Settings;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use std::env;

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaConfig {
    pub s3_bucket: String,
    pub s3_prefix: String,
    pub s3_region: Option<String>,
    pub dimensions: Vec<String>,
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`LambdaConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bucket = lookup("S3_BUCKET");
        let s3_bucket = validation::validate_required_field("S3_BUCKET", &bucket)?.clone();

        let dimensions = lookup("DIMENSIONS")
            .map(|raw| {
                raw.split(',')
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| Settings::default().dimensions);

        Ok(Self {
            s3_bucket,
            s3_prefix: lookup("S3_PREFIX").unwrap_or_default(),
            s3_region: lookup("S3_REGION"),
            dimensions,
        })
    }

    pub fn settings(&self) -> Settings {
        let prefix = self.s3_prefix.trim_matches('/');
        let storage_uri = if prefix.is_empty() {
            format!("s3://{}", self.s3_bucket)
        } else {
            format!("s3://{}/{}", self.s3_bucket, prefix)
        };

        Settings {
            storage_uri,
            region: self.s3_region.clone(),
            dimensions: self.dimensions.clone(),
            json_logs: true,
            ..Settings::default()
        }
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validate_s3_bucket_name("S3_BUCKET", &self.s3_bucket)?;
        self.settings().validate()?;

        tracing::info!("✅ Lambda configuration validation passed");
        Ok(())
    }
}

fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    if bucket_name.len() < 3 || bucket_name.len() > 63 {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "S3 bucket name must be between 3 and 63 characters".to_string(),
        });
    }

    if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots"
                .to_string(),
        });
    }

    if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "S3 bucket name cannot start or end with a hyphen".to_string(),
        });
    }

    Ok(())
}
