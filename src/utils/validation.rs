use crate::utils::error::{EtlError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Accepts a local path, a `file://` URI or an `s3://bucket[/prefix]` URI.
pub fn validate_storage_uri(field_name: &str, uri: &str) -> Result<()> {
    validate_path(field_name, uri)?;

    if !uri.contains("://") {
        return Ok(());
    }

    match Url::parse(uri) {
        Ok(url) => match url.scheme() {
            "file" => Ok(()),
            "s3" => match url.host_str() {
                Some(bucket) if !bucket.is_empty() => Ok(()),
                _ => Err(EtlError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: uri.to_string(),
                    reason: "S3 URI must name a bucket".to_string(),
                }),
            },
            scheme => Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: uri.to_string(),
                reason: format!("Unsupported storage scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: uri.to_string(),
            reason: format!("Invalid URI format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// Key prefixes are joined with `/`, so they must be relative and non-empty.
pub fn validate_key_prefix(field_name: &str, prefix: &str) -> Result<()> {
    validate_non_empty_string(field_name, prefix)?;

    if prefix.starts_with('/') || prefix.ends_with('/') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: prefix.to_string(),
            reason: "Prefix cannot start or end with '/'".to_string(),
        });
    }

    Ok(())
}

pub fn validate_unique(field_name: &str, values: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value.as_str()) {
            return Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: value.clone(),
                reason: "Value listed more than once".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| EtlError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}
