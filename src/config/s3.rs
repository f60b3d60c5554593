use crate::core::Storage;
use crate::utils::error::{EtlError, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client as S3Client;

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    /// `prefix` roots every key inside the bucket; empty means the bucket root.
    pub fn new(client: S3Client, bucket: String, prefix: String) -> Self {
        Self {
            client,
            bucket,
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    /// Builds a client from the default AWS credential chain, once per process.
    pub async fn connect(bucket: String, prefix: String, region: Option<String>) -> Self {
        let shared = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared).force_path_style(true);
        if let Some(region) = region {
            builder = builder.region(Region::new(region));
        }
        tracing::info!("S3 client initialised for bucket {}", bucket);
        Self::new(S3Client::from_conf(builder.build()), bucket, prefix)
    }

    fn key(&self, path: &str) -> String {
        if self.prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.prefix, path)
        }
    }

    fn relative<'a>(&self, key: &'a str) -> &'a str {
        if self.prefix.is_empty() {
            return key;
        }
        key.strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(key)
    }
}

fn storage_error<E: std::error::Error>(operation: &'static str, path: &str, err: E) -> EtlError {
    EtlError::StorageError {
        operation,
        path: path.to_string(),
        message: DisplayErrorContext(err).to_string(),
    }
}

impl Storage for S3Storage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.key(path))
            .send()
            .await
            .map_err(|e| storage_error("read", path, e))?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| storage_error("read", path, e))?;

        Ok(data.into_bytes().to_vec())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.key(path))
            .body(data.to_vec().into())
            .send()
            .await
            .map_err(|e| storage_error("write", path, e))?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let full_prefix = self.key(prefix);
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&full_prefix)
                .delimiter("/")
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| storage_error("list", prefix, e))?;

            for common in resp.common_prefixes() {
                if let Some(p) = common.prefix() {
                    keys.push(self.relative(p.trim_end_matches('/')).to_string());
                }
            }
            for object in resp.contents() {
                if let Some(key) = object.key() {
                    keys.push(self.relative(key).to_string());
                }
            }

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated() == Some(true) => {
                    continuation = Some(token.to_string())
                }
                _ => break,
            }
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(prefix: &str) -> S3Storage {
        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        S3Storage::new(
            S3Client::from_conf(config),
            "bucket".to_string(),
            prefix.to_string(),
        )
    }

    #[test]
    fn test_keys_are_rooted_at_prefix() {
        let s3 = storage("/restaurant/");
        assert_eq!(s3.key("raw/dim_tables/"), "restaurant/raw/dim_tables/");
        assert_eq!(
            s3.relative("restaurant/raw/dim_tables/date=2024-06-01"),
            "raw/dim_tables/date=2024-06-01"
        );

        let root = storage("");
        assert_eq!(root.key("raw/dim_tables/"), "raw/dim_tables/");
        assert_eq!(root.relative("raw/x"), "raw/x");
    }
}
