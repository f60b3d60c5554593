use crate::core::codec;
use crate::domain::model::{PartitionPath, Table};
use crate::domain::ports::{Storage, TabularSource};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;

/// Key conventions for raw exports and cleaned outputs:
/// `{raw}/dim_{name}/date=YYYY-MM-DD/dim_{name}.csv` in,
/// `{clean}/dim_{name}/date=YYYY-MM-DD/dim_{name}.parquet` out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLayout {
    raw_prefix: String,
    clean_prefix: String,
}

impl PathLayout {
    pub fn new(raw_prefix: impl Into<String>, clean_prefix: impl Into<String>) -> Self {
        Self {
            raw_prefix: raw_prefix.into(),
            clean_prefix: clean_prefix.into(),
        }
    }

    pub fn raw_dimension_prefix(&self, dimension: &str) -> String {
        format!("{}/dim_{}/", self.raw_prefix, dimension)
    }

    pub fn raw_file(&self, partition: &PartitionPath, dimension: &str) -> String {
        format!("{}/dim_{}.csv", partition.as_str(), dimension)
    }

    pub fn clean_file(&self, partition: &PartitionPath, dimension: &str) -> String {
        format!(
            "{}/dim_{}/{}/dim_{}.parquet",
            self.clean_prefix,
            dimension,
            partition.date_segment(),
            dimension
        )
    }
}

impl Default for PathLayout {
    fn default() -> Self {
        Self::new("raw", "clean")
    }
}

/// Tabular access on top of byte storage: CSV in, Parquet out.
#[derive(Debug, Clone)]
pub struct StorageSource<S: Storage> {
    storage: S,
    layout: PathLayout,
}

impl<S: Storage> StorageSource<S> {
    pub fn new(storage: S, layout: PathLayout) -> Self {
        Self { storage, layout }
    }
}

#[async_trait]
impl<S: Storage> TabularSource for StorageSource<S> {
    fn layout(&self) -> &PathLayout {
        &self.layout
    }

    async fn list_candidate_partitions(&self, dimension: &str) -> Result<Vec<String>> {
        let prefix = self.layout.raw_dimension_prefix(dimension);
        let entries = self
            .storage
            .list(&prefix)
            .await
            .map_err(|e| EtlError::Load {
                path: prefix.clone(),
                source: Box::new(e),
            })?;
        tracing::debug!("Listed {} entries under {}", entries.len(), prefix);
        Ok(entries)
    }

    async fn load_table(&self, path: &str) -> Result<Table> {
        let load_error = |e: EtlError| EtlError::Load {
            path: path.to_string(),
            source: Box::new(e),
        };

        let data = self.storage.read_file(path).await.map_err(load_error)?;
        let table = codec::decode_csv(&data).map_err(load_error)?;
        tracing::info!("Read {} rows from {}", table.num_rows(), path);
        Ok(table)
    }

    async fn persist_table(&self, table: &Table, path: &str) -> Result<()> {
        let persist_error = |e: EtlError| EtlError::Persist {
            path: path.to_string(),
            source: Box::new(e),
        };

        let data = codec::encode_parquet(table).map_err(persist_error)?;
        tracing::debug!("Writing {} bytes of parquet to {}", data.len(), path);
        self.storage
            .write_file(path, &data)
            .await
            .map_err(persist_error)?;
        tracing::info!("Wrote {} rows to {}", table.num_rows(), path);
        Ok(())
    }
}
