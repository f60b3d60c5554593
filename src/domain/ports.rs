use crate::core::source::PathLayout;
use crate::domain::model::Table;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Byte-level object storage addressed by `/`-separated keys.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Immediate children of `prefix`, returned as full keys without a trailing `/`.
    /// A prefix that does not exist lists as empty.
    fn list(&self, prefix: &str) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

#[async_trait]
pub trait TabularSource: Send + Sync {
    /// Key conventions the source lists and writes under.
    fn layout(&self) -> &PathLayout;
    async fn list_candidate_partitions(&self, dimension: &str) -> Result<Vec<String>>;
    async fn load_table(&self, path: &str) -> Result<Table>;
    async fn persist_table(&self, table: &Table, path: &str) -> Result<()>;
}
