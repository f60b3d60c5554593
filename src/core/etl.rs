use crate::core::partition;
use crate::core::transforms::{AuxiliaryTables, Dimension, DimensionTransform};
use crate::domain::model::{PartitionPath, Table, TransformResult};
use crate::domain::ports::TabularSource;
use crate::utils::error::{ErrorKind, EtlError, Result};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Clone, Serialize)]
pub struct DimensionOutcome {
    pub dimension: String,
    pub succeeded: bool,
    pub destination: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<DimensionOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs resolve, load, transform and persist for each dimension in turn.
pub struct EtlEngine<T: TabularSource> {
    source: T,
}

impl<T: TabularSource> EtlEngine<T> {
    pub fn new(source: T) -> Self {
        Self { source }
    }

    pub async fn resolve_latest(&self, dimension: &str) -> Result<PartitionPath> {
        let candidates = self.source.list_candidate_partitions(dimension).await?;
        partition::resolve(dimension, &candidates)
    }

    /// Resolves the newest partition of `dimension` and loads its export.
    pub async fn load_latest(&self, dimension: &str) -> Result<(PartitionPath, Table)> {
        let partition = self.resolve_latest(dimension).await?;
        tracing::info!("Latest partition for '{}': {}", dimension, partition);

        let table = self
            .source
            .load_table(&self.source.layout().raw_file(&partition, dimension))
            .await?;
        Ok((partition, table))
    }

    pub async fn transform(&self, dimension: Dimension) -> Result<TransformResult> {
        let name = dimension.name();
        let (partition, primary) = self.load_latest(name).await?;

        let mut auxiliary = AuxiliaryTables::new();
        for aux in dimension.auxiliary() {
            let (aux_partition, table) = self.load_latest(aux).await?;
            tracing::debug!("Loaded auxiliary '{}' from {}", aux, aux_partition);
            auxiliary.insert(*aux, table);
        }

        let table = apply_isolated(&dimension, primary, &auxiliary)?;
        tracing::info!(
            "Transformed '{}': {} rows, {} columns",
            name,
            table.num_rows(),
            table.num_columns()
        );

        Ok(TransformResult { table, partition })
    }

    /// Processes one dimension end to end and returns the destination key.
    pub async fn process(&self, dimension: Dimension) -> Result<String> {
        let name = dimension.name();
        let result = self.transform(dimension).await?;
        let destination = self.source.layout().clean_file(&result.partition, name);

        if let Err(e) = self.source.persist_table(&result.table, &destination).await {
            tracing::error!("❌ Write failed for '{}' at {}: {}", name, destination, e);
            return Err(e);
        }
        Ok(destination)
    }

    /// Runs every dimension, isolating failures so the rest still run.
    pub async fn run(&self, dimensions: &[Dimension]) -> RunReport {
        tracing::info!("Starting dimension pipeline for {} dimensions", dimensions.len());
        let mut report = RunReport::default();

        for &dimension in dimensions {
            tracing::info!("Processing dimension '{}'", dimension);

            let outcome = match self.process(dimension).await {
                Ok(destination) => {
                    tracing::info!("✅ Dimension '{}' written to {}", dimension, destination);
                    DimensionOutcome {
                        dimension: dimension.to_string(),
                        succeeded: true,
                        destination: Some(destination),
                        error: None,
                        error_kind: None,
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "❌ Dimension '{}' failed ({:?}): {}",
                        dimension,
                        e.kind(),
                        e
                    );
                    DimensionOutcome {
                        dimension: dimension.to_string(),
                        succeeded: false,
                        destination: None,
                        error: Some(e.to_string()),
                        error_kind: Some(e.kind()),
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        tracing::info!(
            "Pipeline finished: {} dimensions succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }
}

/// Applies `transform`, turning a panic into a `Transform` error for that dimension.
pub fn apply_isolated<D: DimensionTransform>(
    transform: &D,
    primary: Table,
    auxiliary: &AuxiliaryTables,
) -> Result<Table> {
    panic::catch_unwind(AssertUnwindSafe(|| transform.apply(primary, auxiliary))).map_err(
        |payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            EtlError::transform(transform.name(), format!("transform panicked: {}", message))
        },
    )?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::tests::MockStorage;
    use crate::core::source::{PathLayout, StorageSource};
    use crate::domain::model::Column;

    const CUSTOMERS_CSV: &str = "id,type,attributes.name,attributes.createdAt,attributes.discountPercentage\n\
        1,customers,Ana,2024-06-01T00:05:00Z,10\n\
        2,customers,Luis,2024-06-01T12:00:00Z,abc\n";

    const TABLES_CSV: &str = "id,type,attributes.size,attributes.shape,relationships.room.data.id\n\
        1,tables,s,0,1\n";

    fn engine(storage: MockStorage) -> EtlEngine<StorageSource<MockStorage>> {
        EtlEngine::new(StorageSource::new(storage, PathLayout::default()))
    }

    #[tokio::test]
    async fn test_process_writes_latest_partition() {
        let storage = MockStorage::new();
        storage
            .put("raw/dim_customers/date=2024-05-31/dim_customers.csv", "id\n9\n")
            .await;
        storage
            .put("raw/dim_customers/date=2024-06-01/dim_customers.csv", CUSTOMERS_CSV)
            .await;

        let destination = engine(storage.clone())
            .process(Dimension::Customers)
            .await
            .unwrap();

        assert_eq!(
            destination,
            "clean/dim_customers/date=2024-06-01/dim_customers.parquet"
        );
        assert!(storage.get_file(&destination).await.is_some());
    }

    #[tokio::test]
    async fn test_transform_keeps_partition() {
        let storage = MockStorage::new();
        storage
            .put("raw/dim_tables/date=2024-06-01/dim_tables.csv", TABLES_CSV)
            .await;

        let result = engine(storage).transform(Dimension::Tables).await.unwrap();
        assert_eq!(result.partition.date_segment(), "date=2024-06-01");
        assert_eq!(result.table.num_rows(), 1);
    }

    #[tokio::test]
    async fn test_employees_require_roles_partition() {
        let storage = MockStorage::new();
        storage
            .put(
                "raw/dim_users/date=2024-06-01/dim_users.csv",
                "id,relationships.role.data.id\n1,7\n",
            )
            .await;

        let err = engine(storage).process(Dimension::Employees).await.unwrap_err();
        match err {
            EtlError::NoPartitionFound { dimension } => assert_eq!(dimension, "user_roles"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_run_continues_after_failure() {
        let storage = MockStorage::new();
        storage
            .put("raw/dim_tables/date=2024-06-01/dim_tables.csv", TABLES_CSV)
            .await;

        let report = engine(storage)
            .run(&[Dimension::Customers, Dimension::Tables])
            .await;

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.all_succeeded());
        assert_eq!(report.outcomes[0].error_kind, Some(ErrorKind::NoPartition));
        assert_eq!(
            report.outcomes[1].destination.as_deref(),
            Some("clean/dim_tables/date=2024-06-01/dim_tables.parquet")
        );
    }

    #[tokio::test]
    async fn test_run_reports_persist_failure() {
        let storage = MockStorage::failing_writes();
        storage
            .put("raw/dim_tables/date=2024-06-01/dim_tables.csv", TABLES_CSV)
            .await;

        let report = engine(storage).run(&[Dimension::Tables]).await;
        assert_eq!(report.failed(), 1);
        assert_eq!(report.outcomes[0].error_kind, Some(ErrorKind::Persist));
    }

    struct ExplodingTransform;

    impl DimensionTransform for ExplodingTransform {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn apply(&self, primary: Table, _auxiliary: &AuxiliaryTables) -> Result<Table> {
            let rows = primary.num_rows();
            panic!("row index {} out of bounds", rows);
        }
    }

    #[test]
    fn test_panicking_transform_becomes_transform_error() {
        let primary = Table::from_columns(vec![Column::text("id", vec![Some("1")])]).unwrap();

        let err = apply_isolated(&ExplodingTransform, primary, &AuxiliaryTables::new()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transform);
        assert!(err.to_string().contains("transform panicked"));
        assert!(err.to_string().contains("row index 1 out of bounds"));
        match err {
            EtlError::Transform { dimension, .. } => assert_eq!(dimension, "exploding"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_apply_isolated_keeps_transform_errors() {
        let primary = Table::from_columns(vec![Column::text("id", vec![Some("1")])]).unwrap();

        let table = apply_isolated(&Dimension::Tables, primary, &AuxiliaryTables::new());
        assert!(matches!(table, Err(EtlError::Transform { .. })));
    }

    #[tokio::test]
    async fn test_report_serializes_outcomes() {
        let storage = MockStorage::new();
        storage
            .put("raw/dim_tables/date=2024-06-01/dim_tables.csv", TABLES_CSV)
            .await;

        let report = engine(storage).run(&[Dimension::Customers, Dimension::Tables]).await;
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["outcomes"][0]["dimension"], "customers");
        assert_eq!(json["outcomes"][0]["error_kind"], "no_partition");
        assert_eq!(json["outcomes"][1]["succeeded"], true);
    }
}
