use crate::domain::model::{PartitionPath, DATE_TOKEN};
use crate::utils::error::{EtlError, Result};

/// Picks the newest `date=YYYY-MM-DD` partition among listing results.
///
/// Only candidates containing `date=` are considered. Candidates whose token is
/// malformed rank below every well-formed one and are never returned. Among
/// equal dates the first candidate in input order wins.
pub fn resolve<S: AsRef<str>>(dimension: &str, candidates: &[S]) -> Result<PartitionPath> {
    let mut latest: Option<PartitionPath> = None;
    let mut skipped = 0usize;

    for candidate in candidates.iter().map(AsRef::as_ref) {
        if !candidate.contains(DATE_TOKEN) {
            continue;
        }

        let Some(partition) = PartitionPath::parse(candidate) else {
            skipped += 1;
            tracing::warn!(
                "Ignoring partition with malformed date token for '{}': {}",
                dimension,
                candidate
            );
            continue;
        };

        match &latest {
            Some(current) if partition.date() <= current.date() => {}
            _ => latest = Some(partition),
        }
    }

    match latest {
        Some(partition) => {
            tracing::debug!(
                "Resolved '{}' to {} ({} candidates, {} malformed)",
                dimension,
                partition,
                candidates.len(),
                skipped
            );
            Ok(partition)
        }
        None => Err(EtlError::NoPartitionFound {
            dimension: dimension.to_string(),
        }),
    }
}
