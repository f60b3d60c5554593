use crate::domain::model::{Column, Table};
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;

/// Left join of `primary` with `lookup` on `key`.
///
/// Every primary row is kept, in order, and the row count never changes: the
/// first lookup row per key wins and unmatched or null keys yield nulls. The
/// lookup's non-key columns are appended after the primary columns. Keys are
/// compared by their text rendering.
pub fn left_join(dimension: &str, primary: Table, lookup: &Table, key: &str) -> Result<Table> {
    let primary_key = primary.column(key).ok_or_else(|| {
        EtlError::transform(dimension, format!("join key '{}' missing from primary table", key))
    })?;
    let lookup_key = lookup.column(key).ok_or_else(|| {
        EtlError::transform(dimension, format!("join key '{}' missing from lookup table", key))
    })?;

    if let Some(clash) = lookup
        .columns()
        .iter()
        .find(|c| c.name != key && primary.has_column(&c.name))
    {
        return Err(EtlError::transform(
            dimension,
            format!("lookup column '{}' already exists in primary table", clash.name),
        ));
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    for (row, value) in lookup_key.data.to_text().into_iter().enumerate() {
        if let Some(value) = value {
            index.entry(value).or_insert(row);
        }
    }

    let positions: Vec<Option<usize>> = primary_key
        .data
        .to_text()
        .iter()
        .map(|value| value.as_ref().and_then(|v| index.get(v).copied()))
        .collect();

    let matched = positions.iter().filter(|p| p.is_some()).count();
    tracing::debug!(
        "Joined '{}' on '{}': {} of {} rows matched",
        dimension,
        key,
        matched,
        positions.len()
    );

    lookup
        .columns()
        .iter()
        .filter(|c| c.name != key)
        .try_fold(primary, |table, column| {
            table.with_column(Column::new(column.name.clone(), column.data.take(&positions)))
        })
        .map_err(|message| EtlError::transform(dimension, message))
}
