//! Column rewrite rules shared by every dimension transform.
//!
//! A [`RuleSet`] runs its steps in a fixed order, each producing a new table:
//! prefix rewrite, rename, drop, type coercion, derivation, discard, value
//! translation and finally text normalisation of every column no earlier step
//! gave a type to.

use crate::domain::model::{Column, ColumnData, ColumnType, Table};
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, Timelike, Utc};
use std::collections::HashSet;

/// Target type of a coercion. Values that fail to parse become null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Integer,
    Decimal,
    Boolean,
    /// Naive inputs are read as UTC, then shifted to this fixed offset.
    Timestamp { utc_offset_secs: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivation {
    /// `YYYYMMDD` date key and minutes-since-midnight time key of a timestamp
    /// column, in the timestamp's own offset. A time key of 0 is stored as 1.
    DateTimeKeys {
        source: &'static str,
        date_key: &'static str,
        time_key: &'static str,
    },
}

#[derive(Debug, Clone)]
struct Translation {
    column: &'static str,
    values: &'static [(&'static str, &'static str)],
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    dimension: &'static str,
    prefixes: Vec<(&'static str, &'static str)>,
    renames: Vec<(&'static str, &'static str)>,
    drops: Vec<&'static str>,
    coercions: Vec<(&'static str, Coercion)>,
    derivations: Vec<Derivation>,
    discards: Vec<&'static str>,
    translations: Vec<Translation>,
}

impl RuleSet {
    pub fn new(dimension: &'static str) -> Self {
        Self {
            dimension,
            prefixes: Vec::new(),
            renames: Vec::new(),
            drops: Vec::new(),
            coercions: Vec::new(),
            derivations: Vec::new(),
            discards: Vec::new(),
            translations: Vec::new(),
        }
    }

    /// Removes every occurrence of `prefix` from column names.
    pub fn strip_prefix(self, prefix: &'static str) -> Self {
        self.replace_prefix(prefix, "")
    }

    /// Textual substring replacement on column names; collisions are not detected.
    pub fn replace_prefix(mut self, prefix: &'static str, replacement: &'static str) -> Self {
        self.prefixes.push((prefix, replacement));
        self
    }

    pub fn rename(mut self, from: &'static str, to: &'static str) -> Self {
        self.renames.push((from, to));
        self
    }

    pub fn drop_columns(mut self, names: &[&'static str]) -> Self {
        self.drops.extend_from_slice(names);
        self
    }

    pub fn coerce(mut self, column: &'static str, coercion: Coercion) -> Self {
        self.coercions.push((column, coercion));
        self
    }

    pub fn derive(mut self, derivation: Derivation) -> Self {
        self.derivations.push(derivation);
        self
    }

    /// Columns removed once derivations have consumed them.
    pub fn discard_after_derive(mut self, names: &[&'static str]) -> Self {
        self.discards.extend_from_slice(names);
        self
    }

    /// The column must exist when the rule set runs.
    pub fn translate(
        mut self,
        column: &'static str,
        values: &'static [(&'static str, &'static str)],
    ) -> Self {
        self.translations.push(Translation { column, values });
        self
    }

    pub fn apply(&self, table: Table) -> Result<Table> {
        let table = self.rewrite_prefixes(table);
        let table = self.apply_renames(table);
        let table = self.drops.iter().fold(table, |t, name| t.drop_column(name));

        let mut typed: HashSet<&str> = HashSet::new();

        let mut table = table;
        for (column, coercion) in &self.coercions {
            if !table.has_column(column) {
                continue;
            }
            let offset = coercion_offset(self.dimension, coercion)?;
            table = table.map_column(column, |data| coerce(data, *coercion, offset));
            typed.insert(*column);
        }

        for derivation in &self.derivations {
            table = self.derive_columns(table, derivation, &mut typed)?;
        }

        let table = self.discards.iter().fold(table, |t, name| t.drop_column(name));

        let table = self.apply_translations(table)?;

        Ok(stringify_untyped(table, &typed))
    }

    fn rewrite_prefixes(&self, table: Table) -> Table {
        if self.prefixes.is_empty() {
            return table;
        }
        table.map_column_names(|name| {
            self.prefixes
                .iter()
                .fold(name.to_string(), |acc, (from, to)| acc.replace(from, to))
        })
    }

    fn apply_renames(&self, table: Table) -> Table {
        if self.renames.is_empty() {
            return table;
        }
        table.map_column_names(|name| {
            self.renames
                .iter()
                .find(|(from, _)| *from == name)
                .map(|(_, to)| to.to_string())
                .unwrap_or_else(|| name.to_string())
        })
    }

    fn derive_columns<'a>(
        &self,
        table: Table,
        derivation: &'a Derivation,
        typed: &mut HashSet<&'a str>,
    ) -> Result<Table> {
        match derivation {
            Derivation::DateTimeKeys {
                source,
                date_key,
                time_key,
            } => {
                let Some(column) = table.column(source) else {
                    tracing::debug!(
                        "Skipping date/time keys for '{}': column '{}' not present",
                        self.dimension,
                        source
                    );
                    return Ok(table);
                };
                let ColumnData::Timestamp(values) = &column.data else {
                    return Err(EtlError::transform(
                        self.dimension,
                        format!("column '{}' must be a timestamp to derive keys", source),
                    ));
                };

                let date_keys = values.iter().map(|v| v.map(|ts| date_key_of(&ts))).collect();
                let time_keys = values.iter().map(|v| v.map(|ts| time_key_of(&ts))).collect();

                let table = table
                    .with_column(Column::new(*date_key, ColumnData::Integer(date_keys)))
                    .and_then(|t| {
                        t.with_column(Column::new(*time_key, ColumnData::Integer(time_keys)))
                    })
                    .map_err(|message| EtlError::transform(self.dimension, message))?;

                typed.insert(*date_key);
                typed.insert(*time_key);
                Ok(table)
            }
        }
    }

    fn apply_translations(&self, mut table: Table) -> Result<Table> {
        for translation in &self.translations {
            if !table.has_column(translation.column) {
                return Err(EtlError::transform(
                    self.dimension,
                    format!("column '{}' required for value translation", translation.column),
                ));
            }
            table = table.map_column(translation.column, |data| {
                translate(data, translation.values)
            });
        }
        Ok(table)
    }
}

fn coercion_offset(dimension: &str, coercion: &Coercion) -> Result<Option<FixedOffset>> {
    match coercion {
        Coercion::Timestamp { utc_offset_secs } => FixedOffset::east_opt(*utc_offset_secs)
            .map(Some)
            .ok_or_else(|| {
                EtlError::transform(dimension, format!("invalid UTC offset {}s", utc_offset_secs))
            }),
        _ => Ok(None),
    }
}

fn coerce(data: &ColumnData, coercion: Coercion, offset: Option<FixedOffset>) -> ColumnData {
    match (coercion, data) {
        (Coercion::Integer, ColumnData::Integer(v)) => ColumnData::Integer(v.clone()),
        (Coercion::Decimal, ColumnData::Decimal(v)) => ColumnData::Decimal(v.clone()),
        (Coercion::Boolean, ColumnData::Boolean(v)) => ColumnData::Boolean(v.clone()),
        (Coercion::Integer, other) => ColumnData::Integer(parse_all(other, parse_integer)),
        (Coercion::Decimal, other) => ColumnData::Decimal(parse_all(other, parse_decimal)),
        (Coercion::Boolean, other) => ColumnData::Boolean(parse_all(other, parse_boolean)),
        (Coercion::Timestamp { .. }, other) => {
            let offset = offset.unwrap_or_else(|| Utc.fix());
            match other {
                ColumnData::Timestamp(v) => ColumnData::Timestamp(
                    v.iter().map(|ts| ts.map(|t| t.with_timezone(&offset))).collect(),
                ),
                other => ColumnData::Timestamp(parse_all(other, |raw| {
                    parse_timestamp(raw, &offset)
                })),
            }
        }
    }
}

fn parse_all<T, F>(data: &ColumnData, parse: F) -> Vec<Option<T>>
where
    F: Fn(&str) -> Option<T>,
{
    data.to_text()
        .iter()
        .map(|v| v.as_deref().and_then(&parse))
        .collect()
}

pub fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub fn parse_timestamp(raw: &str, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(offset));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ts.with_timezone(offset));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().with_timezone(offset));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().with_timezone(offset))
}

fn date_key_of(ts: &DateTime<FixedOffset>) -> i64 {
    i64::from(ts.year()) * 10_000 + i64::from(ts.month()) * 100 + i64::from(ts.day())
}

// 0 marks a missing time elsewhere in the warehouse, so midnight is stored as 1.
fn time_key_of(ts: &DateTime<FixedOffset>) -> i64 {
    match i64::from(ts.hour() * 60 + ts.minute()) {
        0 => 1,
        minutes => minutes,
    }
}

fn translate(data: &ColumnData, values: &[(&str, &str)]) -> ColumnData {
    ColumnData::Text(
        data.to_text()
            .into_iter()
            .map(|value| {
                value.map(|v| {
                    values
                        .iter()
                        .find(|(from, _)| *from == v)
                        .map(|(_, to)| to.to_string())
                        .unwrap_or(v)
                })
            })
            .collect(),
    )
}

fn stringify_untyped(table: Table, typed: &HashSet<&str>) -> Table {
    let untyped: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| !typed.contains(c.name.as_str()) && c.data.column_type() != ColumnType::Text)
        .map(|c| c.name.clone())
        .collect();

    untyped.iter().fold(table, |t, name| {
        t.map_column(name, |data| ColumnData::Text(data.to_text()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: Vec<Column>) -> Table {
        Table::from_columns(columns).unwrap()
    }

    #[test]
    fn test_strip_prefix_is_idempotent_on_clean_names() {
        let rules = RuleSet::new("test").strip_prefix("attributes.");
        let input = table(vec![
            Column::text("id", vec![Some("1")]),
            Column::text("attributes.name", vec![Some("Ana")]),
        ]);

        let once = rules.apply(input).unwrap();
        assert_eq!(once.column_names(), vec!["id", "name"]);

        let twice = rules.apply(once.clone()).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn test_replace_prefix_is_textual() {
        let rules = RuleSet::new("test")
            .replace_prefix("attributes.", "table_")
            .strip_prefix("relationships.");
        let input = table(vec![
            Column::text("attributes.size", vec![Some("s")]),
            Column::text("relationships.room.data.id", vec![Some("1")]),
        ]);

        let output = rules.apply(input).unwrap();
        assert_eq!(output.column_names(), vec!["table_size", "room.data.id"]);
    }

    #[test]
    fn test_rename_and_drop_of_absent_columns_are_noops() {
        let rules = RuleSet::new("test")
            .rename("missing", "renamed")
            .rename("id", "key")
            .drop_columns(&["also_missing"]);
        let input = table(vec![Column::text("id", vec![Some("7")])]);

        let output = rules.apply(input).unwrap();
        assert_eq!(output.column_names(), vec!["key"]);
        assert_eq!(output.num_rows(), 1);
    }

    #[test]
    fn test_coercion_failures_become_null() {
        let rules = RuleSet::new("test")
            .coerce("amount", Coercion::Decimal)
            .coerce("count", Coercion::Integer)
            .coerce("flag", Coercion::Boolean);
        let input = table(vec![
            Column::text("amount", vec![Some("1.5"), Some("abc"), None]),
            Column::text("count", vec![Some("3"), Some("4.0"), Some("4.2")]),
            Column::text("flag", vec![Some("True"), Some("0"), Some("maybe")]),
        ]);

        let output = rules.apply(input).unwrap();
        assert_eq!(output.num_rows(), 3);
        assert_eq!(
            output.column("amount").unwrap().data,
            ColumnData::Decimal(vec![Some(1.5), None, None])
        );
        assert_eq!(
            output.column("count").unwrap().data,
            ColumnData::Integer(vec![Some(3), Some(4), None])
        );
        assert_eq!(
            output.column("flag").unwrap().data,
            ColumnData::Boolean(vec![Some(true), Some(false), None])
        );
    }

    #[test]
    fn test_translation_passes_unlisted_values_through() {
        let rules = RuleSet::new("test").translate("size", &[("s", "chica"), ("l", "grande")]);
        let input = table(vec![Column::text(
            "size",
            vec![Some("s"), Some("xl"), None, Some("l")],
        )]);

        let output = rules.apply(input).unwrap();
        assert_eq!(
            output.column("size").unwrap().data,
            ColumnData::Text(vec![
                Some("chica".to_string()),
                Some("xl".to_string()),
                None,
                Some("grande".to_string())
            ])
        );
    }

    #[test]
    fn test_translation_of_missing_column_fails() {
        let rules = RuleSet::new("tables").translate("size", &[("s", "chica")]);
        let input = table(vec![Column::text("id", vec![Some("1")])]);

        let err = rules.apply(input).unwrap_err();
        assert!(matches!(err, EtlError::Transform { .. }));
    }

    #[test]
    fn test_untouched_columns_are_stringified() {
        let rules = RuleSet::new("test")
            .coerce("count", Coercion::Integer);
        let input = table(vec![
            Column::new("count", ColumnData::Text(vec![Some("2".to_string())])),
            Column::new("score", ColumnData::Decimal(vec![Some(0.5)])),
            Column::new("active", ColumnData::Boolean(vec![Some(true)])),
        ]);

        let output = rules.apply(input).unwrap();
        assert_eq!(
            output.column("count").unwrap().data,
            ColumnData::Integer(vec![Some(2)])
        );
        assert_eq!(
            output.column("score").unwrap().data,
            ColumnData::Text(vec![Some("0.5".to_string())])
        );
        assert_eq!(
            output.column("active").unwrap().data,
            ColumnData::Text(vec![Some("true".to_string())])
        );
    }

    #[test]
    fn test_date_time_keys_skip_when_source_absent() {
        let rules = RuleSet::new("test").derive(Derivation::DateTimeKeys {
            source: "created",
            date_key: "created_date_key",
            time_key: "created_time_key",
        });
        let input = table(vec![Column::text("id", vec![Some("1")])]);

        let output = rules.apply(input).unwrap();
        assert_eq!(output.column_names(), vec!["id"]);
    }

    #[test]
    fn test_date_time_keys_in_target_offset() {
        let rules = RuleSet::new("test")
            .coerce(
                "created",
                Coercion::Timestamp {
                    utc_offset_secs: -3 * 3600,
                },
            )
            .derive(Derivation::DateTimeKeys {
                source: "created",
                date_key: "date_key",
                time_key: "time_key",
            })
            .discard_after_derive(&["created"]);
        let input = table(vec![Column::text(
            "created",
            vec![
                Some("2024-06-01T00:05:00Z"),
                Some("2024-06-01T03:00:00Z"),
                Some("not a date"),
            ],
        )]);

        let output = rules.apply(input).unwrap();
        assert_eq!(output.column_names(), vec!["date_key", "time_key"]);
        assert_eq!(
            output.column("date_key").unwrap().data,
            ColumnData::Integer(vec![Some(20240531), Some(20240601), None])
        );
        assert_eq!(
            output.column("time_key").unwrap().data,
            ColumnData::Integer(vec![Some(21 * 60 + 5), Some(1), None])
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let expected = DateTime::parse_from_rfc3339("2024-06-01T12:30:00Z").unwrap();

        for raw in [
            "2024-06-01T12:30:00Z",
            "2024-06-01T12:30:00.000Z",
            "2024-06-01T09:30:00-03:00",
            "2024-06-01 12:30:00",
            "2024-06-01 12:30:00+00:00",
        ] {
            assert_eq!(parse_timestamp(raw, &utc), Some(expected), "{}", raw);
        }
        assert!(parse_timestamp("2024-06-01", &utc).is_some());
        assert!(parse_timestamp("yesterday", &utc).is_none());
    }
}
