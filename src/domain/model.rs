use chrono::{DateTime, FixedOffset, NaiveDate};
use std::fmt;

/// Semantic type of a column. Every type is nullable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Decimal,
    Text,
    Boolean,
    Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Integer(Vec<Option<i64>>),
    Decimal(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Boolean(Vec<Option<bool>>),
    Timestamp(Vec<Option<DateTime<FixedOffset>>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.len(),
            ColumnData::Decimal(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Integer(_) => ColumnType::Integer,
            ColumnData::Decimal(_) => ColumnType::Decimal,
            ColumnData::Text(_) => ColumnType::Text,
            ColumnData::Boolean(_) => ColumnType::Boolean,
            ColumnData::Timestamp(_) => ColumnType::Timestamp,
        }
    }

    pub fn null_count(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Decimal(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Text(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Boolean(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Timestamp(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    /// Text rendering of every value; nulls stay null.
    pub fn to_text(&self) -> Vec<Option<String>> {
        match self {
            ColumnData::Text(v) => v.clone(),
            ColumnData::Integer(v) => v.iter().map(|x| x.map(|n| n.to_string())).collect(),
            ColumnData::Decimal(v) => v.iter().map(|x| x.map(|n| n.to_string())).collect(),
            ColumnData::Boolean(v) => v.iter().map(|x| x.map(|b| b.to_string())).collect(),
            ColumnData::Timestamp(v) => v.iter().map(|x| x.map(|t| t.to_rfc3339())).collect(),
        }
    }

    /// Gathers rows by index; `None` produces a null row.
    pub fn take(&self, indices: &[Option<usize>]) -> ColumnData {
        fn gather<T: Clone>(values: &[Option<T>], indices: &[Option<usize>]) -> Vec<Option<T>> {
            indices
                .iter()
                .map(|idx| idx.and_then(|i| values.get(i).cloned().flatten()))
                .collect()
        }

        match self {
            ColumnData::Integer(v) => ColumnData::Integer(gather(v, indices)),
            ColumnData::Decimal(v) => ColumnData::Decimal(gather(v, indices)),
            ColumnData::Text(v) => ColumnData::Text(gather(v, indices)),
            ColumnData::Boolean(v) => ColumnData::Boolean(gather(v, indices)),
            ColumnData::Timestamp(v) => ColumnData::Timestamp(gather(v, indices)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn text<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        Self::new(
            name,
            ColumnData::Text(values.into_iter().map(|v| v.map(Into::into)).collect()),
        )
    }
}

/// Ordered set of equally long columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>, num_rows: usize) -> std::result::Result<Self, String> {
        if let Some(bad) = columns.iter().find(|c| c.data.len() != num_rows) {
            return Err(format!(
                "column '{}' has {} values, expected {}",
                bad.name,
                bad.data.len(),
                num_rows
            ));
        }
        Ok(Self { columns, num_rows })
    }

    /// Row count is taken from the first column, zero when there is none.
    pub fn from_columns(columns: Vec<Column>) -> std::result::Result<Self, String> {
        let num_rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        Self::new(columns, num_rows)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn map_column_names<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        for column in &mut self.columns {
            column.name = f(&column.name);
        }
        self
    }

    /// Removes every column carrying `name`. Absent names are ignored.
    pub fn drop_column(mut self, name: &str) -> Self {
        self.columns.retain(|c| c.name != name);
        self
    }

    /// Replaces the data of every column called `name` in place, keeping its position.
    pub fn map_column<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&ColumnData) -> ColumnData,
    {
        for column in self.columns.iter_mut().filter(|c| c.name == name) {
            column.data = f(&column.data);
        }
        self
    }

    /// Appends a column, or replaces the first one with the same name.
    pub fn with_column(mut self, column: Column) -> std::result::Result<Self, String> {
        if column.data.len() != self.num_rows {
            return Err(format!(
                "column '{}' has {} values, expected {}",
                column.name,
                column.data.len(),
                self.num_rows
            ));
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(self)
    }
}

pub const DATE_TOKEN: &str = "date=";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A storage location that carries a `date=YYYY-MM-DD` segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPath {
    path: String,
    segment: String,
    date: NaiveDate,
}

impl PartitionPath {
    /// Parses a candidate. `None` unless exactly one `/`-segment starts with
    /// `date=` and its value is a calendar date.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim_end_matches('/');
        let mut segments = path.split('/').filter(|s| s.starts_with(DATE_TOKEN));
        let segment = segments.next()?;
        if segments.next().is_some() {
            return None;
        }

        let date = NaiveDate::parse_from_str(&segment[DATE_TOKEN.len()..], DATE_FORMAT).ok()?;
        Some(Self {
            path: path.to_string(),
            segment: segment.to_string(),
            date,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// The `date=YYYY-MM-DD` segment exactly as it appears in the path.
    pub fn date_segment(&self) -> &str {
        &self.segment
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl fmt::Display for PartitionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub table: Table,
    pub partition: PartitionPath,
}
