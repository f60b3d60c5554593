//! Per-dimension cleaning rules.

pub mod customers;
pub mod employees;
pub mod tables;

use crate::domain::model::Table;
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub use customers::CustomersTransform;
pub use employees::EmployeesTransform;
pub use tables::TablesTransform;

/// Tables loaded for a transform besides its primary table, keyed by storage name.
#[derive(Debug, Default)]
pub struct AuxiliaryTables {
    tables: HashMap<String, Table>,
}

impl AuxiliaryTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        self.tables.insert(name.into(), table);
    }

    pub fn get(&self, dimension: &str, name: &str) -> Result<&Table> {
        self.tables.get(name).ok_or_else(|| {
            EtlError::transform(dimension, format!("auxiliary table '{}' was not loaded", name))
        })
    }
}

pub trait DimensionTransform {
    /// Name used in storage paths: `raw/dim_{name}/...`.
    fn name(&self) -> &'static str;

    /// Other dimensions that must be resolved and loaded before `apply`.
    fn auxiliary(&self) -> &'static [&'static str] {
        &[]
    }

    fn apply(&self, primary: Table, auxiliary: &AuxiliaryTables) -> Result<Table>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Customers,
    Employees,
    Tables,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Customers, Dimension::Employees, Dimension::Tables];
}

impl DimensionTransform for Dimension {
    fn name(&self) -> &'static str {
        match self {
            Dimension::Customers => CustomersTransform.name(),
            Dimension::Employees => EmployeesTransform.name(),
            Dimension::Tables => TablesTransform.name(),
        }
    }

    fn auxiliary(&self) -> &'static [&'static str] {
        match self {
            Dimension::Customers => CustomersTransform.auxiliary(),
            Dimension::Employees => EmployeesTransform.auxiliary(),
            Dimension::Tables => TablesTransform.auxiliary(),
        }
    }

    fn apply(&self, primary: Table, auxiliary: &AuxiliaryTables) -> Result<Table> {
        match self {
            Dimension::Customers => CustomersTransform.apply(primary, auxiliary),
            Dimension::Employees => EmployeesTransform.apply(primary, auxiliary),
            Dimension::Tables => TablesTransform.apply(primary, auxiliary),
        }
    }
}

impl FromStr for Dimension {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customers" => Ok(Dimension::Customers),
            "employees" | "users" => Ok(Dimension::Employees),
            "tables" => Ok(Dimension::Tables),
            other => Err(EtlError::InvalidConfigValueError {
                field: "dimensions".to_string(),
                value: other.to_string(),
                reason: "Unknown dimension. Valid dimensions: customers, employees, tables"
                    .to_string(),
            }),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Dimension::Customers => "customers",
            Dimension::Employees => "employees",
            Dimension::Tables => "tables",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimension() {
        assert_eq!("customers".parse::<Dimension>().unwrap(), Dimension::Customers);
        assert_eq!(" Employees ".parse::<Dimension>().unwrap(), Dimension::Employees);
        assert_eq!("users".parse::<Dimension>().unwrap(), Dimension::Employees);
        assert_eq!("tables".parse::<Dimension>().unwrap(), Dimension::Tables);
        assert!("orders".parse::<Dimension>().is_err());
    }

    #[test]
    fn test_storage_names() {
        assert_eq!(Dimension::Customers.name(), "customers");
        assert_eq!(Dimension::Employees.name(), "users");
        assert_eq!(Dimension::Tables.name(), "tables");
        assert_eq!(Dimension::Employees.auxiliary(), &["user_roles"]);
        assert!(Dimension::Customers.auxiliary().is_empty());
    }

    #[test]
    fn test_missing_auxiliary_table() {
        let auxiliary = AuxiliaryTables::new();
        let err = auxiliary.get("users", "user_roles").unwrap_err();
        assert!(matches!(err, EtlError::Transform { .. }));
    }
}
