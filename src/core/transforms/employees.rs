use super::{AuxiliaryTables, DimensionTransform};
use crate::core::join;
use crate::core::rules::RuleSet;
use crate::domain::model::Table;
use crate::utils::error::{EtlError, Result};

pub const ROLES_DIMENSION: &str = "user_roles";
const ROLE_KEY: &str = "role_key";
const ROLE_NAME: &str = "role_name";

#[derive(Debug, Clone, Copy, Default)]
pub struct EmployeesTransform;

impl EmployeesTransform {
    pub fn rules() -> RuleSet {
        RuleSet::new("users")
            .strip_prefix("attributes.")
            .strip_prefix("relationships.")
            .rename("id", "employee_key")
            .rename("role.data.id", ROLE_KEY)
            .drop_columns(&["type", "admin", "promotionalCode", "role.data.type"])
    }

    pub fn role_rules() -> RuleSet {
        RuleSet::new(ROLES_DIMENSION)
            .strip_prefix("attributes.")
            .rename("id", ROLE_KEY)
            .rename("name", ROLE_NAME)
    }

    /// Cleans the roles export down to `role_key, role_name`.
    pub fn role_lookup(roles: &Table) -> Result<Table> {
        let roles = Self::role_rules().apply(roles.clone())?;
        let columns = [ROLE_KEY, ROLE_NAME]
            .iter()
            .map(|name| {
                roles.column(name).cloned().ok_or_else(|| {
                    EtlError::transform(
                        ROLES_DIMENSION,
                        format!("roles table has no '{}' column", name),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Table::new(columns, roles.num_rows())
            .map_err(|message| EtlError::transform(ROLES_DIMENSION, message))
    }
}

impl DimensionTransform for EmployeesTransform {
    fn name(&self) -> &'static str {
        "users"
    }

    fn auxiliary(&self) -> &'static [&'static str] {
        &[ROLES_DIMENSION]
    }

    fn apply(&self, primary: Table, auxiliary: &AuxiliaryTables) -> Result<Table> {
        tracing::info!("Processing employees dimension ({} rows)", primary.num_rows());

        let users = Self::rules().apply(primary)?;
        let roles = Self::role_lookup(auxiliary.get(self.name(), ROLES_DIMENSION)?)?;
        tracing::debug!("Loaded {} roles for lookup", roles.num_rows());

        let joined = join::left_join(self.name(), users, &roles, ROLE_KEY)?;
        Ok(joined.drop_column(ROLE_KEY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Column, ColumnData};

    fn raw_users() -> Table {
        Table::from_columns(vec![
            Column::text("id", vec![Some("1"), Some("2"), Some("3")]),
            Column::text("type", vec![Some("users"), Some("users"), Some("users")]),
            Column::text("attributes.name", vec![Some("Ana"), Some("Luis"), Some("Sol")]),
            Column::text("attributes.admin", vec![Some("true"), Some("false"), Some("false")]),
            Column::text("relationships.role.data.id", vec![Some("7"), Some("8"), Some("99")]),
            Column::text("relationships.role.data.type", vec![Some("roles"), Some("roles"), Some("roles")]),
        ])
        .unwrap()
    }

    fn raw_roles() -> Table {
        Table::from_columns(vec![
            Column::text("id", vec![Some("7"), Some("8")]),
            Column::text("type", vec![Some("roles"), Some("roles")]),
            Column::text("attributes.name", vec![Some("Manager"), Some("Waiter")]),
            Column::text("attributes.permissions", vec![Some("all"), Some("orders")]),
        ])
        .unwrap()
    }

    fn auxiliary(roles: Table) -> AuxiliaryTables {
        let mut auxiliary = AuxiliaryTables::new();
        auxiliary.insert(ROLES_DIMENSION, roles);
        auxiliary
    }

    #[test]
    fn test_employees_join_roles() {
        let table = EmployeesTransform
            .apply(raw_users(), &auxiliary(raw_roles()))
            .unwrap();

        assert_eq!(table.column_names(), vec!["employee_key", "name", "role_name"]);
        assert_eq!(table.num_rows(), 3);
        assert_eq!(
            table.column("role_name").unwrap().data,
            ColumnData::Text(vec![
                Some("Manager".to_string()),
                Some("Waiter".to_string()),
                None
            ])
        );
    }

    #[test]
    fn test_role_lookup_projection() {
        let roles = EmployeesTransform::role_lookup(&raw_roles()).unwrap();
        assert_eq!(roles.column_names(), vec!["role_key", "role_name"]);
    }

    #[test]
    fn test_role_lookup_without_name_fails() {
        let roles = Table::from_columns(vec![Column::text("id", vec![Some("7")])]).unwrap();
        let err = EmployeesTransform::role_lookup(&roles).unwrap_err();
        assert!(err.to_string().contains("role_name"));
    }

    #[test]
    fn test_employees_without_roles_loaded() {
        let err = EmployeesTransform
            .apply(raw_users(), &AuxiliaryTables::new())
            .unwrap_err();
        assert!(err.to_string().contains("user_roles"));
    }
}
