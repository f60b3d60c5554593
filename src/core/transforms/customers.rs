use super::{AuxiliaryTables, DimensionTransform};
use crate::core::rules::{Coercion, Derivation, RuleSet};
use crate::domain::model::Table;
use crate::utils::error::Result;

/// America/Argentina/Buenos_Aires, which has had no DST since 2009.
pub const LOCAL_UTC_OFFSET_SECS: i32 = -3 * 3600;

#[derive(Debug, Clone, Copy, Default)]
pub struct CustomersTransform;

impl CustomersTransform {
    pub fn rules() -> RuleSet {
        RuleSet::new("customers")
            .strip_prefix("attributes.")
            .strip_prefix("relationships.")
            .rename("id", "customer_key")
            .rename("createdAt", "created_date")
            .rename("discountPercentage", "discount_percentage")
            .rename("houseAccountBalance", "house_account_balance")
            .rename("houseAccountEnabled", "house_account_enabled")
            .drop_columns(&["paymentMethod.data"])
            .coerce("customer_key", Coercion::Integer)
            .coerce(
                "created_date",
                Coercion::Timestamp {
                    utc_offset_secs: LOCAL_UTC_OFFSET_SECS,
                },
            )
            .coerce("discount_percentage", Coercion::Decimal)
            .coerce("house_account_balance", Coercion::Decimal)
            .coerce("active", Coercion::Boolean)
            .coerce("house_account_enabled", Coercion::Boolean)
            .derive(Derivation::DateTimeKeys {
                source: "created_date",
                date_key: "created_date_key",
                time_key: "created_time_key",
            })
            .discard_after_derive(&["created_date"])
    }
}

impl DimensionTransform for CustomersTransform {
    fn name(&self) -> &'static str {
        "customers"
    }

    fn apply(&self, primary: Table, _auxiliary: &AuxiliaryTables) -> Result<Table> {
        tracing::info!("Processing customers dimension ({} rows)", primary.num_rows());
        let table = Self::rules().apply(primary)?;
        tracing::debug!("Customer columns: {:?}", table.column_names());
        Ok(table)
    }
}
