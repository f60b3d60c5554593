use super::{AuxiliaryTables, DimensionTransform};
use crate::core::rules::RuleSet;
use crate::domain::model::Table;
use crate::utils::error::Result;

const SIZES: &[(&str, &str)] = &[("s", "chica"), ("l", "grande")];
const LOCATIONS: &[(&str, &str)] = &[("1", "salon"), ("2", "vereda")];
const SHAPES: &[(&str, &str)] = &[("0", "cuadrada"), ("1", "redonda")];

#[derive(Debug, Clone, Copy, Default)]
pub struct TablesTransform;

impl TablesTransform {
    pub fn rules() -> RuleSet {
        RuleSet::new("tables")
            .replace_prefix("attributes.", "table_")
            .strip_prefix("relationships.")
            .rename("id", "table_key")
            .rename("room.data.id", "table_location")
            .drop_columns(&["type", "room.data.type"])
            .translate("table_size", SIZES)
            .translate("table_location", LOCATIONS)
            .translate("table_shape", SHAPES)
    }
}

impl DimensionTransform for TablesTransform {
    fn name(&self) -> &'static str {
        "tables"
    }

    fn apply(&self, primary: Table, _auxiliary: &AuxiliaryTables) -> Result<Table> {
        tracing::info!("Processing tables dimension ({} rows)", primary.num_rows());
        Self::rules().apply(primary)
    }
}
