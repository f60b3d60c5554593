pub mod codec;
pub mod etl;
pub mod join;
pub mod partition;
pub mod rules;
pub mod source;
pub mod transforms;

pub use crate::domain::model::{Column, ColumnData, ColumnType, PartitionPath, Table, TransformResult};
pub use crate::domain::ports::{Storage, TabularSource};
pub use crate::utils::error::Result;
