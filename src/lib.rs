pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::cli::LocalStorage;

#[cfg(feature = "s3")]
pub use config::s3::S3Storage;

pub use crate::core::{etl::EtlEngine, source::StorageSource, transforms::Dimension};
pub use utils::error::{EtlError, Result};
