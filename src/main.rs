use clap::Parser;
use dimension_etl::config::{Settings, StorageTarget};
use dimension_etl::core::etl::{EtlEngine, RunReport};
use dimension_etl::core::source::StorageSource;
use dimension_etl::core::transforms::Dimension;
use dimension_etl::core::Storage;
use dimension_etl::utils::{logger, validation::Validate};
use dimension_etl::{CliConfig, LocalStorage};

async fn run_with<S: Storage>(storage: S, settings: &Settings, dimensions: &[Dimension]) -> RunReport {
    let engine = EtlEngine::new(StorageSource::new(storage, settings.layout()));
    engine.run(dimensions).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let settings = match cli.into_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    logger::init_cli_logger(settings.verbose, settings.log_level.as_deref(), settings.json_logs);
    tracing::info!("Starting dimension-etl");
    tracing::debug!("Settings: {:?}", settings);

    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
    let dimensions = settings.parsed_dimensions()?;

    let report = match settings.storage_target()? {
        StorageTarget::Local(path) => {
            tracing::info!("Using local storage at {}", path.display());
            run_with(LocalStorage::new(path), &settings, &dimensions).await
        }
        #[cfg(feature = "s3")]
        StorageTarget::S3 { bucket, prefix } => {
            let storage = dimension_etl::config::s3::S3Storage::connect(
                bucket,
                prefix,
                settings.region.clone(),
            )
            .await;
            run_with(storage, &settings, &dimensions).await
        }
        #[cfg(not(feature = "s3"))]
        StorageTarget::S3 { .. } => {
            anyhow::bail!("s3:// storage requires the 's3' feature");
        }
    };

    if settings.json_logs {
        println!("{}", report.to_json()?);
    } else {
        for outcome in &report.outcomes {
            match (&outcome.destination, &outcome.error) {
                (Some(destination), _) => println!("✅ {}: {}", outcome.dimension, destination),
                (None, Some(error)) => eprintln!("❌ {}: {}", outcome.dimension, error),
                (None, None) => {}
            }
        }
        println!(
            "Summary: {} dimensions succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
    }

    if !report.all_succeeded() {
        std::process::exit(2);
    }
    Ok(())
}
