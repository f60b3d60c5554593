use dimension_etl::config::lambda::LambdaConfig;
use dimension_etl::config::s3::S3Storage;
use dimension_etl::config::StorageTarget;
use dimension_etl::core::etl::{EtlEngine, RunReport};
use dimension_etl::core::source::StorageSource;
use dimension_etl::utils::logger;
use dimension_etl::utils::validation::Validate;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct Request {
    pub s3_bucket: Option<String>,
    pub s3_prefix: Option<String>,
    pub dimensions: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct Response {
    pub message: String,
    pub succeeded: usize,
    pub failed: usize,
    pub report: RunReport,
}

async fn function_handler(event: LambdaEvent<Request>) -> Result<Response, Error> {
    tracing::info!("Starting dimension pipeline Lambda");

    let mut config = LambdaConfig::from_env()?;
    if let Some(bucket) = event.payload.s3_bucket {
        config.s3_bucket = bucket;
    }
    if let Some(prefix) = event.payload.s3_prefix {
        config.s3_prefix = prefix;
    }
    if let Some(dimensions) = event.payload.dimensions {
        config.dimensions = dimensions;
    }
    config.validate()?;

    let settings = config.settings();
    let dimensions = settings.parsed_dimensions()?;
    let StorageTarget::S3 { bucket, prefix } = settings.storage_target()? else {
        return Err("Lambda storage must be s3://".into());
    };

    let storage = S3Storage::connect(bucket, prefix, settings.region.clone()).await;
    let engine = EtlEngine::new(StorageSource::new(storage, settings.layout()));
    let report = engine.run(&dimensions).await;

    let message = format!(
        "{} dimensions succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    tracing::info!("{}", message);

    Ok(Response {
        message,
        succeeded: report.succeeded(),
        failed: report.failed(),
        report,
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    run(service_fn(function_handler)).await
}
