use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use vaxsite_core::contract::{ObjectRef, ObjectTag};
use vaxsite_lambda::adapters::object_source::ObjectSource;
use vaxsite_lambda::adapters::postgres::PostgresSiteGateway;
use vaxsite_lambda::config::GatewayConfig;
use vaxsite_lambda::handlers::ingest::{handle_s3_event, IngestHandlerConfig, IngestSummary};

struct S3ObjectSource {
    s3_client: aws_sdk_s3::Client,
}

impl ObjectSource for S3ObjectSource {
    fn read_object(&self, object: &ObjectRef) -> Result<Vec<u8>, String> {
        let client = self.s3_client.clone();
        let bucket = object.bucket.clone();
        let key = object.key.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|error| format!("failed to get object from s3: {error}"))?;
                output
                    .body
                    .collect()
                    .await
                    .map(|data| data.into_bytes().to_vec())
                    .map_err(|error| format!("failed to read object body: {error}"))
            })
        })
    }

    fn read_tags(&self, object: &ObjectRef) -> Result<Vec<ObjectTag>, String> {
        let client = self.s3_client.clone();
        let bucket = object.bucket.clone();
        let key = object.key.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .get_object_tagging()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map(|output| {
                        output
                            .tag_set()
                            .iter()
                            .map(|tag| ObjectTag::new(tag.key(), tag.value()))
                            .collect()
                    })
                    .map_err(|error| format!("failed to get object tagging from s3: {error}"))
            })
        })
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<IngestSummary, Error> {
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let source = S3ObjectSource {
        s3_client: aws_sdk_s3::Client::new(&aws_config),
    };
    let gateway = PostgresSiteGateway::from_config(&GatewayConfig::from_env())?;
    let config = IngestHandlerConfig {
        invoked_at: Utc::now().to_rfc3339(),
    };

    handle_s3_event(&event.payload, &config, &source, &gateway).map_err(Error::from)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_current_span(false)
        .init();

    lambda_runtime::run(service_fn(handle_request)).await
}
