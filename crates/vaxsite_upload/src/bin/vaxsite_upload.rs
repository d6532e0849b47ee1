use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::RequestId;
use aws_sdk_s3::primitives::ByteStream;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;
use vaxsite_upload::{
    validate_profile, UploadError, UploadRequest, DEFAULT_BUCKET, DEFAULT_PROFILE, DEFAULT_REGION,
};

#[derive(Parser, Debug)]
#[command(
    name = "vaxsite-upload",
    about = "Upload a vaccination site report to the ingest bucket"
)]
struct Cli {
    /// Local XML or JSON report to upload.
    file_path: String,

    /// Payload format tag key ("xml" or "json").
    tag_key: String,

    #[arg(long, env = "VAXSITE_BUCKET", default_value = DEFAULT_BUCKET)]
    bucket: String,

    #[arg(long, env = "VAXSITE_REGION", default_value = DEFAULT_REGION)]
    region: String,

    #[arg(long, env = "AWS_PROFILE", default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Extra positional arguments are accepted and ignored.
    #[arg(hide = true, num_args = 0..)]
    ignored: Vec<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = error.print();
                }
                _ => {
                    println!("Command input error, please edit and try again");
                    println!("{}", Cli::command().render_usage());
                }
            }
            return;
        }
    };

    if !cli.ignored.is_empty() {
        tracing::debug!(
            component = "upload_cli",
            event = "extra_arguments_ignored",
            count = cli.ignored.len(),
            "ignoring extra arguments"
        );
    }

    let request = UploadRequest::new(&cli.file_path, &cli.tag_key, &cli.bucket);
    match upload(&cli, &request).await {
        Ok(()) => println!("{}", request.success_line()),
        Err(error) => {
            tracing::warn!(
                component = "upload_cli",
                event = "upload_failed",
                key = %request.key,
                bucket = %request.bucket,
                error = %error,
                "upload failed"
            );
            for line in error.console_lines() {
                println!("{line}");
            }
        }
    }
}

async fn upload(cli: &Cli, request: &UploadRequest) -> Result<(), UploadError> {
    let profile = validate_profile(&cli.profile)?;
    let body = request.read_body()?;

    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .profile_name(profile)
        .region(Region::new(cli.region.clone()))
        .load()
        .await;
    let client = aws_sdk_s3::Client::new(&aws_config);

    tracing::info!(
        component = "upload_cli",
        event = "upload_started",
        key = %request.key,
        bucket = %request.bucket,
        tagging = %request.tagging(),
        bytes = body.len(),
        "uploading report"
    );

    client
        .put_object()
        .bucket(&request.bucket)
        .key(&request.key)
        .tagging(request.tagging())
        .body(ByteStream::from(body))
        .send()
        .await
        .map(|_| ())
        .map_err(upload_error)
}

fn upload_error<E, R>(error: SdkError<E, R>) -> UploadError
where
    E: ProvideErrorMetadata + RequestId + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match error {
        SdkError::ServiceError(context) => {
            let service_error = context.err();
            UploadError::Service {
                message: service_error.message().unwrap_or("unknown").to_string(),
                code: service_error.code().unwrap_or("unknown").to_string(),
                request_id: service_error.request_id().unwrap_or("unknown").to_string(),
            }
        }
        other => UploadError::Other(DisplayErrorContext(&other).to_string()),
    }
}
