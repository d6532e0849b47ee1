use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use vaxsite_core::contract::{classify_tags, decode_s3_event, EventError, ObjectRef};
use vaxsite_core::parser::{parse_report, resolve_format, ParseError};
use vaxsite_core::reconcile::{ReconcileOutcome, StoreError};
use vaxsite_core::report::SiteReport;

use crate::adapters::object_source::ObjectSource;
use crate::adapters::site_gateway::SiteGateway;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestHandlerConfig {
    pub invoked_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestSummary {
    pub status: String,
    pub invoked_at: String,
    pub records: usize,
    pub parsed: usize,
    pub skipped: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid S3 event: {0}")]
    InvalidEvent(#[from] EventError),

    #[error("failed to read object {key} from bucket {bucket}: {message}")]
    Transport {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("failed to parse object {key} from bucket {bucket}: {source}")]
    Parse {
        bucket: String,
        key: String,
        #[source]
        source: ParseError,
    },

    #[error("reconciliation failed: {0}")]
    Store(#[from] StoreError),
}

/// Entry point for one S3 notification batch.
///
/// Objects are fetched and parsed one at a time in arrival order. An object
/// whose tag names no known format is logged and skipped; a transport or
/// parse failure aborts the invocation. Parsed reports are then reconciled
/// in the same order through `gateway`.
pub fn handle_s3_event(
    event: &Value,
    config: &IngestHandlerConfig,
    source: &impl ObjectSource,
    gateway: &impl SiteGateway,
) -> Result<IngestSummary, IngestError> {
    let objects = decode_s3_event(event)?;
    let mut summary = IngestSummary {
        status: "ok".to_string(),
        invoked_at: config.invoked_at.clone(),
        records: objects.len(),
        ..IngestSummary::default()
    };

    let reports = load_reports(&objects, source, &mut summary)?;
    if reports.is_empty() {
        tracing::info!(
            component = "ingest_handler",
            event = "no_reports",
            records = summary.records,
            skipped = summary.skipped,
            "no parsable objects in batch, store not contacted"
        );
        return Ok(summary);
    }

    let mut on_outcome = |report: &SiteReport, outcome: ReconcileOutcome| {
        match outcome {
            ReconcileOutcome::Inserted => summary.inserted += 1,
            ReconcileOutcome::Updated => summary.updated += 1,
            ReconcileOutcome::Unchanged => summary.unchanged += 1,
        }
        log_outcome(report, outcome);
    };

    if let Err(error) = gateway.reconcile_batch(&reports, &mut on_outcome) {
        tracing::error!(
            component = "ingest_handler",
            event = "store_failed",
            error = %error,
            "reconciliation abandoned for the rest of the batch"
        );
        return Err(IngestError::Store(error));
    }

    tracing::info!(
        component = "ingest_handler",
        event = "batch_completed",
        records = summary.records,
        parsed = summary.parsed,
        skipped = summary.skipped,
        inserted = summary.inserted,
        updated = summary.updated,
        unchanged = summary.unchanged,
        "ingest batch completed"
    );
    Ok(summary)
}

fn load_reports(
    objects: &[ObjectRef],
    source: &impl ObjectSource,
    summary: &mut IngestSummary,
) -> Result<Vec<SiteReport>, IngestError> {
    let mut reports = Vec::with_capacity(objects.len());
    for object in objects {
        let body = source
            .read_object(object)
            .map_err(|message| transport_error(object, message))?;
        let tags = source
            .read_tags(object)
            .map_err(|message| transport_error(object, message))?;

        let classification = classify_tags(&tags);
        let format = match resolve_format(classification.format_tag.as_deref()) {
            Ok(format) => format,
            Err(error) => {
                tracing::warn!(
                    component = "ingest_handler",
                    event = "format_unrecognized",
                    bucket = %object.bucket,
                    key = %object.key,
                    error = %error,
                    "error reading format tag, object skipped"
                );
                summary.skipped += 1;
                continue;
            }
        };

        let report =
            parse_report(&body, format, classification.is_correction).map_err(|error| {
                tracing::error!(
                    component = "ingest_handler",
                    event = "parse_failed",
                    bucket = %object.bucket,
                    key = %object.key,
                    format = %format,
                    error = %error,
                    "failed to parse object"
                );
                IngestError::Parse {
                    bucket: object.bucket.clone(),
                    key: object.key.clone(),
                    source: error,
                }
            })?;

        tracing::info!(
            component = "ingest_handler",
            event = "report_parsed",
            bucket = %object.bucket,
            key = %object.key,
            format = %format,
            site_id = %report.site_id,
            total_first_shots = report.total_first_shots,
            total_second_shots = report.total_second_shots,
            is_correction = report.is_correction,
            "parsed site report"
        );
        summary.parsed += 1;
        reports.push(report);
    }
    Ok(reports)
}

fn transport_error(object: &ObjectRef, message: String) -> IngestError {
    tracing::error!(
        component = "ingest_handler",
        event = "object_fetch_failed",
        bucket = %object.bucket,
        key = %object.key,
        error = %message,
        "error getting object, make sure it exists and the bucket is in this function's region"
    );
    IngestError::Transport {
        bucket: object.bucket.clone(),
        key: object.key.clone(),
        message,
    }
}

fn log_outcome(report: &SiteReport, outcome: ReconcileOutcome) {
    match outcome {
        ReconcileOutcome::Inserted => tracing::info!(
            component = "ingest_handler",
            event = "site_inserted",
            site_id = %report.site_id,
            date = %report.date,
            "inserted new site and data rows"
        ),
        ReconcileOutcome::Updated => tracing::info!(
            component = "ingest_handler",
            event = "correction_applied",
            site_id = %report.site_id,
            date = %report.date,
            "overwrote data row with correction"
        ),
        ReconcileOutcome::Unchanged => tracing::info!(
            component = "ingest_handler",
            event = "duplicate_ignored",
            site_id = %report.site_id,
            "entry already exists, non-correction upload dropped"
        ),
    }
}
