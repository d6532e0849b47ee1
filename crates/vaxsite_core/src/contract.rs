use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::report::PayloadFormat;

pub const CORRECTION_TAG_VALUE: &str = "correction";

/// Location of one object named by an S3 notification record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectTag {
    pub key: String,
    pub value: String,
}

impl ObjectTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// What the uploader encoded into the tag set: the payload format (tag key)
/// and whether the upload corrects an earlier one (tag value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagClassification {
    pub format_tag: Option<String>,
    pub is_correction: bool,
}

impl TagClassification {
    pub fn format(&self) -> Option<PayloadFormat> {
        self.format_tag
            .as_deref()
            .and_then(PayloadFormat::from_tag_key)
    }
}

/// Only the first tag is consulted, matching the single tag the uploader writes.
pub fn classify_tags(tags: &[ObjectTag]) -> TagClassification {
    match tags.first() {
        Some(tag) => TagClassification {
            format_tag: Some(tag.key.clone()),
            is_correction: is_correction_value(&tag.value),
        },
        None => TagClassification {
            format_tag: None,
            is_correction: false,
        },
    }
}

pub fn is_correction_value(value: &str) -> bool {
    value.eq_ignore_ascii_case(CORRECTION_TAG_VALUE)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("S3 event must include a Records array")]
    MissingRecords,

    #[error("S3 record {index} is malformed: {message}")]
    MalformedRecord { index: usize, message: String },
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

/// Extracts bucket/key pairs in arrival order. Records without an `s3`
/// entity are skipped.
pub fn decode_s3_event(event: &Value) -> Result<Vec<ObjectRef>, EventError> {
    let records = event
        .get("Records")
        .and_then(Value::as_array)
        .ok_or(EventError::MissingRecords)?;

    let mut objects = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let Some(entity) = record.get("s3") else {
            continue;
        };
        let entity: S3Entity = serde_json::from_value(entity.clone()).map_err(|error| {
            EventError::MalformedRecord {
                index,
                message: error.to_string(),
            }
        })?;
        let key = decode_object_key(&entity.object.key)
            .map_err(|message| EventError::MalformedRecord { index, message })?;
        objects.push(ObjectRef {
            bucket: entity.bucket.name,
            key,
        });
    }

    Ok(objects)
}

/// Notification keys are form-encoded: `+` stands for a space and a literal
/// plus arrives as `%2B`.
fn decode_object_key(raw: &str) -> Result<String, String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|error| format!("object key {raw} is not valid UTF-8: {error}"))
}
