//! Upload side of the ingest contract.
//!
//! Pushes one local file to the ingest bucket with a single tag: the key names
//! the payload format and the value marks the upload as a correction when the
//! file name says so.

use std::path::PathBuf;

use thiserror::Error;
use vaxsite_core::contract::CORRECTION_TAG_VALUE;

pub const DEFAULT_BUCKET: &str = "project-test-001";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("credential profile error: {0}")]
    Credentials(String),

    #[error("failed to read {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("S3 service error {code}: {message}")]
    Service {
        message: String,
        code: String,
        request_id: String,
    },

    #[error("{0}")]
    Other(String),
}

impl UploadError {
    /// Lines printed to the console for this failure.
    pub fn console_lines(&self) -> Vec<String> {
        match self {
            Self::Service {
                message,
                code,
                request_id,
            } => vec![
                format!("Amazon S3 Error: {message}"),
                format!("Error Code: {code}"),
                format!("Request ID: {request_id}"),
            ],
            other => vec![format!("Error uploading file: {other}")],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    pub bucket: String,
    pub key: String,
    pub tag_key: String,
    pub tag_value: String,
}

impl UploadRequest {
    pub fn new(file_path: &str, tag_key: &str, bucket: &str) -> Self {
        let key = object_key_from_path(file_path);
        let tag_value = classify_upload(&key).to_string();
        Self {
            file_path: PathBuf::from(file_path),
            bucket: bucket.to_string(),
            key,
            tag_key: tag_key.to_string(),
            tag_value,
        }
    }

    /// The tag set as the URL-encoded query string `PutObject` expects.
    pub fn tagging(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair(&self.tag_key, &self.tag_value)
            .finish()
    }

    pub fn read_body(&self) -> Result<Vec<u8>, UploadError> {
        std::fs::read(&self.file_path).map_err(|source| UploadError::Io {
            path: self.file_path.clone(),
            source,
        })
    }

    pub fn success_line(&self) -> String {
        format!("File uploaded: {} to bucket: {}", self.key, self.bucket)
    }
}

/// Base name of the path, split on either separator so Windows paths work anywhere.
pub fn object_key_from_path(file_path: &str) -> String {
    file_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_path)
        .to_string()
}

pub fn classify_upload(key: &str) -> &'static str {
    if key.to_ascii_lowercase().contains(CORRECTION_TAG_VALUE) {
        CORRECTION_TAG_VALUE
    } else {
        ""
    }
}

pub fn validate_profile(profile: &str) -> Result<&str, UploadError> {
    let trimmed = profile.trim();
    if trimmed.is_empty() {
        return Err(UploadError::Credentials(
            "profile name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn correction_in_any_case_marks_upload() {
        assert_eq!(classify_upload("site42_Correction.json"), "correction");
        assert_eq!(classify_upload("site42_CORRECTION.xml"), "correction");
        assert_eq!(classify_upload("correction-site42.xml"), "correction");
    }

    #[test]
    fn plain_upload_has_empty_tag_value() {
        assert_eq!(classify_upload("site42.json"), "");
        assert_eq!(classify_upload("corrected.json"), "");
    }

    #[test]
    fn key_is_base_name_for_either_separator() {
        assert_eq!(object_key_from_path("site42.json"), "site42.json");
        assert_eq!(object_key_from_path("/tmp/uploads/site42.json"), "site42.json");
        assert_eq!(
            object_key_from_path(r"C:\Users\clinic\site42_Correction.xml"),
            "site42_Correction.xml"
        );
    }

    #[test]
    fn request_derives_key_and_tag() {
        let request = UploadRequest::new("data/site42_Correction.json", "json", DEFAULT_BUCKET);

        assert_eq!(request.key, "site42_Correction.json");
        assert_eq!(request.tag_key, "json");
        assert_eq!(request.tag_value, "correction");
        assert_eq!(request.bucket, "project-test-001");
        assert_eq!(request.tagging(), "json=correction");
    }

    #[test]
    fn tagging_keeps_empty_value_and_encodes_reserved_characters() {
        let plain = UploadRequest::new("site42.xml", "xml", DEFAULT_BUCKET);
        assert_eq!(plain.tagging(), "xml=");

        let odd = UploadRequest::new("site42.xml", "format&kind", DEFAULT_BUCKET);
        assert_eq!(odd.tagging(), "format%26kind=");
    }

    #[test]
    fn reads_body_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"<data/>").expect("write temp file");
        let path = file.path().to_string_lossy().to_string();

        let request = UploadRequest::new(&path, "xml", DEFAULT_BUCKET);

        assert!(request.file_path.is_file());
        assert_eq!(request.read_body().expect("body"), b"<data/>");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.json");
        let request = UploadRequest::new(&path.to_string_lossy(), "json", DEFAULT_BUCKET);

        let error = request.read_body().expect_err("missing file");
        assert!(matches!(error, UploadError::Io { .. }));
        assert!(error.console_lines()[0].starts_with("Error uploading file: failed to read"));
    }

    #[test]
    fn service_errors_print_code_and_request_id() {
        let error = UploadError::Service {
            message: "Access Denied".to_string(),
            code: "AccessDenied".to_string(),
            request_id: "REQ123".to_string(),
        };

        assert_eq!(
            error.console_lines(),
            vec![
                "Amazon S3 Error: Access Denied".to_string(),
                "Error Code: AccessDenied".to_string(),
                "Request ID: REQ123".to_string(),
            ]
        );
    }

    #[test]
    fn empty_profile_is_rejected() {
        assert!(matches!(
            validate_profile("  "),
            Err(UploadError::Credentials(_))
        ));
        assert_eq!(validate_profile("default").expect("valid"), "default");
    }

    #[test]
    fn success_line_names_key_and_bucket() {
        let request = UploadRequest::new("site42.json", "json", "bucket-a");
        assert_eq!(
            request.success_line(),
            "File uploaded: site42.json to bucket: bucket-a"
        );
    }
}
