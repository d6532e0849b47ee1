//! Format Parser: raw object bytes plus the declared format tag in, one
//! [`SiteReport`] out. Shot totals are accumulated while the vaccine entries
//! are walked, there is no separate aggregation pass.

mod json;
mod xml;

use thiserror::Error;

use crate::report::{PayloadFormat, SiteReport};

pub use json::parse_json_report;
pub use xml::parse_xml_report;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unrecognized payload format tag: {tag:?}")]
    UnsupportedFormat { tag: Option<String> },

    #[error("payload is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    #[error("malformed XML payload: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field} total exceeds the 32-bit shot count range")]
    ShotCountOverflow { field: &'static str },
}

impl ParseError {
    /// Format errors skip the object; everything else fails the invocation.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { .. })
    }
}

/// Resolves the format from the raw tag key, refusing anything but `xml`/`json`.
pub fn resolve_format(tag_key: Option<&str>) -> Result<PayloadFormat, ParseError> {
    tag_key
        .and_then(PayloadFormat::from_tag_key)
        .ok_or_else(|| ParseError::UnsupportedFormat {
            tag: tag_key.map(str::to_string),
        })
}

pub fn parse_report(
    payload: &[u8],
    format: PayloadFormat,
    is_correction: bool,
) -> Result<SiteReport, ParseError> {
    match format {
        PayloadFormat::Xml => parse_xml_report(payload, is_correction),
        PayloadFormat::Json => parse_json_report(payload, is_correction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_tags() {
        assert_eq!(
            resolve_format(Some("xml")).expect("xml tag"),
            PayloadFormat::Xml
        );
        assert_eq!(
            resolve_format(Some("json")).expect("json tag"),
            PayloadFormat::Json
        );
    }

    #[test]
    fn refuses_unknown_or_missing_tag() {
        let unknown = resolve_format(Some("csv")).expect_err("csv is not supported");
        assert!(unknown.is_format_error());
        assert!(unknown.to_string().contains("csv"));

        let missing = resolve_format(None).expect_err("missing tag is not supported");
        assert!(matches!(missing, ParseError::UnsupportedFormat { tag: None }));
    }

    #[test]
    fn dispatches_on_declared_format() {
        let json = br#"{"site":{"id":"S9","name":"n","zipCode":"z"},"date":{"month":1,"day":2,"year":2024},"vaccines":[]}"#;
        let report = parse_report(json, PayloadFormat::Json, false).expect("json parses");
        assert_eq!(report.site_id, "S9");

        let error = parse_report(json, PayloadFormat::Xml, false)
            .expect_err("json body declared as xml should fail");
        assert!(matches!(error, ParseError::Xml(_)));
        assert!(!error.is_format_error());
    }
}
