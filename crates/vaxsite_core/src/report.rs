use serde::{Deserialize, Serialize};

/// Payload shapes accepted by the ingest pipeline, selected by the object tag key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    Xml,
    Json,
}

impl PayloadFormat {
    pub fn from_tag_key(tag_key: &str) -> Option<Self> {
        match tag_key {
            "xml" => Some(Self::Xml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One uploaded vaccination-site record, normalized from either payload format.
///
/// Built once per ingested object and handed by value from parsing to
/// reconciliation; nothing about it is shared between objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteReport {
    pub site_id: String,
    pub name: String,
    pub zip_code: String,
    /// `M/D/YYYY`, composed from the payload's month, day and year fields.
    pub date: String,
    pub total_first_shots: i32,
    pub total_second_shots: i32,
    pub is_correction: bool,
}

pub fn compose_date(
    month: impl std::fmt::Display,
    day: impl std::fmt::Display,
    year: impl std::fmt::Display,
) -> String {
    format!("{month}/{day}/{year}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_only_lowercase_format_tags() {
        assert_eq!(PayloadFormat::from_tag_key("xml"), Some(PayloadFormat::Xml));
        assert_eq!(PayloadFormat::from_tag_key("json"), Some(PayloadFormat::Json));
        assert_eq!(PayloadFormat::from_tag_key("csv"), None);
        assert_eq!(PayloadFormat::from_tag_key(""), None);
    }

    #[test]
    fn composes_date_without_padding() {
        assert_eq!(compose_date(5, 16, 2023), "5/16/2023");
        assert_eq!(compose_date("05", "6", "2023"), "05/6/2023");
    }
}
