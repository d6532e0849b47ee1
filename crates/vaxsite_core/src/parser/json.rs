use serde::Deserialize;

use super::ParseError;
use crate::aggregate::ShotTotals;
use crate::report::{compose_date, SiteReport};

#[derive(Debug, Deserialize)]
struct SiteDocument {
    site: SiteSection,
    date: DateSection,
    vaccines: Vec<VaccineEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteSection {
    id: String,
    name: String,
    zip_code: String,
}

#[derive(Debug, Deserialize)]
struct DateSection {
    month: i32,
    day: i32,
    year: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VaccineEntry {
    first_shot: i32,
    second_shot: i32,
}

/// Parses the nested `site` / `date` / `vaccines[]` object graph.
///
/// Unlike the XML path every vaccine entry must carry both integer counts;
/// one incomplete entry fails the whole record.
pub fn parse_json_report(payload: &[u8], is_correction: bool) -> Result<SiteReport, ParseError> {
    let text = std::str::from_utf8(payload)?;
    let document: SiteDocument = serde_json::from_str(text)?;

    let mut totals = ShotTotals::default();
    for vaccine in &document.vaccines {
        totals.add_first(vaccine.first_shot)?;
        totals.add_second(vaccine.second_shot)?;
    }

    Ok(SiteReport {
        site_id: document.site.id,
        name: document.site.name,
        zip_code: document.site.zip_code,
        date: compose_date(document.date.month, document.date.day, document.date.year),
        total_first_shots: totals.first,
        total_second_shots: totals.second,
        is_correction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_all_vaccine_entries() {
        let payload = br#"{"site":{"id":"S1","name":"Clinic A","zipCode":"12345"},"date":{"month":5,"day":16,"year":2023},"vaccines":[{"firstShot":10,"secondShot":7},{"firstShot":3,"secondShot":2}]}"#;

        let report = parse_json_report(payload, false).expect("payload should parse");

        assert_eq!(
            report,
            SiteReport {
                site_id: "S1".to_string(),
                name: "Clinic A".to_string(),
                zip_code: "12345".to_string(),
                date: "5/16/2023".to_string(),
                total_first_shots: 13,
                total_second_shots: 9,
                is_correction: false,
            }
        );
    }

    #[test]
    fn ignores_extra_vaccine_attributes() {
        let payload = br#"{"site":{"id":"S2","name":"n","zipCode":"z"},"date":{"month":12,"day":1,"year":2021},"vaccines":[{"brand":"Pfizer","firstShot":4,"secondShot":1}]}"#;

        let report = parse_json_report(payload, true).expect("payload should parse");
        assert_eq!(report.total_first_shots, 4);
        assert_eq!(report.total_second_shots, 1);
        assert_eq!(report.date, "12/1/2021");
        assert!(report.is_correction);
    }

    #[test]
    fn entry_missing_a_count_fails_the_record() {
        let payload = br#"{"site":{"id":"S3","name":"n","zipCode":"z"},"date":{"month":1,"day":1,"year":2022},"vaccines":[{"firstShot":4,"secondShot":1},{"firstShot":2}]}"#;

        let error = parse_json_report(payload, false).expect_err("incomplete entry should fail");
        assert!(matches!(error, ParseError::Json(_)));
        assert!(error.to_string().contains("secondShot"));
    }

    #[test]
    fn non_integer_count_fails_the_record() {
        let payload = br#"{"site":{"id":"S4","name":"n","zipCode":"z"},"date":{"month":1,"day":1,"year":2022},"vaccines":[{"firstShot":"many","secondShot":1}]}"#;

        let error = parse_json_report(payload, false).expect_err("string count should fail");
        assert!(matches!(error, ParseError::Json(_)));
    }

    #[test]
    fn non_utf8_payload_is_an_encoding_error() {
        let error = parse_json_report(b"{\"site\":\"\xff\"}", false)
            .expect_err("invalid bytes should fail");
        assert!(matches!(error, ParseError::InvalidEncoding(_)));
    }

    #[test]
    fn missing_site_section_fails() {
        let payload = br#"{"date":{"month":1,"day":1,"year":2022},"vaccines":[]}"#;

        let error = parse_json_report(payload, false).expect_err("missing site should fail");
        assert!(error.to_string().contains("site"));
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        let payload = format!(
            r#"{{"site":{{"id":"S5","name":"n","zipCode":"z"}},"date":{{"month":1,"day":1,"year":2022}},"vaccines":[{{"firstShot":{max},"secondShot":0}},{{"firstShot":1,"secondShot":0}}]}}"#,
            max = i32::MAX
        );

        let error = parse_json_report(payload.as_bytes(), false).expect_err("overflow should fail");
        assert!(matches!(
            error,
            ParseError::ShotCountOverflow { field: "firstShot" }
        ));
    }
}
