use roxmltree::{Document, Node};

use super::ParseError;
use crate::aggregate::ShotTotals;
use crate::report::{compose_date, SiteReport};

/// Parses `<data month day year><site id><name/><zipCode/></site><vaccines><brand>..</brand></vaccines></data>`.
///
/// Shot leaves whose text is not an integer are skipped rather than failing the record.
pub fn parse_xml_report(payload: &[u8], is_correction: bool) -> Result<SiteReport, ParseError> {
    let text = std::str::from_utf8(payload)?;
    let document = Document::parse(text)?;
    let data = document.root_element();
    if !data.has_tag_name("data") {
        return Err(ParseError::MissingField("data"));
    }

    let site = child(data, "site").ok_or(ParseError::MissingField("site"))?;
    let site_id = site
        .attribute("id")
        .ok_or(ParseError::MissingField("site.id"))?;
    let month = data
        .attribute("month")
        .ok_or(ParseError::MissingField("data.month"))?;
    let day = data
        .attribute("day")
        .ok_or(ParseError::MissingField("data.day"))?;
    let year = data
        .attribute("year")
        .ok_or(ParseError::MissingField("data.year"))?;

    let mut totals = ShotTotals::default();
    let brands = children(data, "vaccines").flat_map(|vaccines| children(vaccines, "brand"));
    for brand in brands {
        for count in children(brand, "firstShot").filter_map(shot_count) {
            totals.add_first(count)?;
        }
        for count in children(brand, "secondShot").filter_map(shot_count) {
            totals.add_second(count)?;
        }
    }

    Ok(SiteReport {
        site_id: site_id.to_string(),
        name: child_text(site, "name"),
        zip_code: child_text(site, "zipCode"),
        date: compose_date(month, day, year),
        total_first_shots: totals.first,
        total_second_shots: totals.second,
        is_correction,
    })
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|candidate| candidate.has_tag_name(name))
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |candidate| candidate.has_tag_name(name))
}

fn child_text(node: Node<'_, '_>, name: &str) -> String {
    child(node, name).map(element_text).unwrap_or_default()
}

fn element_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|descendant| descendant.is_text())
        .filter_map(|descendant| descendant.text())
        .collect()
}

fn shot_count(node: Node<'_, '_>) -> Option<i32> {
    element_text(node).trim().parse().ok()
}
