//! DOI and ISSN/ISBN extraction.

use crate::regex::Regex;
use crate::utils::decode_html_entities;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::trace;

static DOI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"10\.[0-9]{4,9}/[^\s"<>]+"#).unwrap());

static ISSN_ISBN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[0-9][0-9-]{6,15}[0-9x]\b").unwrap());

/// Longer matches come from reference lists pasted into a DOI field.
const MAX_DOI_CHARS: usize = 100;

/// Collects every DOI found in a record's DOI and URL fields.
pub fn extract_dois(fields: &[String]) -> BTreeSet<String> {
    fields.iter().flat_map(|f| normalize_doi(f)).collect()
}

/// Extracts the DOIs in one field: percent-decoded, entity-decoded, lower-cased, with
/// trailing punctuation removed.
///
/// ```
/// use citedupe::normalize::normalize_doi;
///
/// assert_eq!(
///     normalize_doi("https://doi.org/10.1371%2FJOURNAL.PONE.11."),
///     vec!["10.1371/journal.pone.11"]
/// );
/// ```
pub fn normalize_doi(raw: &str) -> Vec<String> {
    let decoded = match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => {
            trace!(doi = raw, "DOI field is not valid percent-encoding");
            raw.to_string()
        }
    };
    let text = decode_html_entities(&decoded);

    DOI_REGEX
        .find_iter(&text)
        .filter_map(|m| {
            let doi = m.as_str();
            if doi.chars().count() > MAX_DOI_CHARS {
                trace!(doi, "discarding over-long DOI match");
                return None;
            }
            let doi = doi
                .trim_end_matches("[doi]")
                .trim_end_matches(['.', ',', ';', ')', ']'])
                .to_lowercase();
            Some(doi)
        })
        .collect()
}

/// Collects every ISSN and ISBN in a record's identifier fields.
///
/// 8-digit matches are ISSNs and come out hyphenated (`"0028-4793"`); longer matches are
/// ISBNs and come out without hyphens.
pub fn extract_issns(fields: &[String]) -> BTreeSet<String> {
    fields
        .iter()
        .flat_map(|f| ISSN_ISBN_REGEX.find_iter(f))
        .filter_map(|m| format_identifier(m.as_str()))
        .collect()
}

fn format_identifier(matched: &str) -> Option<String> {
    let digits: String = matched
        .chars()
        .filter_map(|c| match c {
            '0'..='9' => Some(c),
            'x' | 'X' => Some('X'),
            _ => None,
        })
        .collect();
    match digits.len() {
        8 => Some(format!("{}-{}", &digits[..4], &digits[4..])),
        10 | 13 => Some(digits),
        _ => None,
    }
}
