//! The normalized citation record the engine works on.
//!
//! A [`Record`] is built once from a [`RawCitation`] and from then on only its
//! `group_label` and `is_retained` fields change, inside the clusterer and the enricher.

use crate::normalize::{author_forms, extract_dois, extract_issns, journal_variants, parse_pages, title_forms};
use crate::regex::Regex;
use crate::utils::parse_year;
use crate::RawCitation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

static REGISTRY_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(nct[0-9]{8}|isrctn[0-9]{8}|actrn[0-9]{14}|drks[0-9]{8}|chictr-?[a-z]{0,4}-?[0-9]{6,})\b")
        .unwrap()
});

static REGISTRY_SOURCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)clinicaltrials\.gov|\bisrctn\b|\banzctr\b|\bictrp\b|\bchictr\b|\bdrks\b|eu clinical trials register|clinicaltrialsregister\.eu|\btrials? regist",
    )
    .unwrap()
});

const COCHRANE_DOI_PREFIX: &str = "10.1002/14651858";

const BOOK_TYPE_PREFIXES: [&str; 9] = [
    "book", "chap", "ebook", "edbook", "conf", "cpaper", "inproceedings", "proceedings", "thes",
];

/// A citation in its normalized comparison form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier; carries the reserved prefix when the record comes from a prior collection
    pub id: String,
    /// 0 when unknown
    pub publication_year: i32,
    /// Primary title as written
    pub title: String,
    pub title_variants: Vec<String>,
    /// Primary title as written, set only for replies
    pub reply_title: Option<String>,
    pub journal_variants: Vec<String>,
    pub author_keys: Vec<String>,
    pub author_keys_transposed: Vec<String>,
    /// Whole-list author strings, empty when no author produced a key
    pub joined_author_forms: Vec<String>,
    pub has_raw_authors: bool,
    pub dois: BTreeSet<String>,
    pub issns_or_isbns: BTreeSet<String>,
    pub page_start: String,
    pub page_for_comparison: String,
    pub pages_output: String,
    pub is_reply: bool,
    pub is_phase_trial: bool,
    pub is_cochrane: bool,
    pub is_clinical_trial_registry: bool,
    pub has_multiple_page_ranges: bool,
    /// Book, chapter, proceedings or thesis
    pub is_book: bool,
    pub group_label: Option<String>,
    pub is_retained: bool,
    pub from_prior_collection: bool,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            id: String::new(),
            publication_year: 0,
            title: String::new(),
            title_variants: Vec::new(),
            reply_title: None,
            journal_variants: Vec::new(),
            author_keys: Vec::new(),
            author_keys_transposed: Vec::new(),
            joined_author_forms: Vec::new(),
            has_raw_authors: false,
            dois: BTreeSet::new(),
            issns_or_isbns: BTreeSet::new(),
            page_start: String::new(),
            page_for_comparison: String::new(),
            pages_output: String::new(),
            is_reply: false,
            is_phase_trial: false,
            is_cochrane: false,
            is_clinical_trial_registry: false,
            has_multiple_page_ranges: false,
            is_book: false,
            group_label: None,
            is_retained: true,
            from_prior_collection: false,
        }
    }
}

impl Record {
    /// Normalizes every field of a raw citation. Never fails: unusable fields end up empty.
    pub fn from_raw(raw: &RawCitation) -> Self {
        let titles = title_forms(&raw.titles);
        let authors = author_forms(&raw.authors);
        let dois = extract_dois(&raw.dois);
        let pages = parse_pages(&raw.pages).unwrap_or_default();
        let journals = journal_variants(&raw.journals);

        let is_cochrane = raw.hints.cochrane
            || raw
                .journals
                .iter()
                .any(|j| j.to_lowercase().contains("cochrane database"))
            || dois.iter().any(|d| d.starts_with(COCHRANE_DOI_PREFIX));
        let is_clinical_trial_registry = raw.hints.trial_registry
            || raw.journals.iter().any(|j| REGISTRY_SOURCE_REGEX.is_match(j));

        let mut page_for_comparison = pages.page_for_comparison;
        if is_clinical_trial_registry {
            if let Some(registry_id) = registry_id(raw) {
                page_for_comparison = registry_id;
            }
        }

        let is_book = raw.reference_type.as_deref().is_some_and(|t| {
            let t = t.trim().to_lowercase();
            BOOK_TYPE_PREFIXES.iter().any(|p| t.starts_with(p))
        });

        Self {
            id: raw.id.clone().unwrap_or_default(),
            publication_year: raw.year.as_deref().map_or(0, parse_year),
            title: raw
                .titles
                .iter()
                .map(|t| t.trim())
                .find(|t| !t.is_empty())
                .unwrap_or_default()
                .to_string(),
            title_variants: titles.variants,
            reply_title: titles.reply_title,
            journal_variants: journals,
            author_keys: authors.keys,
            author_keys_transposed: authors.keys_transposed,
            joined_author_forms: authors.joined,
            has_raw_authors: authors.has_raw_authors,
            dois,
            issns_or_isbns: extract_issns(&raw.issns),
            page_start: pages.page_start,
            page_for_comparison,
            pages_output: pages.pages_output,
            is_reply: raw.hints.reply || titles.is_reply,
            is_phase_trial: raw.hints.phase_trial || titles.is_phase_trial,
            is_cochrane,
            is_clinical_trial_registry,
            has_multiple_page_ranges: pages.multiple_ranges,
            is_book,
            group_label: None,
            is_retained: true,
            from_prior_collection: false,
        }
    }

    /// Whether the record has a page numeral to compare.
    pub fn has_pages(&self) -> bool {
        !self.page_for_comparison.is_empty()
    }

    pub fn has_dois(&self) -> bool {
        !self.dois.is_empty()
    }

    /// Whether the two records share at least one DOI.
    pub fn shares_doi(&self, other: &Record) -> bool {
        !self.dois.is_disjoint(&other.dois)
    }
}

/// First trial-registry identifier in the page fields, then the titles.
fn registry_id(raw: &RawCitation) -> Option<String> {
    let pages = &raw.pages;
    [&pages.article_number, &pages.secondary, &pages.primary]
        .into_iter()
        .flatten()
        .chain(&raw.titles)
        .find_map(|field| REGISTRY_ID_REGEX.captures(field))
        .map(|caps| caps[1].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PageFields, RecordHints};
    use pretty_assertions::assert_eq;

    fn citation() -> RawCitation {
        RawCitation {
            id: Some("7".to_string()),
            titles: vec!["Aspirin for the prevention of stroke".to_string()],
            journals: vec!["BMJ (Clinical research ed.)".to_string()],
            authors: vec!["Smith, John".to_string(), "Cobos Mateos, J. M.".to_string()],
            year: Some("2020///".to_string()),
            pages: PageFields {
                primary: Some("m1234-45".to_string()),
                ..Default::default()
            },
            dois: vec!["https://doi.org/10.1136/BMJ.M1234".to_string()],
            issns: vec!["0959-8138 (Print)".to_string()],
            reference_type: Some("JOUR".to_string()),
            hints: RecordHints::default(),
        }
    }

    #[test]
    fn test_from_raw() {
        let record = Record::from_raw(&citation());
        assert_eq!(record.id, "7");
        assert_eq!(record.publication_year, 2020);
        assert_eq!(record.title, "Aspirin for the prevention of stroke");
        assert_eq!(record.title_variants[0], "aspirin for the prevention of stroke");
        assert_eq!(record.journal_variants, vec!["bmj".to_string()]);
        assert_eq!(
            record.joined_author_forms,
            vec![
                "Smith J; Cobos Mateos JM".to_string(),
                "Smith J; Mateos JMC".to_string()
            ]
        );
        assert!(record.dois.contains("10.1136/bmj.m1234"));
        assert!(record.issns_or_isbns.contains("0959-8138"));
        assert_eq!(record.page_for_comparison, "1234");
        assert_eq!(record.pages_output, "m1234-m1245");
        assert!(record.is_retained);
        assert!(!record.is_reply);
        assert!(!record.is_cochrane);
        assert!(!record.is_book);
        assert_eq!(record.group_label, None);
    }

    #[test]
    fn test_missing_year_is_zero() {
        let mut raw = citation();
        raw.year = None;
        assert_eq!(Record::from_raw(&raw).publication_year, 0);
        raw.year = Some("in press".to_string());
        assert_eq!(Record::from_raw(&raw).publication_year, 0);
    }

    #[test]
    fn test_cochrane_detection() {
        let mut raw = citation();
        raw.journals = vec!["Cochrane Database of Systematic Reviews".to_string()];
        raw.dois.clear();
        assert!(Record::from_raw(&raw).is_cochrane);

        let mut raw = citation();
        raw.dois = vec!["10.1002/14651858.CD000001.pub2".to_string()];
        assert!(Record::from_raw(&raw).is_cochrane);

        let mut raw = citation();
        raw.hints.cochrane = true;
        assert!(Record::from_raw(&raw).is_cochrane);
    }

    #[test]
    fn test_registry_id_replaces_page() {
        let mut raw = citation();
        raw.journals = vec!["ClinicalTrials.gov".to_string()];
        raw.pages = PageFields {
            primary: Some("12".to_string()),
            ..Default::default()
        };
        raw.titles = vec!["A trial of aspirin (nct01234567)".to_string()];
        let record = Record::from_raw(&raw);
        assert!(record.is_clinical_trial_registry);
        assert_eq!(record.page_for_comparison, "NCT01234567");

        raw.titles = vec!["A trial of aspirin".to_string()];
        assert_eq!(Record::from_raw(&raw).page_for_comparison, "12");
    }

    #[test]
    fn test_book_reference_types() {
        for kind in ["BOOK", "CHAP", "CONF", "inproceedings", "Thesis"] {
            let mut raw = citation();
            raw.reference_type = Some(kind.to_string());
            assert!(Record::from_raw(&raw).is_book, "{kind}");
        }
    }

    #[test]
    fn test_hints_are_or_ed_with_detection() {
        let mut raw = citation();
        raw.hints.reply = true;
        raw.hints.phase_trial = true;
        let record = Record::from_raw(&raw);
        assert!(record.is_reply);
        assert!(record.is_phase_trial);
        // reply_title follows the title text, not the hint
        assert_eq!(record.reply_title, None);
    }
}
