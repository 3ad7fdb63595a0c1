//! Pairwise duplicate detection.
//!
//! Two records are duplicates when four tests pass, in this order:
//!
//! 1. **Pages or DOI**: equal leading page numeral, or a shared DOI when pages are missing
//! 2. **Authors**: delegated to an [`AuthorComparator`]
//! 3. **Title**: best Jaro-Winkler similarity over all title variants
//! 4. **Journal or ISSN**: shared ISSN/ISBN, or journal names that are equal, close,
//!    or an abbreviation or acronym of one another
//!
//! The chain stops at the first failing test. Every test is symmetric, so the order of
//! the two records never matters.

pub mod authors;

pub use authors::{AuthorComparator, JaroWinklerAuthors};

use crate::normalize::journal::{is_abbreviation_of, is_acronym_of};
use crate::record::Record;
use itertools::Itertools;
use strsim::jaro_winkler;

const PHASE_TRIAL_TITLE_THRESHOLD: f64 = 0.96;
const DOI_EVIDENCE_TITLE_THRESHOLD: f64 = 0.89;
const PAGE_EVIDENCE_TITLE_THRESHOLD: f64 = 0.90;
const NO_EVIDENCE_TITLE_THRESHOLD: f64 = 0.94;

const JOURNAL_THRESHOLD: f64 = 0.90;
const REPLY_JOURNAL_THRESHOLD: f64 = 0.93;

/// Which identifying fields both records of a pair carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evidence {
    /// Both records have a page numeral
    pub sufficient_pages: bool,
    /// Both records have at least one DOI
    pub sufficient_dois: bool,
}

impl Evidence {
    pub fn between(a: &Record, b: &Record) -> Self {
        Self {
            sufficient_pages: a.has_pages() && b.has_pages(),
            sufficient_dois: a.has_dois() && b.has_dois(),
        }
    }

    pub fn any(self) -> bool {
        self.sufficient_pages || self.sufficient_dois
    }
}

/// Decides whether two records describe the same publication.
#[derive(Debug, Clone, Copy)]
pub struct PairwiseComparator<'a> {
    authors: &'a dyn AuthorComparator,
}

impl<'a> PairwiseComparator<'a> {
    pub fn new(authors: &'a dyn AuthorComparator) -> Self {
        Self { authors }
    }

    pub fn is_duplicate(&self, a: &Record, b: &Record) -> bool {
        let evidence = Evidence::between(a, b);
        pages_or_doi_match(a, b, evidence)
            && self.authors.authors_match(a, b, evidence)
            && titles_match(a, b, evidence)
            && journals_match(a, b)
    }
}

fn pages_or_doi_match(a: &Record, b: &Record, evidence: Evidence) -> bool {
    if !evidence.any() {
        return true;
    }
    let same_page = || a.page_for_comparison == b.page_for_comparison;

    // Cochrane reviews keep their DOI stem across versions, so year separates them
    if a.is_cochrane || b.is_cochrane {
        if a.publication_year != b.publication_year {
            return false;
        }
        return if evidence.sufficient_dois {
            a.shares_doi(b)
        } else {
            same_page()
        };
    }

    if a.has_multiple_page_ranges || b.has_multiple_page_ranges {
        return (evidence.sufficient_dois && a.shares_doi(b))
            || (evidence.sufficient_pages && same_page());
    }

    if evidence.sufficient_pages {
        same_page()
    } else {
        a.shares_doi(b)
    }
}

fn titles_match(a: &Record, b: &Record, evidence: Evidence) -> bool {
    if a.is_reply || b.is_reply {
        return true;
    }
    if a.is_clinical_trial_registry && b.is_clinical_trial_registry {
        return true;
    }

    max_similarity(&a.title_variants, &b.title_variants) > title_threshold(a, b, evidence)
}

fn title_threshold(a: &Record, b: &Record, evidence: Evidence) -> f64 {
    if a.is_phase_trial || b.is_phase_trial {
        PHASE_TRIAL_TITLE_THRESHOLD
    } else if evidence.sufficient_dois {
        DOI_EVIDENCE_TITLE_THRESHOLD
    } else if evidence.sufficient_pages {
        PAGE_EVIDENCE_TITLE_THRESHOLD
    } else {
        NO_EVIDENCE_TITLE_THRESHOLD
    }
}

fn journals_match(a: &Record, b: &Record) -> bool {
    if !a.issns_or_isbns.is_disjoint(&b.issns_or_isbns) {
        return true;
    }
    let threshold = if a.is_reply || b.is_reply {
        REPLY_JOURNAL_THRESHOLD
    } else {
        JOURNAL_THRESHOLD
    };
    a.journal_variants
        .iter()
        .cartesian_product(&b.journal_variants)
        .any(|(x, y)| {
            x == y
                || jaro_winkler(x, y) > threshold
                || is_abbreviation_of(x, y)
                || is_abbreviation_of(y, x)
                || is_acronym_of(x, y)
                || is_acronym_of(y, x)
        })
}

/// Best Jaro-Winkler similarity over every pair drawn from the two lists, 0 if either
/// list is empty.
pub(crate) fn max_similarity(left: &[String], right: &[String]) -> f64 {
    left.iter()
        .cartesian_product(right)
        .map(|(x, y)| jaro_winkler(x, y))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PageFields, RawCitation};
    use rstest::rstest;

    fn raw(id: &str, title: &str, journal: &str, doi: &str, pages: &str) -> RawCitation {
        let optional = |s: &str| (!s.is_empty()).then(|| s.to_string());
        RawCitation {
            id: Some(id.to_string()),
            titles: vec![title.to_string()],
            journals: vec![journal.to_string()],
            authors: vec![
                "Smith, John".to_string(),
                "Garcia, Maria".to_string(),
                "Chen, Wei".to_string(),
            ],
            year: Some("2020".to_string()),
            pages: PageFields {
                primary: optional(pages),
                ..Default::default()
            },
            dois: optional(doi).into_iter().collect(),
            ..Default::default()
        }
    }

    fn record(id: &str, title: &str, journal: &str, doi: &str, pages: &str) -> Record {
        Record::from_raw(&raw(id, title, journal, doi, pages))
    }

    fn is_duplicate(a: &Record, b: &Record) -> bool {
        PairwiseComparator::new(&JaroWinklerAuthors).is_duplicate(a, b)
    }

    const TITLE: &str = "Aspirin for the primary prevention of stroke in older adults";

    #[test]
    fn test_same_doi_different_journal_spelling() {
        let a = record("1", TITLE, "BMJ", "10.1136/bmj.m1234", "m1234");
        let b = record(
            "2",
            &format!("{TITLE}."),
            "British Medical Journal",
            "https://doi.org/10.1136/BMJ.M1234",
            "1234-1236",
        );
        assert!(is_duplicate(&a, &b));
        assert!(is_duplicate(&b, &a));
    }

    #[rstest]
    #[case("1234", "1234", true)]
    #[case("1234-40", "1234", true)]
    #[case("1234", "1235", false)]
    fn test_pages_decide_when_present(
        #[case] left: &str,
        #[case] right: &str,
        #[case] expected: bool,
    ) {
        let a = record("1", TITLE, "Stroke", "10.1000/a", left);
        let b = record("2", TITLE, "Stroke", "10.1000/b", right);
        assert_eq!(is_duplicate(&a, &b), expected);
    }

    #[test]
    fn test_doi_decides_without_pages() {
        let a = record("1", TITLE, "Stroke", "10.1000/a", "");
        let b = record("2", TITLE, "Stroke", "10.1000/a", "");
        let c = record("3", TITLE, "Stroke", "10.1000/c", "");
        assert!(is_duplicate(&a, &b));
        assert!(!is_duplicate(&a, &c));
    }

    #[test]
    fn test_no_pages_and_no_dois_passes_first_test() {
        let a = record("1", TITLE, "Stroke", "", "");
        let b = record("2", TITLE, "Stroke", "", "");
        assert!(is_duplicate(&a, &b));
    }

    #[test]
    fn test_cochrane_requires_same_year() {
        let doi = "10.1002/14651858.CD000001.pub2";
        let a = record("1", TITLE, "Cochrane Database of Systematic Reviews", doi, "");
        let mut b = record("2", TITLE, "Cochrane Database of Systematic Reviews", doi, "");
        assert!(a.is_cochrane);
        assert!(is_duplicate(&a, &b));
        b.publication_year = 2021;
        assert!(!is_duplicate(&a, &b));
    }

    #[rstest]
    #[case("123", true)]
    #[case("456", false)]
    fn test_cochrane_falls_back_to_pages_without_both_dois(
        #[case] pages: &str,
        #[case] expected: bool,
    ) {
        let journal = "Cochrane Database of Systematic Reviews";
        let a = record("1", TITLE, journal, "10.1002/14651858.CD000001.pub2", "123");
        let b = record("2", TITLE, journal, "", pages);
        assert!(a.is_cochrane && b.is_cochrane);
        assert_eq!(is_duplicate(&a, &b), expected);
        assert_eq!(is_duplicate(&b, &a), expected);
    }

    #[test]
    fn test_registry_entries_match_on_identifier_not_title() {
        let registry = |id: &str, title: &str| {
            Record::from_raw(&RawCitation {
                id: Some(id.to_string()),
                titles: vec![title.to_string()],
                journals: vec!["ClinicalTrials.gov".to_string()],
                year: Some("2020".to_string()),
                ..Default::default()
            })
        };
        let a = registry("1", "Low-dose aspirin after ischaemic stroke (NCT01234567)");
        let b = registry("2", "Secondary prevention with antiplatelets NCT01234567");
        assert!(a.is_clinical_trial_registry && b.is_clinical_trial_registry);
        assert!(is_duplicate(&a, &b));
        assert!(is_duplicate(&b, &a));

        let c = registry("3", "Low-dose aspirin after ischaemic stroke (NCT07654321)");
        assert!(!is_duplicate(&a, &c));
    }

    #[test]
    fn test_multiple_ranges_accept_doi_or_page() {
        let a = record("1", TITLE, "Stroke", "10.1000/a", "12-4, 18-20");
        let b = record("2", TITLE, "Stroke", "10.1000/a", "99");
        assert!(a.has_multiple_page_ranges);
        assert!(is_duplicate(&a, &b));

        let c = record("3", TITLE, "Stroke", "10.1000/c", "12");
        assert!(is_duplicate(&a, &c));

        let d = record("4", TITLE, "Stroke", "10.1000/d", "99");
        assert!(!is_duplicate(&a, &d));
    }

    #[test]
    fn test_different_titles() {
        let a = record("1", TITLE, "Stroke", "10.1000/a", "");
        let b = record(
            "2",
            "Statin therapy after myocardial infarction in younger women",
            "Stroke",
            "10.1000/a",
            "",
        );
        assert!(!is_duplicate(&a, &b));
    }

    #[rstest]
    #[case("A phase 2 trial of drug X", "10.1000/a", "12", 0.96)]
    #[case(TITLE, "10.1000/a", "12", 0.89)]
    #[case(TITLE, "", "12", 0.90)]
    #[case(TITLE, "", "", 0.94)]
    fn test_title_threshold(
        #[case] title: &str,
        #[case] doi: &str,
        #[case] pages: &str,
        #[case] expected: f64,
    ) {
        let a = record("1", title, "Lancet", doi, pages);
        let b = record("2", TITLE, "Lancet", doi, pages);
        assert_eq!(title_threshold(&a, &b, Evidence::between(&a, &b)), expected);
        assert_eq!(title_threshold(&b, &a, Evidence::between(&b, &a)), expected);
    }

    #[test]
    fn test_reply_titles_are_not_compared() {
        let a = record("1", "Reply to: aspirin and stroke", "Lancet", "", "101");
        let b = record("2", "Authors' reply", "Lancet", "", "101");
        assert!(a.is_reply);
        assert!(is_duplicate(&a, &b));
    }

    #[rstest]
    #[case("J Clin Oncol", "Journal of Clinical Oncology", true)]
    #[case("JAMA", "Journal of the American Medical Association", true)]
    #[case("Lancet", "The Lancet", true)]
    #[case("Lancet", "Stroke", false)]
    fn test_journal_matching(#[case] left: &str, #[case] right: &str, #[case] expected: bool) {
        let a = record("1", TITLE, left, "10.1000/a", "");
        let b = record("2", TITLE, right, "10.1000/a", "");
        assert_eq!(journals_match(&a, &b), expected);
        assert_eq!(journals_match(&b, &a), expected);
    }

    #[test]
    fn test_shared_issn_replaces_journal_name() {
        let mut a = raw("1", TITLE, "Lancet", "10.1000/a", "");
        let mut b = raw("2", TITLE, "Some Other Name", "10.1000/a", "");
        a.issns = vec!["0140-6736".to_string()];
        b.issns = vec!["01406736".to_string()];
        assert!(is_duplicate(&Record::from_raw(&a), &Record::from_raw(&b)));
    }

    #[test]
    fn test_comparator_is_symmetric() {
        let records = [
            record("1", TITLE, "BMJ", "10.1136/bmj.m1234", "m1234"),
            record("2", TITLE, "British Medical Journal", "10.1136/bmj.m1234", ""),
            record("3", "Reply to: aspirin and stroke", "BMJ", "", "1234"),
            record("4", TITLE, "Stroke", "", ""),
            record("5", "A phase 2 trial of drug X", "Lancet", "", "12-4, 18-20"),
            record("6", "A phase 2 trial of drug X.", "Lancet", "10.1000/x", "12"),
        ];
        for a in &records {
            for b in &records {
                assert_eq!(is_duplicate(a, b), is_duplicate(b, a), "{} vs {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn test_max_similarity() {
        assert_eq!(max_similarity(&[], &["a".to_string()]), 0.0);
        let left = vec!["abc".to_string(), "xyz".to_string()];
        let right = vec!["xyz".to_string()];
        assert_eq!(max_similarity(&left, &right), 1.0);
    }
}
