//! Author list comparison.

use super::{Evidence, max_similarity};
use crate::record::Record;
use std::fmt;

const AUTHOR_THRESHOLD: f64 = 0.67;
const REPLY_WITH_EVIDENCE_THRESHOLD: f64 = 0.75;
const REPLY_WITHOUT_EVIDENCE_THRESHOLD: f64 = 0.80;

/// ISBNs are stored without hyphens; ISSNs are 9 characters.
const MIN_ISBN_CHARS: usize = 10;

/// Strategy deciding whether two records' author lists agree.
///
/// The pairwise comparator consults it after the pages-or-DOI test. Implementations must
/// be symmetric in `a` and `b` and free of interior state, since one instance serves
/// every comparison of a run.
///
/// # Examples
///
/// ```
/// use citedupe::compare::{AuthorComparator, Evidence};
/// use citedupe::record::Record;
///
/// /// Ignores authors entirely.
/// #[derive(Debug)]
/// struct AnyAuthors;
///
/// impl AuthorComparator for AnyAuthors {
///     fn authors_match(&self, _a: &Record, _b: &Record, _evidence: Evidence) -> bool {
///         true
///     }
/// }
/// ```
pub trait AuthorComparator: fmt::Debug + Send + Sync {
    fn authors_match(&self, a: &Record, b: &Record, evidence: Evidence) -> bool;
}

/// Default strategy: best Jaro-Winkler similarity between the joined author lists,
/// plain and transposed forms alike.
#[derive(Debug, Default, Clone, Copy)]
pub struct JaroWinklerAuthors;

impl AuthorComparator for JaroWinklerAuthors {
    fn authors_match(&self, a: &Record, b: &Record, evidence: Evidence) -> bool {
        let is_reply = a.is_reply || b.is_reply;

        if a.joined_author_forms.is_empty() || b.joined_author_forms.is_empty() {
            // Nothing to compare: accept only on corroborating evidence
            return shares_isbn(a, b)
                || shares_registry_id(a, b)
                || (!a.has_raw_authors && !b.has_raw_authors && (a.is_book || b.is_book))
                || (!evidence.any() && !is_reply);
        }

        let threshold = match (is_reply, evidence.any()) {
            (false, _) => AUTHOR_THRESHOLD,
            (true, true) => REPLY_WITH_EVIDENCE_THRESHOLD,
            (true, false) => REPLY_WITHOUT_EVIDENCE_THRESHOLD,
        };
        max_similarity(&a.joined_author_forms, &b.joined_author_forms) > threshold
    }
}

fn shares_isbn(a: &Record, b: &Record) -> bool {
    a.issns_or_isbns
        .intersection(&b.issns_or_isbns)
        .any(|id| id.len() >= MIN_ISBN_CHARS)
}

/// Registry records compare their trial identifier as their page.
fn shares_registry_id(a: &Record, b: &Record) -> bool {
    a.is_clinical_trial_registry
        && b.is_clinical_trial_registry
        && a.has_pages()
        && a.page_for_comparison == b.page_for_comparison
}
