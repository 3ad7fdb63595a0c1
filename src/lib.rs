//! Deduplication of bibliographic citation exports.
//!
//! `citedupe` merges citation records that describe the same publication, the typical
//! chore after combining several database exports before a literature-review screening.
//! It is built for collections of tens of thousands of records: comparison only happens
//! inside year windows, and every comparison is a short-circuiting chain of cheap tests.
//!
//! # Key Features
//!
//! - **Field normalization**: titles (with reversed and subtitle variants), journal names
//!   (abbreviations, bilingual names, acronyms), author lists (with transposed compound
//!   surnames), page ranges, DOIs and ISSN/ISBN identifiers
//! - **Calibrated fuzzy matching**: Jaro-Winkler thresholds per field, with special
//!   handling of replies, phase trials, Cochrane reviews and trial-registry entries
//! - **Enrichment**: the retained record of a group absorbs DOIs, year and pages from
//!   its duplicates
//! - **Incremental merge**: deduplicate a new export against an already deduplicated one
//!   and keep only what is genuinely new
//!
//! # Basic Usage
//!
//! ```rust
//! use citedupe::RawCitation;
//! use citedupe::dedupe::Deduplicator;
//!
//! let citations = vec![
//!     RawCitation {
//!         id: Some("1".to_string()),
//!         titles: vec!["Aspirin for the prevention of stroke".to_string()],
//!         authors: vec!["Smith, John".to_string()],
//!         journals: vec!["BMJ".to_string()],
//!         year: Some("2020".to_string()),
//!         dois: vec!["10.1136/bmj.m1234".to_string()],
//!         ..Default::default()
//!     },
//!     RawCitation {
//!         id: Some("2".to_string()),
//!         titles: vec!["Aspirin for the prevention of stroke.".to_string()],
//!         authors: vec!["Smith, J.".to_string()],
//!         journals: vec!["British Medical Journal".to_string()],
//!         year: Some("2020".to_string()),
//!         dois: vec!["https://doi.org/10.1136/BMJ.M1234".to_string()],
//!         ..Default::default()
//!     },
//! ];
//!
//! let outcome = Deduplicator::new().dedupe(&citations).unwrap();
//! assert_eq!(outcome.retained().count(), 1);
//! ```
//!
//! # Error Handling
//!
//! Input-integrity problems (missing or duplicate ids, no usable publication years) abort
//! the run with a [`dedupe::DedupeError`] before anything is produced. Everything else
//! degrades gracefully: a field that cannot be normalized simply stops contributing to
//! comparisons.
//!
//! # Thread Safety
//!
//! A run owns all of its state. Compiled patterns are immutable statics, so independent
//! runs can proceed on as many threads as the host likes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "csv")]
extern crate csv as csv_crate;

pub mod cluster;
pub mod compare;
#[cfg(feature = "csv")]
pub mod csv;
pub mod dedupe;
pub mod enrich;
pub mod normalize;
pub mod record;
pub mod window;

mod regex;
mod utils;

// Reexports
pub use compare::{AuthorComparator, JaroWinklerAuthors};
#[cfg(feature = "csv")]
pub use csv::CsvLoader;
pub use dedupe::{DedupeError, DedupeOutcome, DedupedRecord, Deduplicator, DeduplicatorConfig};
pub use record::Record;

/// A specialized Result type for citation operations.
pub type Result<T> = std::result::Result<T, CitationError>;

/// Errors surfaced by the crate's loading and deduplication entry points.
#[derive(Error, Debug)]
pub enum CitationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Dedupe(#[from] DedupeError),
}

#[cfg(feature = "csv")]
impl From<csv_crate::Error> for CitationError {
    fn from(err: csv_crate::Error) -> Self {
        CitationError::InvalidFormat(err.to_string())
    }
}

/// The up to three page-like fields an export may carry for one record.
///
/// Exports disagree on where pages live: some use the article-number field, some a
/// secondary start/end field, most the plain start/end field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFields {
    /// Primary start/end page field (e.g. `SP`/`EP`)
    pub primary: Option<String>,
    /// Secondary start/end page field
    pub secondary: Option<String>,
    /// Article number field (e.g. `C7`)
    pub article_number: Option<String>,
}

/// Flags the external parser may already know about a record.
///
/// Each hint is OR-ed with what the normalizer detects on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHints {
    pub reply: bool,
    pub phase_trial: bool,
    pub trial_registry: bool,
    pub cochrane: bool,
}

/// One citation as delivered by an external format parser.
///
/// All values are raw field text; nothing is normalized yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCitation {
    /// Identifier, unique within its collection
    pub id: Option<String>,
    /// Titles; the first one is the primary title
    pub titles: Vec<String>,
    /// Journal or container titles, full and abbreviated
    pub journals: Vec<String>,
    /// Authors in "Surname, Given" form
    pub authors: Vec<String>,
    /// Publication year, possibly with trailing date noise ("2020///")
    pub year: Option<String>,
    /// Page-like fields
    pub pages: PageFields,
    /// DOI fields and any URL fields that may carry a DOI
    pub dois: Vec<String>,
    /// ISSN or ISBN fields
    pub issns: Vec<String>,
    /// Reference type (e.g. "JOUR", "BOOK", "CONF")
    pub reference_type: Option<String>,
    /// Parser-side hints
    pub hints: RecordHints,
}
