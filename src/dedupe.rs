//! Citation deduplication runs.
//!
//! The [`Deduplicator`] ties the pipeline together:
//!
//! 1. check the input (ids present and unique, at least one publication year)
//! 2. normalize every [`RawCitation`] into a [`Record`]
//! 3. cluster duplicates window by window
//! 4. keep one record per group and enrich it from the others
//!
//! ## Usage
//!
//! ### One collection
//!
//! ```rust
//! use citedupe::RawCitation;
//! use citedupe::dedupe::Deduplicator;
//!
//! let citation = |id: &str, title: &str| RawCitation {
//!     id: Some(id.to_string()),
//!     titles: vec![title.to_string()],
//!     authors: vec!["Smith, John".to_string()],
//!     journals: vec!["Journal of Clinical Oncology".to_string()],
//!     year: Some("2021".to_string()),
//!     dois: vec!["10.1200/JCO.20.01234".to_string()],
//!     ..Default::default()
//! };
//!
//! let citations = vec![
//!     citation("1", "Immunotherapy in advanced melanoma"),
//!     citation("2", "Immunotherapy in advanced melanoma."),
//! ];
//!
//! let outcome = Deduplicator::new().dedupe(&citations).unwrap();
//! let kept: Vec<&str> = outcome.retained().map(|r| r.id.as_str()).collect();
//! assert_eq!(kept, vec!["1"]);
//! assert_eq!(outcome.records[1].group_label.as_deref(), Some("1"));
//! ```
//!
//! ### Mark mode
//!
//! [`Deduplicator::mark`] only labels groups: every record comes back retained, and
//! removing duplicates is left to whoever writes the output.
//!
//! ### Two collections
//!
//! [`Deduplicator::merge`] deduplicates a new export against an already deduplicated
//! prior one and returns only the records that are genuinely new. A new record that
//! duplicates a prior record is dropped entirely.
//!
//! ```rust
//! use citedupe::RawCitation;
//! use citedupe::dedupe::Deduplicator;
//!
//! let citation = |id: &str, title: &str, doi: &str| RawCitation {
//!     id: Some(id.to_string()),
//!     titles: vec![title.to_string()],
//!     authors: vec!["Smith, John".to_string()],
//!     journals: vec!["Lancet".to_string()],
//!     year: Some("2021".to_string()),
//!     dois: vec![doi.to_string()],
//!     ..Default::default()
//! };
//!
//! let prior = vec![citation("1", "Statins for primary prevention", "10.1016/a")];
//! let new = vec![
//!     citation("1", "Statins for primary prevention.", "10.1016/a"),
//!     citation("2", "Exercise after hip fracture", "10.1016/b"),
//! ];
//!
//! let outcome = Deduplicator::new().merge(&prior, &new).unwrap();
//! let ids: Vec<&str> = outcome.records.iter().map(|r| r.id.as_str()).collect();
//! assert_eq!(ids, vec!["2"]);
//! ```
//!
//! ## Progress and cancellation
//!
//! The `*_with_progress` variants report [`ProgressEvent`]s to a [`ProgressSink`], which
//! any `FnMut(ProgressEvent)` closure is. A sink may also cancel the run between two
//! year windows.

use crate::cluster::{Clusterer, Clustering};
use crate::compare::{AuthorComparator, JaroWinklerAuthors, PairwiseComparator};
use crate::enrich::{Enrichment, enrich_groups};
use crate::record::Record;
use crate::utils::parse_year;
use crate::window::WindowOrder;
use crate::RawCitation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, info_span};

/// Error types for dedupe operations.
///
/// All of them are raised before any output is produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DedupeError {
    #[error("Record at position {index} has no id")]
    MissingId { index: usize },

    #[error("Duplicate record id: {id}")]
    DuplicateId { id: String },

    #[error("No record has a publication year")]
    NoPublicationYears,

    #[error("Record id {id} starts with the reserved prior-collection prefix")]
    ReservedIdPrefix { id: String },

    #[error("Deduplication cancelled before year {year}")]
    Cancelled { year: i32 },
}

/// Configuration options for a deduplication run.
///
/// Matching thresholds are calibrated constants and not configurable.
///
/// # Examples
///
/// ```
/// use citedupe::dedupe::{Deduplicator, DeduplicatorConfig};
///
/// let config = DeduplicatorConfig {
///     run_in_parallel: true,
///     ..Default::default()
/// };
/// let deduplicator = Deduplicator::new().with_config(config);
/// ```
#[derive(Debug, Clone)]
pub struct DeduplicatorConfig {
    /// Normalize records on the rayon thread pool. Clustering always runs on the calling
    /// thread. Has no effect without the `parallel` feature.
    pub run_in_parallel: bool,
    /// Marker prepended to the ids of prior-collection records during a merge.
    pub prior_id_prefix: String,
}

impl Default for DeduplicatorConfig {
    fn default() -> Self {
        Self {
            run_in_parallel: false,
            prior_id_prefix: "-".to_string(),
        }
    }
}

/// Coarse progress of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A year window is about to be clustered
    BucketStarted {
        year: i32,
        /// Zero-based position of the window in visiting order
        position: usize,
        total: usize,
        pool_size: usize,
    },
    /// Records found to duplicate another record so far
    DuplicatesFound { count: usize },
}

/// Receiver of [`ProgressEvent`]s, consulted for cancellation between windows.
pub trait ProgressSink {
    fn report(&mut self, event: ProgressEvent);

    /// Polled before each year window; `true` abandons the run.
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<F: FnMut(ProgressEvent)> ProgressSink for F {
    fn report(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _event: ProgressEvent) {}
}

/// One record of a run's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupedRecord {
    /// Id as supplied, without any prior-collection marker
    pub id: String,
    pub retained: bool,
    /// Id of the group's first record, `None` for records without duplicates
    pub group_label: Option<String>,
    pub from_prior_collection: bool,
    /// What a retained record gained from its duplicates
    pub enrichment: Option<Enrichment>,
}

/// Counters of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupeStats {
    /// Records deduplicated, both collections together for a merge
    pub records: usize,
    /// Groups of two or more records
    pub groups: usize,
    /// Records found to duplicate another
    pub duplicates: usize,
    pub comparisons: usize,
    /// Matches between records already in two different groups
    pub label_conflicts: usize,
}

/// Result of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupeOutcome {
    /// Output records in input order
    pub records: Vec<DedupedRecord>,
    pub stats: DedupeStats,
}

impl DedupeOutcome {
    /// Records kept after deduplication.
    pub fn retained(&self) -> impl Iterator<Item = &DedupedRecord> {
        self.records.iter().filter(|r| r.retained)
    }
}

/// Core deduplication engine.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use citedupe::compare::JaroWinklerAuthors;
/// use citedupe::dedupe::{Deduplicator, DeduplicatorConfig};
///
/// let deduplicator = Deduplicator::new()
///     .with_config(DeduplicatorConfig::default())
///     .with_author_comparator(Arc::new(JaroWinklerAuthors));
/// ```
#[derive(Debug, Clone)]
pub struct Deduplicator {
    config: DeduplicatorConfig,
    authors: Arc<dyn AuthorComparator>,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Deduplicator {
    /// Creates a deduplicator with the default configuration and author comparator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: DeduplicatorConfig::default(),
            authors: Arc::new(JaroWinklerAuthors),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: DeduplicatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the strategy used for the author test.
    #[must_use]
    pub fn with_author_comparator(mut self, authors: Arc<dyn AuthorComparator>) -> Self {
        self.authors = authors;
        self
    }

    /// Deduplicates one collection.
    ///
    /// Every record is returned; duplicates have `retained == false`. Retained group
    /// members carry their enrichment.
    ///
    /// # Errors
    ///
    /// Returns an error when an id is missing or repeated, or when no record has a
    /// publication year.
    pub fn dedupe(&self, citations: &[RawCitation]) -> Result<DedupeOutcome, DedupeError> {
        self.dedupe_with_progress(citations, &mut NoProgress)
    }

    /// [`Deduplicator::dedupe`] reporting to `progress`.
    pub fn dedupe_with_progress(
        &self,
        citations: &[RawCitation],
        progress: &mut dyn ProgressSink,
    ) -> Result<DedupeOutcome, DedupeError> {
        let _span = info_span!("dedupe", records = citations.len()).entered();
        self.run_one_collection(citations, true, progress)
    }

    /// Labels duplicate groups in one collection without removing anything.
    ///
    /// Every record is returned with `retained == true` and its group label, if any.
    ///
    /// # Errors
    ///
    /// Same as [`Deduplicator::dedupe`].
    pub fn mark(&self, citations: &[RawCitation]) -> Result<DedupeOutcome, DedupeError> {
        self.mark_with_progress(citations, &mut NoProgress)
    }

    /// [`Deduplicator::mark`] reporting to `progress`.
    pub fn mark_with_progress(
        &self,
        citations: &[RawCitation],
        progress: &mut dyn ProgressSink,
    ) -> Result<DedupeOutcome, DedupeError> {
        let _span = info_span!("mark", records = citations.len()).entered();
        self.run_one_collection(citations, false, progress)
    }

    /// Deduplicates `new` against an already deduplicated `prior` collection.
    ///
    /// Only new records come back: those without a duplicate, and those whose group
    /// holds new records only. Within such a group one record is retained and enriched.
    ///
    /// # Errors
    ///
    /// Returns an error when an id is missing or repeated within a collection, when a
    /// new id starts with the prior-collection prefix, or when no record of either
    /// collection has a publication year.
    pub fn merge(
        &self,
        prior: &[RawCitation],
        new: &[RawCitation],
    ) -> Result<DedupeOutcome, DedupeError> {
        self.merge_with_progress(prior, new, &mut NoProgress)
    }

    /// [`Deduplicator::merge`] reporting to `progress`.
    pub fn merge_with_progress(
        &self,
        prior: &[RawCitation],
        new: &[RawCitation],
        progress: &mut dyn ProgressSink,
    ) -> Result<DedupeOutcome, DedupeError> {
        let _span = info_span!("merge", prior = prior.len(), new = new.len()).entered();
        let prefix = self.config.prior_id_prefix.as_str();

        validate_ids(prior)?;
        let new_ids = validate_ids(new)?;
        if let Some(id) = new
            .iter()
            .filter_map(|c| c.id.as_deref())
            .find(|id| !prefix.is_empty() && id.starts_with(prefix))
        {
            return Err(DedupeError::ReservedIdPrefix { id: id.to_string() });
        }
        // only reachable with an empty prefix
        if let Some(id) = prior
            .iter()
            .filter_map(|c| c.id.as_deref())
            .map(|id| format!("{prefix}{id}"))
            .find(|id| new_ids.contains(id.as_str()))
        {
            return Err(DedupeError::DuplicateId { id });
        }
        if new.is_empty() {
            return Ok(DedupeOutcome::default());
        }
        if !has_publication_year(prior.iter().chain(new)) {
            return Err(DedupeError::NoPublicationYears);
        }

        let mut records = self.normalize(prior);
        for record in &mut records {
            record.id = format!("{prefix}{}", record.id);
            record.from_prior_collection = true;
        }
        records.extend(self.normalize(new));

        let clustering = self.cluster(&records, WindowOrder::Ascending, progress)?;
        clustering.apply_labels(&mut records);
        let mut enrichments = enrich_groups(&mut records, &clustering.groups, prefix);

        let prior_roots: HashSet<usize> = (0..records.len())
            .filter(|&i| records[i].from_prior_collection)
            .map(|i| clustering.groups.find(i))
            .collect();
        let output: Vec<DedupedRecord> = records
            .iter()
            .enumerate()
            .filter(|(i, r)| {
                !r.from_prior_collection && !prior_roots.contains(&clustering.groups.find(*i))
            })
            .map(|(i, r)| deduped_record(r, enrichments.remove(&i), prefix))
            .collect();
        debug!(
            dropped = new.len() - output.len(),
            "new records duplicating prior records dropped"
        );

        let outcome = DedupeOutcome {
            records: output,
            stats: stats(&records, &clustering),
        };
        log_outcome("merge", &outcome);
        Ok(outcome)
    }

    fn run_one_collection(
        &self,
        citations: &[RawCitation],
        enrich: bool,
        progress: &mut dyn ProgressSink,
    ) -> Result<DedupeOutcome, DedupeError> {
        validate_ids(citations)?;
        if citations.is_empty() {
            return Ok(DedupeOutcome::default());
        }
        if !has_publication_year(citations) {
            return Err(DedupeError::NoPublicationYears);
        }

        let mut records = self.normalize(citations);
        let clustering = self.cluster(&records, WindowOrder::Descending, progress)?;
        clustering.apply_labels(&mut records);

        let prefix = self.config.prior_id_prefix.as_str();
        let mut enrichments = if enrich {
            enrich_groups(&mut records, &clustering.groups, prefix)
        } else {
            BTreeMap::new()
        };

        let outcome = DedupeOutcome {
            records: records
                .iter()
                .enumerate()
                .map(|(i, r)| deduped_record(r, enrichments.remove(&i), prefix))
                .collect(),
            stats: stats(&records, &clustering),
        };
        log_outcome(if enrich { "dedupe" } else { "mark" }, &outcome);
        Ok(outcome)
    }

    fn normalize(&self, citations: &[RawCitation]) -> Vec<Record> {
        normalize_all(citations, self.config.run_in_parallel)
    }

    fn cluster(
        &self,
        records: &[Record],
        order: WindowOrder,
        progress: &mut dyn ProgressSink,
    ) -> Result<Clustering, DedupeError> {
        let comparator = PairwiseComparator::new(self.authors.as_ref());
        Clusterer::new(comparator).run(records, order, progress)
    }
}

#[cfg(feature = "parallel")]
fn normalize_all(citations: &[RawCitation], parallel: bool) -> Vec<Record> {
    if parallel {
        use rayon::prelude::*;
        citations.par_iter().map(Record::from_raw).collect()
    } else {
        citations.iter().map(Record::from_raw).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn normalize_all(citations: &[RawCitation], _parallel: bool) -> Vec<Record> {
    citations.iter().map(Record::from_raw).collect()
}

/// Checks every citation has a non-blank id and no id repeats; returns the ids.
fn validate_ids(citations: &[RawCitation]) -> Result<HashSet<&str>, DedupeError> {
    let mut ids = HashSet::with_capacity(citations.len());
    for (index, citation) in citations.iter().enumerate() {
        let id = citation
            .id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(DedupeError::MissingId { index })?;
        if !ids.insert(id) {
            return Err(DedupeError::DuplicateId { id: id.to_string() });
        }
    }
    Ok(ids)
}

fn has_publication_year<'a>(citations: impl IntoIterator<Item = &'a RawCitation>) -> bool {
    citations
        .into_iter()
        .any(|c| c.year.as_deref().is_some_and(|y| parse_year(y) != 0))
}

fn deduped_record(record: &Record, enrichment: Option<Enrichment>, prefix: &str) -> DedupedRecord {
    let id = if record.from_prior_collection {
        record.id.strip_prefix(prefix).unwrap_or(&record.id)
    } else {
        &record.id
    };
    DedupedRecord {
        id: id.to_string(),
        retained: record.is_retained,
        group_label: record.group_label.clone(),
        from_prior_collection: record.from_prior_collection,
        enrichment,
    }
}

fn stats(records: &[Record], clustering: &Clustering) -> DedupeStats {
    DedupeStats {
        records: records.len(),
        groups: clustering.groups.groups(),
        duplicates: clustering.groups.duplicates(),
        comparisons: clustering.stats.comparisons,
        label_conflicts: clustering.stats.label_conflicts,
    }
}

fn log_outcome(mode: &str, outcome: &DedupeOutcome) {
    let stats = outcome.stats;
    info!(
        mode,
        records = stats.records,
        groups = stats.groups,
        duplicates = stats.duplicates,
        comparisons = stats.comparisons,
        label_conflicts = stats.label_conflicts,
        "deduplication finished"
    );
}
