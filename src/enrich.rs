//! Group enrichment.
//!
//! After clustering every group keeps exactly one record, its root. The retained record
//! absorbs what its duplicates know and it lacks: DOIs, the publication year and pages.
//! A reply takes the longest title found in its group, since reply titles ("Authors'
//! reply") rarely say what the correspondence is about.

use crate::cluster::DisjointSet;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields a retained record gained from its group. Only changed fields are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub added_dois: Vec<String>,
    /// Replacement title of a reply
    pub title: Option<String>,
    pub year: Option<i32>,
    pub page_for_comparison: Option<String>,
    /// Human-facing page text that came with the filled page
    pub pages: Option<String>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.added_dois.is_empty()
            && self.title.is_none()
            && self.year.is_none()
            && self.page_for_comparison.is_none()
    }
}

/// Marks group roots retained and their duplicates not retained, then enriches every
/// root whose group holds no record of a prior collection.
///
/// Labels must already be written to the records. Returns the enrichment of each root
/// that gained anything, keyed by record index.
pub fn enrich_groups(
    records: &mut [Record],
    groups: &DisjointSet,
    prior_id_prefix: &str,
) -> BTreeMap<usize, Enrichment> {
    let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for index in 0..records.len() {
        if groups.is_grouped(index) {
            members.entry(groups.find(index)).or_default().push(index);
        }
    }

    let mut enrichments = BTreeMap::new();
    for (root, group) in members {
        debug_assert!(
            records[root].group_label.is_some(),
            "enrichment before labels were written"
        );
        for &index in &group {
            records[index].is_retained = index == root;
        }

        let from_prior = group.iter().any(|&i| records[i].from_prior_collection)
            || is_prior_label(records[root].group_label.as_deref(), prior_id_prefix);
        if from_prior {
            continue;
        }

        let enrichment = enrich_representative(records, root, &group);
        if !enrichment.is_empty() {
            enrichments.insert(root, enrichment);
        }
    }
    enrichments
}

fn is_prior_label(label: Option<&str>, prior_id_prefix: &str) -> bool {
    !prior_id_prefix.is_empty() && label.is_some_and(|l| l.starts_with(prior_id_prefix))
}

fn enrich_representative(records: &mut [Record], root: usize, group: &[usize]) -> Enrichment {
    let mut enrichment = Enrichment::default();
    let others: Vec<&Record> = group
        .iter()
        .filter(|&&i| i != root)
        .map(|&i| &records[i])
        .collect();

    let title = records[root]
        .is_reply
        .then(|| longest_title(group.iter().map(|&i| &records[i])))
        .flatten()
        .filter(|t| *t != records[root].title);

    let mut added_dois = Vec::new();
    for doi in others.iter().flat_map(|r| &r.dois) {
        if !records[root].dois.contains(doi) && !added_dois.contains(doi) {
            added_dois.push(doi.clone());
        }
    }

    let year = (records[root].publication_year == 0)
        .then(|| others.iter().map(|r| r.publication_year).find(|&y| y != 0))
        .flatten();

    let pages = (!records[root].has_pages())
        .then(|| others.iter().find(|r| r.has_pages()))
        .flatten()
        .map(|r| {
            (
                r.page_for_comparison.clone(),
                r.page_start.clone(),
                r.pages_output.clone(),
            )
        });

    let representative = &mut records[root];
    if let Some(title) = title {
        representative.title = title.clone();
        enrichment.title = Some(title);
    }
    for doi in &added_dois {
        representative.dois.insert(doi.clone());
    }
    enrichment.added_dois = added_dois;
    if let Some(year) = year {
        representative.publication_year = year;
        enrichment.year = Some(year);
    }
    if let Some((page_for_comparison, page_start, pages_output)) = pages {
        representative.page_for_comparison = page_for_comparison.clone();
        representative.page_start = page_start;
        representative.pages_output = pages_output.clone();
        enrichment.page_for_comparison = Some(page_for_comparison);
        enrichment.pages = (!pages_output.is_empty()).then_some(pages_output);
    }
    enrichment
}

/// Longest of the members' reply titles or primary titles; the first one wins a tie.
fn longest_title<'r>(members: impl Iterator<Item = &'r Record>) -> Option<String> {
    let mut longest: Option<&str> = None;
    for record in members {
        let title = record.reply_title.as_deref().unwrap_or(&record.title);
        if longest.is_none_or(|l| title.chars().count() > l.chars().count()) {
            longest = Some(title);
        }
    }
    longest.filter(|t| !t.is_empty()).map(str::to_string)
}
