//! Duplicate clustering.
//!
//! Each window is worked through as a queue: the front record is taken as the anchor and
//! compared with every record still queued. Matched records stay queued, so a record
//! matched by one anchor may later anchor comparisons of its own and pull chains of
//! near-identical records into one group.
//!
//! Groups are kept in a [`DisjointSet`] whose root is the first record of the group to
//! be linked; the group label is the root's id.

use crate::compare::PairwiseComparator;
use crate::dedupe::{DedupeError, ProgressEvent, ProgressSink};
use crate::record::Record;
use crate::window::{CandidateWindows, Window, WindowOrder};
use std::collections::VecDeque;
use tracing::debug;

/// Outcome of linking two matched records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// One record joined the other's group
    Joined,
    /// The records already shared a group
    AlreadyGrouped,
    /// The records belong to two different groups, which are left as they are
    Conflict,
}

/// Group membership by record index.
///
/// Every member points directly at its group's root, so `find` never walks more than
/// one step.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
    duplicates: usize,
}

impl DisjointSet {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
            duplicates: 0,
        }
    }

    pub fn find(&self, index: usize) -> usize {
        self.parent[index]
    }

    /// Whether the record belongs to a group of two or more.
    pub fn is_grouped(&self, index: usize) -> bool {
        self.size[self.find(index)] > 1
    }

    pub fn same_group(&self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// Records that are in a group without being its root.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Number of groups with two or more members.
    pub fn groups(&self) -> usize {
        (0..self.parent.len())
            .filter(|&i| self.parent[i] == i && self.size[i] > 1)
            .count()
    }

    /// Links `other` into `anchor`'s group.
    ///
    /// An ungrouped `other` joins the anchor's group, the anchor becoming the root when it
    /// was ungrouped too. An ungrouped anchor matched against a grouped record joins that
    /// record's group instead. Two existing groups are never merged.
    pub fn link(&mut self, anchor: usize, other: usize) -> Link {
        let anchor_root = self.find(anchor);
        let other_root = self.find(other);
        if anchor_root == other_root {
            return Link::AlreadyGrouped;
        }

        if self.size[other_root] == 1 {
            self.attach(other, anchor_root);
        } else if self.size[anchor_root] == 1 {
            self.attach(anchor, other_root);
        } else {
            return Link::Conflict;
        }
        Link::Joined
    }

    fn attach(&mut self, singleton: usize, root: usize) {
        debug_assert_eq!(self.size[singleton], 1);
        self.parent[singleton] = root;
        self.size[root] += 1;
        self.duplicates += 1;
    }

    /// Label of the record's group: the root's id, `None` for ungrouped records.
    pub fn label<'r>(&self, records: &'r [Record], index: usize) -> Option<&'r str> {
        self.is_grouped(index)
            .then(|| records[self.find(index)].id.as_str())
    }
}

/// Counters of a clustering run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterStats {
    pub comparisons: usize,
    pub matches: usize,
    pub label_conflicts: usize,
}

impl ClusterStats {
    fn absorb(&mut self, other: ClusterStats) {
        self.comparisons += other.comparisons;
        self.matches += other.matches;
        self.label_conflicts += other.label_conflicts;
    }
}

/// Groups and counters produced by [`Clusterer::run`].
#[derive(Debug, Clone)]
pub struct Clustering {
    pub groups: DisjointSet,
    pub stats: ClusterStats,
}

impl Clustering {
    /// Writes every record's group label.
    pub fn apply_labels(&self, records: &mut [Record]) {
        for index in 0..records.len() {
            let label = self.groups.label(records, index).map(str::to_string);
            records[index].group_label = label;
        }
    }
}

/// Drives the window builder and the pairwise comparator over a collection.
#[derive(Debug, Clone, Copy)]
pub struct Clusterer<'a> {
    comparator: PairwiseComparator<'a>,
}

impl<'a> Clusterer<'a> {
    pub fn new(comparator: PairwiseComparator<'a>) -> Self {
        Self { comparator }
    }

    /// Clusters every year window in `order`.
    ///
    /// Cancellation is checked before each window; a cancelled run yields no groups.
    pub fn run(
        &self,
        records: &[Record],
        order: WindowOrder,
        progress: &mut dyn ProgressSink,
    ) -> Result<Clustering, DedupeError> {
        let windows = CandidateWindows::build(records, order);
        let years = windows.years();
        let mut groups = DisjointSet::new(records.len());
        let mut stats = ClusterStats::default();

        for (position, &year) in years.iter().enumerate() {
            if progress.is_cancelled() {
                return Err(DedupeError::Cancelled { year });
            }
            let window = windows.pool(year, |i| groups.is_grouped(i));
            progress.report(ProgressEvent::BucketStarted {
                year,
                position,
                total: years.len(),
                pool_size: window.members.len(),
            });

            let window_stats = self.cluster_window(records, &window, &mut groups);
            debug!(
                year,
                pool_size = window.members.len(),
                comparisons = window_stats.comparisons,
                matches = window_stats.matches,
                "clustered window"
            );
            stats.absorb(window_stats);
            progress.report(ProgressEvent::DuplicatesFound {
                count: groups.duplicates(),
            });
        }

        Ok(Clustering { groups, stats })
    }

    /// Clusters one window into `groups`.
    pub fn cluster_window(
        &self,
        records: &[Record],
        window: &Window,
        groups: &mut DisjointSet,
    ) -> ClusterStats {
        let mut stats = ClusterStats::default();
        let mut pool: VecDeque<usize> = window.members.iter().copied().collect();

        while pool.len() > 1 {
            let Some(anchor) = pool.pop_front() else {
                break;
            };
            // members of the adjacent bucket are compared, never anchors
            let year = records[anchor].publication_year;
            if year != 0 && year != window.year {
                break;
            }

            for &other in &pool {
                if groups.same_group(anchor, other) {
                    continue;
                }
                stats.comparisons += 1;
                if !self.comparator.is_duplicate(&records[anchor], &records[other]) {
                    continue;
                }
                stats.matches += 1;
                if groups.link(anchor, other) == Link::Conflict {
                    stats.label_conflicts += 1;
                    debug!(
                        anchor = %records[anchor].id,
                        other = %records[other].id,
                        anchor_group = %records[groups.find(anchor)].id,
                        other_group = %records[groups.find(other)].id,
                        "match across two existing groups left unmerged"
                    );
                }
            }
        }
        stats
    }
}
