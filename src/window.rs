//! Year windows bounding which records are compared.
//!
//! Records are bucketed by publication year. Each bucket is visited once and its pool
//! holds the bucket itself, every unknown-year record not yet grouped, and the adjacent
//! bucket in visiting direction, so that a record misdated by one year still meets its
//! duplicates.

use crate::record::Record;
use std::collections::BTreeMap;

/// Direction buckets are visited in, and with it which neighbour joins each pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOrder {
    /// Newest year first, pooled with the previous year. Used for one collection, so the
    /// more recent and usually more complete record anchors its group.
    Descending,
    /// Oldest year first, pooled with the next year. Used for two collections, so the
    /// earliest available record anchors its group.
    Ascending,
}

/// The bucketed collection. Records are referred to by their index.
#[derive(Debug, Clone)]
pub struct CandidateWindows {
    buckets: BTreeMap<i32, Vec<usize>>,
    unknown: Vec<usize>,
    order: WindowOrder,
}

/// One pool of record indices, in comparison order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub year: i32,
    pub members: Vec<usize>,
}

impl CandidateWindows {
    pub fn build(records: &[Record], order: WindowOrder) -> Self {
        let mut buckets: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        let mut unknown = Vec::new();
        for (index, record) in records.iter().enumerate() {
            match record.publication_year {
                0 => unknown.push(index),
                year => buckets.entry(year).or_default().push(index),
            }
        }
        Self {
            buckets,
            unknown,
            order,
        }
    }

    /// Known years in visiting order.
    pub fn years(&self) -> Vec<i32> {
        let years = self.buckets.keys().copied();
        match self.order {
            WindowOrder::Ascending => years.collect(),
            WindowOrder::Descending => years.rev().collect(),
        }
    }

    /// Number of year buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Builds the pool for `year`. Unknown-year records for which `is_grouped` holds
    /// already belong to a group and are left out.
    pub fn pool(&self, year: i32, is_grouped: impl Fn(usize) -> bool) -> Window {
        let neighbour = match self.order {
            WindowOrder::Descending => year - 1,
            WindowOrder::Ascending => year + 1,
        };

        let bucket = self.buckets.get(&year).into_iter().flatten();
        let unknown = self.unknown.iter().filter(|&&i| !is_grouped(i));
        let adjacent = self.buckets.get(&neighbour).into_iter().flatten();

        Window {
            year,
            members: bucket.chain(unknown).chain(adjacent).copied().collect(),
        }
    }
}
