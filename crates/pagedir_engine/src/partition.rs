/* 📖 # Why serialize position changes per API?

A reorder reads the sibling set, computes a plan and writes it. Two reorders
on the same API interleaving those steps can each write a plan computed from
a snapshot the other has already changed, which breaks uniqueness. Every
operation that assigns positions in a partition therefore holds that
partition's lock from snapshot to last write. Different APIs never contend.
*/

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

use crate::page::{ApiId, Page, PageId, Position};

/// Guard held while a partition's positions are being changed.
pub type PartitionGuard = ArcMutexGuard<RawMutex, ()>;

/// One mutual-exclusion scope per API.
#[derive(Debug, Default)]
pub struct PartitionLocks {
    locks: Mutex<HashMap<ApiId, Arc<Mutex<()>>>>,
}

impl PartitionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the partition of `api` is free and take it.
    ///
    /// Entries of other APIs that nobody holds or waits on are dropped on the
    /// way, so the map stays bounded by the number of APIs in use.
    pub fn acquire(&self, api: &ApiId) -> PartitionGuard {
        let lock = {
            let mut locks = self.locks.lock();
            locks.retain(|key, lock| key == api || Arc::strong_count(lock) > 1);
            locks.entry(api.clone()).or_default().clone()
        };
        lock.lock_arc()
    }
}

/// Result of checking one partition against the uniqueness and contiguity
/// invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionReport {
    pub api: ApiId,
    pub base: Position,
    pub pages: usize,
    /// Positions held by more than one page.
    pub duplicates: BTreeMap<Position, Vec<PageId>>,
    /// Unoccupied slots between `base` and the highest position.
    pub gaps: Vec<Position>,
    /// Pages stored below `base`.
    pub below_base: Vec<PageId>,
}

impl PartitionReport {
    pub fn from_pages(api: ApiId, pages: &[Page], base: Position) -> Self {
        let mut by_position: BTreeMap<Position, Vec<PageId>> = BTreeMap::new();
        for page in pages {
            by_position
                .entry(page.order)
                .or_default()
                .push(page.id.clone());
        }

        let below_base = by_position
            .range(..base)
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect();

        let gaps = match by_position.keys().next_back() {
            Some(&max) if max >= base => (base..max)
                .filter(|position| !by_position.contains_key(position))
                .collect(),
            _ => Vec::new(),
        };

        let duplicates = by_position
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(position, mut ids)| {
                ids.sort();
                (position, ids)
            })
            .collect();

        Self {
            api,
            base,
            pages: pages.len(),
            duplicates,
            gaps,
            below_base,
        }
    }

    /// True if the partition's positions are exactly `base..base + pages`.
    pub fn is_consistent(&self) -> bool {
        self.duplicates.is_empty() && self.gaps.is_empty() && self.below_base.is_empty()
    }
}

impl fmt::Display for PartitionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_consistent() {
            return write!(f, "API [{}]: {} pages, consistent", self.api, self.pages);
        }
        write!(f, "API [{}]: {} pages, inconsistent", self.api, self.pages)?;
        for (position, ids) in &self.duplicates {
            let ids: Vec<&str> = ids.iter().map(PageId::as_str).collect();
            write!(f, "\n  duplicate position {}: {}", position, ids.join(", "))?;
        }
        if !self.gaps.is_empty() {
            let gaps: Vec<String> = self.gaps.iter().map(Position::to_string).collect();
            write!(f, "\n  gaps at: {}", gaps.join(", "))?;
        }
        if !self.below_base.is_empty() {
            let ids: Vec<&str> = self.below_base.iter().map(PageId::as_str).collect();
            write!(f, "\n  below position {}: {}", self.base, ids.join(", "))?;
        }
        Ok(())
    }
}
