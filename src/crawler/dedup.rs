//! Run-scoped entity deduplication index
//!
//! The index is created when a run starts and dropped when it ends; it is never
//! persisted, so a restarted run may re-crawl entities it saw before.

use crate::url::normalize_url;
use dashmap::DashSet;
use url::Url;

/// Identifier of a crawled entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityId {
    /// A normalized URL
    Url(String),

    /// A numeric item ID parsed from a product URL
    Item(String),
}

impl EntityId {
    /// Builds the URL identity of `url`, or None if it cannot be normalized
    pub fn from_url(url: &Url) -> Option<Self> {
        normalize_url(url.as_str())
            .ok()
            .map(|normalized| Self::Url(normalized.to_string()))
    }
}

/// Insert-only concurrent set of seen entities
///
/// `insert` is an atomic check-and-insert: when several handlers race on the
/// same identifier exactly one of them observes `true`.
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: DashSet<EntityId>,
}

impl DedupIndex {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` as seen
    ///
    /// # Returns
    ///
    /// * `true` - `id` was not seen before; the caller owns it
    /// * `false` - `id` was already present
    pub fn insert(&self, id: EntityId) -> bool {
        self.seen.insert(id)
    }

    /// Returns true if `id` has been seen
    pub fn contains(&self, id: &EntityId) -> bool {
        self.seen.contains(id)
    }

    /// Number of distinct entities seen
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns whether nothing has been seen yet
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
