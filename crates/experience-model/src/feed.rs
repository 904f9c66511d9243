//! Store snapshots and the sorted feed view.
//!
//! The shared store delivers the whole collection on every change as a map
//! from record id to record fields. [`FeedView::from_snapshot`] turns that
//! map into the list every reader works from: newest `createdAt` first,
//! equal timestamps ordered by the append sequence in their ids, later
//! appends first.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::experience::{Experience, RecordError};
use crate::id::append_sequence;

/// Full contents of a collection, keyed by store-assigned id.
pub type Snapshot = BTreeMap<String, serde_json::Value>;

/// An entry that was left out of the view.
#[derive(Debug)]
pub struct RejectedRecord {
    pub id: String,
    pub reason: RecordError,
}

/// Sorted, read-only view over a snapshot.
#[derive(Debug, Default)]
pub struct FeedView {
    items: Vec<Experience>,
    rejected: Vec<RejectedRecord>,
}

impl FeedView {
    /// An empty feed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse every entry, skip the malformed ones, and sort.
    ///
    /// Snapshot keys are unique, so the view never holds two records with
    /// the same id.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut items = Vec::with_capacity(snapshot.len());
        let mut rejected = Vec::new();

        for (id, fields) in snapshot {
            match Experience::from_record(id, fields) {
                Ok(experience) => items.push(experience),
                Err(reason) => rejected.push(RejectedRecord {
                    id: id.clone(),
                    reason,
                }),
            }
        }

        items.sort_by(feed_order);
        Self { items, rejected }
    }

    /// Build a view from already-parsed experiences.
    pub fn from_experiences(mut items: Vec<Experience>) -> Self {
        items.sort_by(feed_order);
        items.dedup_by(|a, b| a.id == b.id);
        Self {
            items,
            rejected: Vec::new(),
        }
    }

    pub fn items(&self) -> &[Experience] {
        &self.items
    }

    pub fn rejected(&self) -> &[RejectedRecord] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Experience> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Experience> {
        self.items.iter()
    }

    pub fn find(&self, id: &str) -> Option<&Experience> {
        self.items.iter().find(|e| e.id == id)
    }
}

impl<'a> IntoIterator for &'a FeedView {
    type Item = &'a Experience;
    type IntoIter = std::slice::Iter<'a, Experience>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Newest first; ties broken by append sequence, later appends first.
///
/// Ids without a sequence sort after those with one. Whatever is still
/// equal falls back to the id text so the order stays total.
pub fn feed_order(a: &Experience, b: &Experience) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| append_sequence(&b.id).cmp(&append_sequence(&a.id)))
        .then_with(|| b.id.cmp(&a.id))
}
