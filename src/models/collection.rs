//! Canonical ordered sequence of loaded media items.
//!
//! `MediaCollection` backs both the grid and the lightbox. Appends go through a
//! `FingerprintSet` so the same asset arriving on two pages is materialized once.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, trace};

use crate::models::MediaItem;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// The id is absent, usually a stale tile reference. Callers re-sync from the server.
    #[error("media item {0} is not in the collection")]
    NotFound(i64),
}

/// Ids that have already been materialized during this session.
///
/// Only grows: a removed item keeps its fingerprint so a later page cannot
/// resurrect it.
#[derive(Debug, Default, Clone)]
pub struct FingerprintSet {
    seen: HashSet<i64>,
}

impl FingerprintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.seen.contains(&id)
    }

    /// Returns false if the id was already fingerprinted.
    pub fn insert(&mut self, id: i64) -> bool {
        self.seen.insert(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[derive(Debug, Default, Clone)]
pub struct MediaCollection {
    items: Vec<MediaItem>,
    fingerprints: FingerprintSet,
}

impl MediaCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from server-rendered seed data, deduplicated like any page.
    pub fn seeded(items: Vec<MediaItem>) -> Self {
        let mut collection = Self::new();
        collection.append(items);
        collection
    }

    /// Appends every item whose id is positive and not yet fingerprinted.
    ///
    /// Input order is preserved. Returns the accepted subset; an empty result is a
    /// normal outcome (empty page, or a page made only of already-seen items).
    pub fn append(&mut self, items: Vec<MediaItem>) -> Vec<MediaItem> {
        let offered = items.len();
        let mut accepted = Vec::with_capacity(offered);

        for item in items {
            if !item.has_valid_id() {
                trace!(id = item.id, "Skipping item with invalid id");
                continue;
            }
            if !self.fingerprints.insert(item.id) {
                trace!(id = item.id, "Skipping already materialized item");
                continue;
            }
            accepted.push(item);
        }

        self.items.extend(accepted.iter().cloned());
        debug!(
            offered,
            accepted = accepted.len(),
            total = self.items.len(),
            "Appended page to collection"
        );
        accepted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaItem> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.items.iter().map(|item| item.id).collect()
    }

    pub fn find_by_id(&self, id: i64) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Current position of `id`; indices shift after removals so callers resolve late.
    pub fn index_of(&self, id: i64) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn fingerprints(&self) -> &FingerprintSet {
        &self.fingerprints
    }

    pub fn favorite_count(&self) -> usize {
        self.items.iter().filter(|item| item.favorite).count()
    }

    /// Sets the favorite flag in place, returning the previous value.
    pub fn mark_favorite(&mut self, id: i64, value: bool) -> Result<bool, CollectionError> {
        let item = self.find_mut(id)?;
        Ok(std::mem::replace(&mut item.favorite, value))
    }

    /// Sets the soft-delete flag in place, returning the previous value.
    pub fn mark_deleted(&mut self, id: i64, value: bool) -> Result<bool, CollectionError> {
        let item = self.find_mut(id)?;
        Ok(std::mem::replace(&mut item.deleted, value))
    }

    /// The only shrinking operation. The fingerprint is kept.
    pub fn remove_by_id(&mut self, id: i64) -> Result<MediaItem, CollectionError> {
        let index = self.index_of(id).ok_or(CollectionError::NotFound(id))?;
        Ok(self.items.remove(index))
    }

    /// Sets the soft-delete flag on every item in `ids` in one pass. Returns how many
    /// items were found.
    pub fn mark_deleted_ids(&mut self, ids: &HashSet<i64>, value: bool) -> usize {
        let mut marked = 0;
        for item in self.items.iter_mut().filter(|item| ids.contains(&item.id)) {
            item.deleted = value;
            marked += 1;
        }
        marked
    }

    /// Batch form of `remove_by_id`: one pass, order preserved. Unknown ids are skipped.
    pub fn remove_ids(&mut self, ids: &HashSet<i64>) -> Vec<MediaItem> {
        if ids.is_empty() {
            return Vec::new();
        }
        let (removed, kept): (Vec<MediaItem>, Vec<MediaItem>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| ids.contains(&item.id));
        self.items = kept;
        trace!(removed = removed.len(), "Removed items");
        removed
    }

    fn find_mut(&mut self, id: i64) -> Result<&mut MediaItem, CollectionError> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(CollectionError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;

    fn item(id: i64) -> MediaItem {
        MediaItem::new(id, MediaType::Image, format!("/storage/{id}.jpg"))
    }

    fn ids(collection: &MediaCollection) -> Vec<i64> {
        collection.ids()
    }

    #[test]
    fn test_append_preserves_order_and_dedups() {
        let mut collection = MediaCollection::new();
        let accepted = collection.append(vec![item(1), item(2)]);
        assert_eq!(accepted.len(), 2);

        let accepted = collection.append(vec![item(2), item(3), item(1), item(4)]);
        assert_eq!(accepted.iter().map(|i| i.id).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(ids(&collection), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_duplicate_within_single_page() {
        let mut collection = MediaCollection::new();
        let accepted = collection.append(vec![item(5), item(5), item(6)]);
        assert_eq!(accepted.len(), 2);
        assert_eq!(ids(&collection), vec![5, 6]);
    }

    #[test]
    fn test_invalid_ids_rejected() {
        let mut collection = MediaCollection::new();
        let accepted = collection.append(vec![item(0), item(-3), item(9)]);
        assert_eq!(accepted.len(), 1);
        assert_eq!(ids(&collection), vec![9]);
        assert!(!collection.fingerprints().contains(0));
    }

    #[test]
    fn test_empty_and_seen_appends_are_noops() {
        let mut collection = MediaCollection::seeded(vec![item(1), item(2)]);
        assert!(collection.append(Vec::new()).is_empty());
        assert!(collection.append(vec![item(2), item(1)]).is_empty());
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_fingerprints_track_length_across_appends() {
        let mut collection = MediaCollection::new();
        let pages: Vec<Vec<i64>> = vec![
            vec![1, 2, 3],
            vec![3, 4],
            vec![],
            vec![4, 4, 5, -1, 0],
            vec![1, 6, 2],
        ];
        for page in pages {
            collection.append(page.into_iter().map(item).collect());
            assert_eq!(collection.fingerprints().len(), collection.len());
            let mut unique = ids(&collection);
            unique.sort_unstable();
            unique.dedup();
            assert_eq!(unique.len(), collection.len());
        }
    }

    #[test]
    fn test_mark_favorite_and_deleted() {
        let mut collection = MediaCollection::seeded(vec![item(1)]);
        assert_eq!(collection.mark_favorite(1, true), Ok(false));
        assert_eq!(collection.mark_favorite(1, true), Ok(true));
        assert_eq!(collection.mark_deleted(1, true), Ok(false));
        assert!(collection.find_by_id(1).unwrap().deleted);
        assert_eq!(collection.favorite_count(), 1);
        assert_eq!(
            collection.mark_favorite(42, true),
            Err(CollectionError::NotFound(42))
        );
        assert_eq!(
            collection.mark_deleted(42, true),
            Err(CollectionError::NotFound(42))
        );
    }

    #[test]
    fn test_remove_keeps_fingerprint() {
        let mut collection = MediaCollection::seeded(vec![item(1), item(2), item(3)]);
        let removed = collection.remove_by_id(2).unwrap();
        assert_eq!(removed.id, 2);
        assert_eq!(ids(&collection), vec![1, 3]);
        assert_eq!(collection.index_of(3), Some(1));

        // A later page carrying the removed id does not bring it back.
        assert!(collection.append(vec![item(2)]).is_empty());
        assert_eq!(collection.remove_by_id(2), Err(CollectionError::NotFound(2)));
    }

    #[test]
    fn test_batch_mark_and_remove() {
        let mut collection = MediaCollection::seeded((1..=5).map(item).collect());
        let wanted: HashSet<i64> = [2, 4, 99].into_iter().collect();
        assert_eq!(collection.mark_deleted_ids(&wanted, true), 2);

        let removed = collection.remove_ids(&wanted);
        assert_eq!(removed.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2, 4]);
        assert!(removed.iter().all(|i| i.deleted));
        assert_eq!(ids(&collection), vec![1, 3, 5]);
        assert!(collection.fingerprints().contains(4));
        assert!(collection.append(vec![item(4)]).is_empty());
    }
}
