//! Feed data store
//!
//! Arena of items keyed by id plus the ordered id sequence used for
//! rendering. Positions are only ever resolved at mutation time.

use clips_core::{Engagement, FeedItem, ItemId};
use clips_engagement::EngagementStore;
use std::collections::HashMap;

/// Ordered feed with id-addressed mutation
#[derive(Debug, Clone, Default)]
pub struct FeedDataStore {
    /// Items by id
    items: HashMap<ItemId, FeedItem>,

    /// Render order
    order: Vec<ItemId>,

    /// Bumped on every wholesale replace
    generation: u64,
}

impl FeedDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole feed. Duplicate ids keep their first occurrence.
    pub fn replace(&mut self, items: Vec<FeedItem>) {
        self.items.clear();
        self.order.clear();

        for item in items {
            if self.items.contains_key(&item.id) {
                tracing::warn!(item = %item.id, "Duplicate feed item dropped");
                continue;
            }
            self.order.push(item.id.clone());
            self.items.insert(item.id.clone(), item);
        }

        self.generation += 1;
        tracing::debug!(items = self.order.len(), generation = self.generation, "Feed replaced");
    }

    /// Discard everything (feed closed)
    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn id_at(&self, index: usize) -> Option<&ItemId> {
        self.order.get(index)
    }

    pub fn index_of(&self, item_id: &ItemId) -> Option<usize> {
        self.order.iter().position(|id| id == item_id)
    }

    pub fn get(&self, item_id: &ItemId) -> Option<&FeedItem> {
        self.items.get(item_id)
    }

    pub fn get_at(&self, index: usize) -> Option<&FeedItem> {
        self.id_at(index).and_then(|id| self.items.get(id))
    }

    /// Mutate one item in place. Returns `false` if it is gone (e.g. the
    /// feed was refreshed since the caller looked it up).
    pub fn update<F>(&mut self, item_id: &ItemId, f: F) -> bool
    where
        F: FnOnce(&mut FeedItem),
    {
        match self.items.get_mut(item_id) {
            Some(item) => {
                f(item);
                true
            }
            None => {
                tracing::debug!(item = %item_id, "Update for item no longer in feed");
                false
            }
        }
    }

    /// Items in render order
    pub fn iter(&self) -> impl Iterator<Item = &FeedItem> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// Owned copy in render order
    pub fn snapshot(&self) -> Vec<FeedItem> {
        self.iter().cloned().collect()
    }
}

impl EngagementStore for FeedDataStore {
    fn update_engagement(&mut self, item_id: &ItemId, f: &mut dyn FnMut(&mut Engagement)) -> bool {
        self.update(item_id, |item| f(&mut item.engagement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(ids: &[&str]) -> Vec<FeedItem> {
        ids.iter().map(|id| FeedItem::new(*id, "author")).collect()
    }

    #[test]
    fn test_replace_keeps_order() {
        let mut store = FeedDataStore::new();
        store.replace(feed(&["a", "b", "c"]));

        assert_eq!(store.len(), 3);
        assert_eq!(store.id_at(1), Some(&ItemId::from("b")));
        assert_eq!(store.index_of(&ItemId::from("c")), Some(2));
        let ids: Vec<_> = store.iter().map(|i| i.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicates_dropped() {
        let mut store = FeedDataStore::new();
        store.replace(feed(&["a", "b", "a"]));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_stale_id_after_refresh_is_discarded() {
        let mut store = FeedDataStore::new();
        store.replace(feed(&["a", "b"]));
        let stale = store.id_at(1).cloned().unwrap();
        let generation = store.generation();

        store.replace(feed(&["x", "y"]));
        assert!(store.generation() > generation);
        assert!(!store.update(&stale, |item| item.engagement.like_count = 99));
        assert!(store.iter().all(|i| i.engagement.like_count == 0));
    }

    #[test]
    fn test_engagement_store_impl() {
        let mut store = FeedDataStore::new();
        store.replace(feed(&["a"]));
        let id = ItemId::from("a");

        assert!(store.update_engagement(&id, &mut |e| e.like_count = 3));
        assert_eq!(store.get(&id).unwrap().engagement.like_count, 3);
    }
}
