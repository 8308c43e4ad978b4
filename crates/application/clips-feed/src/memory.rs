//! In-memory backend
//!
//! A `FeedBackend` that keeps everything in process: the feed, the follow
//! graph, history and view counts. Every call is recorded, and any operation
//! can be made to fail, which is what the simulator and tests need.

use crate::backend::{FeedBackend, RemoteResult};
use async_trait::async_trait;
use clips_core::{AuthorId, FeedItem, HistoryEntry, ItemId, RemoteError, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Backend operation names, for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    FetchFeed,
    PersistLike,
    PersistUnlike,
    PersistDislike,
    PersistUndislike,
    PersistHype,
    PersistUnhype,
    PersistFollow,
    PersistUnfollow,
    CheckFollow,
    RecordHistory,
    RecordView,
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendCall {
    pub operation: Operation,
    /// Item or author the call targeted
    pub target: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    items: Vec<FeedItem>,
    follows: HashSet<(UserId, AuthorId)>,
    history: Vec<HistoryEntry>,
    views: HashMap<ItemId, u64>,
    calls: Vec<BackendCall>,
    failing: HashSet<Operation>,
}

/// Process-local stand-in for the remote document store
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend serving `items` as the feed
    pub fn with_items(items: Vec<FeedItem>) -> Self {
        let backend = Self::new();
        backend.set_items(items);
        backend
    }

    fn lock(&self) -> RemoteResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| RemoteError::Unavailable("memory backend poisoned".to_string()))
    }

    /// Replace the feed served by `fetch_feed_items`
    pub fn set_items(&self, items: Vec<FeedItem>) {
        if let Ok(mut state) = self.lock() {
            state.items = items;
        }
    }

    /// Seed an existing follow edge
    pub fn add_follow(&self, user_id: impl Into<UserId>, author_id: impl Into<AuthorId>) {
        if let Ok(mut state) = self.lock() {
            state.follows.insert((user_id.into(), author_id.into()));
        }
    }

    /// Make `operation` fail until `recover` is called
    pub fn fail(&self, operation: Operation) {
        if let Ok(mut state) = self.lock() {
            state.failing.insert(operation);
        }
    }

    pub fn recover(&self, operation: Operation) {
        if let Ok(mut state) = self.lock() {
            state.failing.remove(&operation);
        }
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    /// Recorded calls of one kind
    pub fn calls_of(&self, operation: Operation) -> Vec<BackendCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation == operation)
            .collect()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.lock().map(|s| s.history.clone()).unwrap_or_default()
    }

    pub fn view_count(&self, item_id: &ItemId) -> u64 {
        self.lock()
            .ok()
            .and_then(|s| s.views.get(item_id).copied())
            .unwrap_or(0)
    }

    pub fn follows(&self, user_id: &UserId, author_id: &AuthorId) -> bool {
        self.lock()
            .map(|s| s.follows.contains(&(user_id.clone(), author_id.clone())))
            .unwrap_or(false)
    }

    /// Record the call, then fail if the operation is marked failing
    fn enter(
        &self,
        operation: Operation,
        target: Option<String>,
    ) -> RemoteResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock()?;
        state.calls.push(BackendCall { operation, target });
        if state.failing.contains(&operation) {
            return Err(RemoteError::Unavailable(format!("{:?} failed", operation)));
        }
        Ok(state)
    }

    fn engagement_write(&self, operation: Operation, item_id: &ItemId) -> RemoteResult<()> {
        let state = self.enter(operation, Some(item_id.to_string()))?;
        if state.items.iter().any(|item| &item.id == item_id) {
            Ok(())
        } else {
            Err(RemoteError::NotFound(item_id.to_string()))
        }
    }
}

#[async_trait]
impl FeedBackend for MemoryBackend {
    async fn fetch_feed_items(&self) -> RemoteResult<Vec<FeedItem>> {
        let state = self.enter(Operation::FetchFeed, None)?;
        Ok(state.items.clone())
    }

    async fn persist_like(&self, item_id: &ItemId, _user_id: &UserId) -> RemoteResult<()> {
        self.engagement_write(Operation::PersistLike, item_id)
    }

    async fn persist_unlike(&self, item_id: &ItemId, _user_id: &UserId) -> RemoteResult<()> {
        self.engagement_write(Operation::PersistUnlike, item_id)
    }

    async fn persist_dislike(&self, item_id: &ItemId, _user_id: &UserId) -> RemoteResult<()> {
        self.engagement_write(Operation::PersistDislike, item_id)
    }

    async fn persist_undislike(&self, item_id: &ItemId, _user_id: &UserId) -> RemoteResult<()> {
        self.engagement_write(Operation::PersistUndislike, item_id)
    }

    async fn persist_hype(&self, item_id: &ItemId, _user_id: &UserId) -> RemoteResult<()> {
        self.engagement_write(Operation::PersistHype, item_id)
    }

    async fn persist_unhype(&self, item_id: &ItemId, _user_id: &UserId) -> RemoteResult<()> {
        self.engagement_write(Operation::PersistUnhype, item_id)
    }

    async fn persist_follow(&self, user_id: &UserId, author_id: &AuthorId) -> RemoteResult<()> {
        let mut state = self.enter(Operation::PersistFollow, Some(author_id.to_string()))?;
        state.follows.insert((user_id.clone(), author_id.clone()));
        Ok(())
    }

    async fn persist_unfollow(&self, user_id: &UserId, author_id: &AuthorId) -> RemoteResult<()> {
        let mut state = self.enter(Operation::PersistUnfollow, Some(author_id.to_string()))?;
        state.follows.remove(&(user_id.clone(), author_id.clone()));
        Ok(())
    }

    async fn check_follow_state(
        &self,
        user_id: &UserId,
        author_id: &AuthorId,
    ) -> RemoteResult<bool> {
        let state = self.enter(Operation::CheckFollow, Some(author_id.to_string()))?;
        Ok(state.follows.contains(&(user_id.clone(), author_id.clone())))
    }

    async fn record_history_entry(&self, entry: &HistoryEntry) -> RemoteResult<()> {
        let mut state = self.enter(Operation::RecordHistory, Some(entry.item_id.to_string()))?;
        state.history.push(entry.clone());
        Ok(())
    }

    async fn record_view_increment(&self, item_id: &ItemId) -> RemoteResult<()> {
        let mut state = self.enter(Operation::RecordView, Some(item_id.to_string()))?;
        *state.views.entry(item_id.clone()).or_insert(0) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_follow_round_trip() {
        let backend = MemoryBackend::new();
        let user = UserId::from("me");
        let author = AuthorId::from("a");

        assert!(!backend.check_follow_state(&user, &author).await.unwrap());
        backend.persist_follow(&user, &author).await.unwrap();
        assert!(backend.check_follow_state(&user, &author).await.unwrap());
        assert_eq!(backend.calls_of(Operation::CheckFollow).len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure_still_recorded() {
        let backend = MemoryBackend::with_items(vec![FeedItem::new("x", "a")]);
        backend.fail(Operation::PersistLike);

        let result = backend
            .persist_like(&ItemId::from("x"), &UserId::from("me"))
            .await;
        assert!(matches!(result, Err(RemoteError::Unavailable(_))));
        assert_eq!(backend.calls_of(Operation::PersistLike).len(), 1);

        backend.recover(Operation::PersistLike);
        assert!(backend
            .persist_like(&ItemId::from("x"), &UserId::from("me"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_engagement_on_unknown_item() {
        let backend = MemoryBackend::new();
        let result = backend
            .persist_hype(&ItemId::from("ghost"), &UserId::from("me"))
            .await;
        assert_eq!(result, Err(RemoteError::NotFound("ghost".to_string())));
    }
}
