//! Remote collaborators
//!
//! Narrow async interface to the document store, follow graph and history
//! service. Implementations live outside the engine.

use async_trait::async_trait;
use clips_core::{AuthorId, FeedItem, HistoryEntry, ItemId, RemoteError, UserId};

/// Result of a remote call
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Everything the feed engine reads from or writes to the backend
#[async_trait]
pub trait FeedBackend: Send + Sync {
    /// Wholesale feed load (mount and pull-to-refresh)
    async fn fetch_feed_items(&self) -> RemoteResult<Vec<FeedItem>>;

    async fn persist_like(&self, item_id: &ItemId, user_id: &UserId) -> RemoteResult<()>;

    async fn persist_unlike(&self, item_id: &ItemId, user_id: &UserId) -> RemoteResult<()>;

    async fn persist_dislike(&self, item_id: &ItemId, user_id: &UserId) -> RemoteResult<()>;

    async fn persist_undislike(&self, item_id: &ItemId, user_id: &UserId) -> RemoteResult<()>;

    async fn persist_hype(&self, item_id: &ItemId, user_id: &UserId) -> RemoteResult<()>;

    async fn persist_unhype(&self, item_id: &ItemId, user_id: &UserId) -> RemoteResult<()>;

    async fn persist_follow(&self, user_id: &UserId, author_id: &AuthorId) -> RemoteResult<()>;

    async fn persist_unfollow(&self, user_id: &UserId, author_id: &AuthorId) -> RemoteResult<()>;

    /// Whether `user_id` follows `author_id`
    async fn check_follow_state(&self, user_id: &UserId, author_id: &AuthorId)
        -> RemoteResult<bool>;

    async fn record_history_entry(&self, entry: &HistoryEntry) -> RemoteResult<()>;

    async fn record_view_increment(&self, item_id: &ItemId) -> RemoteResult<()>;
}
