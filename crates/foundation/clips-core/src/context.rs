//! Explicit user context and the records handed to collaborators

use crate::item::{AuthorId, FeedItem, ItemId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is using the feed right now.
///
/// Passed into the engine explicitly instead of being looked up from an
/// ambient auth session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Option<UserId>,
}

impl UserContext {
    /// Context for a signed-in user
    pub fn signed_in(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// Context with nobody signed in
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }
}

/// One "watched" record, written once per window entry of a playable item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub item_id: ItemId,
    pub author_id: AuthorId,
    pub media_uri: Option<String>,
    pub user_id: Option<UserId>,
    pub viewed_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Build a history record for `item` viewed now
    pub fn for_item(item: &FeedItem, user: &UserContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id: item.id.clone(),
            author_id: item.author_id.clone(),
            media_uri: item.media_uri.clone(),
            user_id: user.user_id.clone(),
            viewed_at: Utc::now(),
        }
    }
}

/// Payload for the platform share sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareData {
    pub item_id: ItemId,
    pub author_id: AuthorId,
    pub media_uri: Option<String>,
    pub caption: Option<String>,
}

impl From<&FeedItem> for ShareData {
    fn from(item: &FeedItem) -> Self {
        Self {
            item_id: item.id.clone(),
            author_id: item.author_id.clone(),
            media_uri: item.media_uri.clone(),
            caption: item.caption.clone(),
        }
    }
}
