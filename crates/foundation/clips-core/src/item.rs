//! Feed item definitions and engagement fields

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Opaque identifier of a feed item
    ItemId
);
string_id!(
    /// Opaque identifier of the account that posted an item
    AuthorId
);
string_id!(
    /// Opaque identifier of the signed-in user
    UserId
);

/// Per-item engagement of the current user.
///
/// Invariants held by every transition in `clips-engagement`:
/// - `disliked` and `liked` are never both set
/// - `hyped` implies `liked`
/// - counters never go below zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub liked_by_current_user: bool,
    #[serde(default)]
    pub hype_count: u64,
    #[serde(default)]
    pub hyped_by_current_user: bool,
    #[serde(default)]
    pub disliked_by_current_user: bool,
}

impl Engagement {
    /// Check the mutual exclusion invariants
    pub fn is_consistent(&self) -> bool {
        let exclusive = !(self.disliked_by_current_user && self.liked_by_current_user);
        let hype_implies_like = !self.hyped_by_current_user || self.liked_by_current_user;
        exclusive && hype_implies_like
    }
}

/// A single playable unit in the Clips feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    /// Unique identifier
    pub id: ItemId,

    /// Video source; `None` renders a static placeholder
    #[serde(default)]
    pub media_uri: Option<String>,

    /// Poster frame shown while no session is live
    #[serde(default)]
    pub thumbnail_uri: Option<String>,

    /// Caption text
    #[serde(default)]
    pub caption: Option<String>,

    /// Who posted it
    pub author_id: AuthorId,

    /// Current user's like/hype/dislike state and counters
    #[serde(flatten)]
    pub engagement: Engagement,
}

impl FeedItem {
    /// Create a new feed item with no engagement
    pub fn new(id: impl Into<ItemId>, author_id: impl Into<AuthorId>) -> Self {
        Self {
            id: id.into(),
            media_uri: None,
            thumbnail_uri: None,
            caption: None,
            author_id: author_id.into(),
            engagement: Engagement::default(),
        }
    }

    /// Builder: attach a video source
    pub fn with_media(mut self, uri: impl Into<String>) -> Self {
        self.media_uri = Some(uri.into());
        self
    }

    /// Builder: attach a caption
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Builder: set engagement counters and flags
    pub fn with_engagement(mut self, engagement: Engagement) -> Self {
        self.engagement = engagement;
        self
    }

    /// Whether this item can ever hold a playback session
    pub fn is_playable(&self) -> bool {
        self.media_uri.as_deref().is_some_and(|uri| !uri.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_is_camel_case_and_flat() {
        let json = r#"{
            "id": "clip-1",
            "mediaUri": "https://cdn.example/clip-1.mp4",
            "authorId": "author-9",
            "likeCount": 4,
            "likedByCurrentUser": true,
            "hypeCount": 1
        }"#;

        let item: FeedItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id.as_str(), "clip-1");
        assert_eq!(item.author_id, AuthorId::from("author-9"));
        assert_eq!(item.engagement.like_count, 4);
        assert!(item.engagement.liked_by_current_user);
        assert_eq!(item.engagement.hype_count, 1);
        assert!(!item.engagement.hyped_by_current_user);
        assert!(item.is_playable());
    }

    #[test]
    fn test_missing_media_is_not_playable() {
        let item = FeedItem::new("a", "b");
        assert!(!item.is_playable());

        let empty = FeedItem::new("a", "b").with_media("");
        assert!(!empty.is_playable());
    }

    #[test]
    fn test_consistency_check() {
        let mut e = Engagement::default();
        assert!(e.is_consistent());

        e.hyped_by_current_user = true;
        assert!(!e.is_consistent());

        e.liked_by_current_user = true;
        assert!(e.is_consistent());

        e.disliked_by_current_user = true;
        assert!(!e.is_consistent());
    }
}
