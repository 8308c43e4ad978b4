//! # Clips Core
//!
//! Shared vocabulary for the Clips short-form video feed engine.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         CLIPS FEED                                  │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │   viewport ──> playback window ──> sessions (decoders)              │
//! │      │                                                              │
//! │      └──> gestures ──> engagement ──> feed store ──> remote sync    │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate holds the data model (`FeedItem`, `Engagement`), the explicit
//! user context, the records handed to external collaborators, and the
//! engine configuration. Everything above it depends on these types.

pub mod config;
pub mod context;
pub mod item;

pub use config::{ClipsConfig, EngagementConfig, GestureConfig, PlaybackConfig, ViewportConfig};
pub use context::{HistoryEntry, ShareData, UserContext};
pub use item::{AuthorId, Engagement, FeedItem, ItemId, UserId};

/// Result type for clips-core operations
pub type Result<T> = std::result::Result<T, ClipsError>;

/// Errors that can occur in clips-core
#[derive(Debug, thiserror::Error)]
pub enum ClipsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Failure reported by a remote collaborator (document store, history
/// service, follow graph).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Remote unavailable: {0}")]
    Unavailable(String),

    #[error("Remote rejected request: {0}")]
    Rejected(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
