//! # Clips Feed
//!
//! The headless short-form video feed.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLIPS FEED                                │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │   host UI ──> scroll / visibility / gestures / focus / toggles      │
//! │                  │                                                  │
//! │                  ▼                                                  │
//! │   ┌────────────────────┐   window   ┌──────────────────────────┐    │
//! │   │ FeedViewport       │ ─────────> │ PlaybackResourceManager  │    │
//! │   └────────────────────┘            └──────────────────────────┘    │
//! │   ┌────────────────────┐   actions  ┌──────────────────────────┐    │
//! │   │ GestureRecognizer  │ ─────────> │ Engagement / transport   │    │
//! │   └────────────────────┘            └────────────┬─────────────┘    │
//! │                                                  │ optimistic       │
//! │   ┌────────────────────┐                         ▼                  │
//! │   │ FeedDataStore      │ <──── read-modify-write by item id         │
//! │   └────────────────────┘                                            │
//! │                                                                     │
//! │   SyncDispatcher ──> tokio::spawn ──> FeedBackend                   │
//! │         ▲                                 │                         │
//! │         └──────── SyncOutcome (mpsc) ─────┘                         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use clips_feed::{ClipsFeed, MemoryBackend};
//! use clips_playback::MemoryMediaBackend;
//!
//! let backend = Arc::new(MemoryBackend::with_items(items));
//! let mut feed = ClipsFeed::new(config, user, backend, MemoryMediaBackend::new())?;
//! feed.load().await?;
//! feed.toggle_like(0)?;
//! feed.settle().await;
//! ```

pub mod backend;
pub mod engine;
pub mod memory;
pub mod store;
pub mod swipe;
pub mod sync;
pub mod viewport;

pub use backend::{FeedBackend, RemoteResult};
pub use engine::{ClipsFeed, FeedEvent};
pub use memory::{BackendCall, MemoryBackend, Operation};
pub use store::FeedDataStore;
pub use swipe::{DragAxis, SwipeDetector, SwipeOutcome};
pub use sync::{SyncDispatcher, SyncOutcome};
pub use viewport::FeedViewportController;

use clips_core::{ClipsError, ItemId, RemoteError};
use clips_engagement::EngagementError;

/// Result type for clips-feed operations
pub type Result<T> = std::result::Result<T, FeedError>;

/// Errors that can occur in the feed engine
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Index {index} out of range for feed of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Engagement error: {0}")]
    Engagement(#[from] EngagementError),

    #[error("Config error: {0}")]
    Config(#[from] ClipsError),

    #[error("No tokio runtime available for remote sync")]
    NoRuntime,
}
