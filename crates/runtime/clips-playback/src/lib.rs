//! # Clips Playback
//!
//! Owns the decoder sessions of the Clips feed.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  PLAYBACK RESOURCE MANAGER                          │
//! │                                                                     │
//! │   items:   [0]   [1]   [2]   [3]   [4]                              │
//! │                   ▲─────▲─────▲                                     │
//! │                   │  window   │        focused? ──> may decode      │
//! │                   └───────────┘        blurred  ──> nothing lives   │
//! │                                                                     │
//! │   acquire(item) ──> Some(session) | None (render placeholder)       │
//! │   release(item) ──> pause + drop, no-op when absent                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The platform decoder sits behind [`MediaBackend`]; the manager only
//! decides who may hold one and when.

pub mod manager;
pub mod memory;
pub mod session;

pub use manager::{PlaybackEvent, PlaybackResourceManager};
pub use memory::{MediaCall, MemoryMediaBackend};
pub use session::{MediaBackend, MediaSession, PlaybackSession, SessionId};

/// Result type for clips-playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Errors that can occur while opening or driving a decoder
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("Cannot decode {uri}: {reason}")]
    Decode { uri: String, reason: String },

    #[error("Unsupported media: {0}")]
    Unsupported(String),
}
