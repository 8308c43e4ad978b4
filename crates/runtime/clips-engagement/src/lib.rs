//! # Clips Engagement
//!
//! Optimistic engagement for the current user.
//!
//! ```text
//!   like ──────┐            dislike clears like and hype
//!     ▲        │ off        like/hype clear dislike
//!     │ on     ▼            hype implies like
//!   hype ── cascades off with like
//! ```
//!
//! The state machine mutates the authoritative store in place and returns
//! an [`EngagementChange`] describing the one remote write the caller must
//! fire. [`FollowState`] tracks which authors the user follows.

pub mod engagement;
pub mod follow;

pub use engagement::{EngagementChange, EngagementKind, EngagementStateMachine, EngagementStore};
pub use follow::{FollowChange, FollowState};

use clips_core::ItemId;

/// Result type for clips-engagement operations
pub type Result<T> = std::result::Result<T, EngagementError>;

/// Errors that can occur while toggling engagement
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngagementError {
    #[error("Sign in required")]
    SignInRequired,

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),
}
