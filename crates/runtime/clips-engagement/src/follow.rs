//! Follow state
//!
//! Sparse: an author's state is only looked up once one of their clips
//! becomes active. Toggles are optimistic and roll back on failure.

use clips_core::AuthorId;
use std::collections::HashSet;

/// One optimistic follow/unfollow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowChange {
    pub author_id: AuthorId,
    /// State after the toggle; `true` means a follow write must be sent
    pub following: bool,
    pub previous: bool,
}

/// Authors the current user follows, as far as we know
#[derive(Debug, Clone, Default)]
pub struct FollowState {
    /// Authors known to be followed
    following: HashSet<AuthorId>,

    /// Authors whose state is known (followed or not)
    known: HashSet<AuthorId>,

    /// Authors with a lookup in flight
    checking: HashSet<AuthorId>,
}

impl FollowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while the state has not been looked up
    pub fn is_following(&self, author_id: &AuthorId) -> Option<bool> {
        if self.known.contains(author_id) {
            Some(self.following.contains(author_id))
        } else {
            None
        }
    }

    /// Mark a lookup as started. Returns `false` when one is not needed
    /// (already known or already in flight).
    pub fn begin_check(&mut self, author_id: &AuthorId) -> bool {
        if self.known.contains(author_id) || self.checking.contains(author_id) {
            return false;
        }
        self.checking.insert(author_id.clone());
        true
    }

    /// Record a lookup result. Ignored if the user toggled meanwhile.
    pub fn complete_check(&mut self, author_id: &AuthorId, following: bool) {
        self.checking.remove(author_id);
        if self.known.contains(author_id) {
            tracing::debug!(author = %author_id, "Follow lookup superseded by local toggle");
            return;
        }
        self.set(author_id, following);
    }

    /// A lookup failed; the next activation may try again
    pub fn fail_check(&mut self, author_id: &AuthorId) {
        self.checking.remove(author_id);
    }

    /// Optimistically flip the follow flag
    pub fn toggle(&mut self, author_id: &AuthorId) -> FollowChange {
        let previous = self.following.contains(author_id);
        let following = !previous;
        self.set(author_id, following);
        FollowChange {
            author_id: author_id.clone(),
            following,
            previous,
        }
    }

    /// Revert a failed toggle, unless a newer toggle already changed it.
    /// Returns whether the state was restored.
    pub fn rollback(&mut self, change: &FollowChange) -> bool {
        if self.is_following(&change.author_id) != Some(change.following) {
            return false;
        }
        self.set(&change.author_id, change.previous);
        tracing::info!(author = %change.author_id, following = change.previous, "Rolled back follow");
        true
    }

    /// Forget everything (sign out)
    pub fn clear(&mut self) {
        self.following.clear();
        self.known.clear();
        self.checking.clear();
    }

    fn set(&mut self, author_id: &AuthorId, following: bool) {
        self.known.insert(author_id.clone());
        if following {
            self.following.insert(author_id.clone());
        } else {
            self.following.remove(author_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_lookup() {
        let mut state = FollowState::new();
        let author = AuthorId::from("a");

        assert_eq!(state.is_following(&author), None);
        assert!(state.begin_check(&author));
        assert!(!state.begin_check(&author));

        state.complete_check(&author, true);
        assert_eq!(state.is_following(&author), Some(true));
        assert!(!state.begin_check(&author));
    }

    #[test]
    fn test_failed_lookup_can_retry() {
        let mut state = FollowState::new();
        let author = AuthorId::from("a");
        state.begin_check(&author);
        state.fail_check(&author);
        assert!(state.begin_check(&author));
    }

    #[test]
    fn test_toggle_and_rollback() {
        let mut state = FollowState::new();
        let author = AuthorId::from("a");

        let change = state.toggle(&author);
        assert!(change.following);
        assert_eq!(state.is_following(&author), Some(true));

        assert!(state.rollback(&change));
        assert_eq!(state.is_following(&author), Some(false));
    }

    #[test]
    fn test_stale_rollback_ignored() {
        let mut state = FollowState::new();
        let author = AuthorId::from("a");

        let first = state.toggle(&author);
        state.toggle(&author);
        assert!(!state.rollback(&first));
        assert_eq!(state.is_following(&author), Some(false));
    }

    #[test]
    fn test_lookup_after_toggle_is_ignored() {
        let mut state = FollowState::new();
        let author = AuthorId::from("a");

        state.begin_check(&author);
        state.toggle(&author);
        state.complete_check(&author, false);
        assert_eq!(state.is_following(&author), Some(true));
    }
}
