//! Engagement state machine
//!
//! Every toggle is a read-modify-write against the store entry resolved by
//! item id at call time. Nothing is composed from a value captured earlier.

use crate::{EngagementError, Result};
use clips_core::{Engagement, ItemId, UserContext, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which engagement signal a toggle targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementKind {
    Like,
    Dislike,
    Hype,
}

impl fmt::Display for EngagementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngagementKind::Like => write!(f, "like"),
            EngagementKind::Dislike => write!(f, "dislike"),
            EngagementKind::Hype => write!(f, "hype"),
        }
    }
}

/// Authoritative home of per-item engagement
pub trait EngagementStore {
    /// Apply `f` to the engagement of `item_id` in place.
    /// Returns `false` when the item is not in the store.
    fn update_engagement(&mut self, item_id: &ItemId, f: &mut dyn FnMut(&mut Engagement)) -> bool;
}

/// One optimistic toggle, as applied locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementChange {
    pub item_id: ItemId,
    pub user_id: UserId,
    pub kind: EngagementKind,
    /// New value of the toggled flag; decides which remote write to fire
    pub enabled: bool,
    pub before: Engagement,
    pub after: Engagement,
}

// ============== Pure Transitions ==============

fn inc(count: &mut u64) {
    *count = count.saturating_add(1);
}

fn dec(count: &mut u64) {
    *count = count.saturating_sub(1);
}

/// Flip like. Off cascades hype off; on clears dislike.
pub fn apply_toggle_like(e: &mut Engagement) -> bool {
    if e.liked_by_current_user {
        e.liked_by_current_user = false;
        dec(&mut e.like_count);
        if e.hyped_by_current_user {
            e.hyped_by_current_user = false;
            dec(&mut e.hype_count);
        }
    } else {
        e.liked_by_current_user = true;
        inc(&mut e.like_count);
        e.disliked_by_current_user = false;
    }
    e.liked_by_current_user
}

/// Flip dislike. On clears like and hype with their counters.
pub fn apply_toggle_dislike(e: &mut Engagement) -> bool {
    e.disliked_by_current_user = !e.disliked_by_current_user;
    if e.disliked_by_current_user {
        if e.liked_by_current_user {
            e.liked_by_current_user = false;
            dec(&mut e.like_count);
        }
        if e.hyped_by_current_user {
            e.hyped_by_current_user = false;
            dec(&mut e.hype_count);
        }
    }
    e.disliked_by_current_user
}

/// Flip hype. On clears dislike and forces like on.
pub fn apply_toggle_hype(e: &mut Engagement) -> bool {
    if e.hyped_by_current_user {
        e.hyped_by_current_user = false;
        dec(&mut e.hype_count);
    } else {
        e.hyped_by_current_user = true;
        inc(&mut e.hype_count);
        e.disliked_by_current_user = false;
        if !e.liked_by_current_user {
            e.liked_by_current_user = true;
            inc(&mut e.like_count);
        }
    }
    e.hyped_by_current_user
}

// ============== State Machine ==============

/// Applies engagement toggles for one signed-in user
#[derive(Debug, Clone)]
pub struct EngagementStateMachine {
    user: UserContext,
    rollback_on_failure: bool,
}

impl EngagementStateMachine {
    pub fn new(user: UserContext, rollback_on_failure: bool) -> Self {
        Self {
            user,
            rollback_on_failure,
        }
    }

    pub fn user(&self) -> &UserContext {
        &self.user
    }

    /// Swap the signed-in user (sign in / sign out)
    pub fn set_user(&mut self, user: UserContext) {
        self.user = user;
    }

    pub fn rollback_on_failure(&self) -> bool {
        self.rollback_on_failure
    }

    pub fn toggle_like<S: EngagementStore>(
        &self,
        store: &mut S,
        item_id: &ItemId,
    ) -> Result<EngagementChange> {
        self.apply(store, item_id, EngagementKind::Like, apply_toggle_like)
    }

    pub fn toggle_dislike<S: EngagementStore>(
        &self,
        store: &mut S,
        item_id: &ItemId,
    ) -> Result<EngagementChange> {
        self.apply(store, item_id, EngagementKind::Dislike, apply_toggle_dislike)
    }

    pub fn toggle_hype<S: EngagementStore>(
        &self,
        store: &mut S,
        item_id: &ItemId,
    ) -> Result<EngagementChange> {
        self.apply(store, item_id, EngagementKind::Hype, apply_toggle_hype)
    }

    /// Double-tap like: turns like on, never off.
    /// `Ok(None)` when the item is already liked.
    pub fn like_on<S: EngagementStore>(
        &self,
        store: &mut S,
        item_id: &ItemId,
    ) -> Result<Option<EngagementChange>> {
        let user_id = self.require_user()?;
        let mut change = None;

        let found = store.update_engagement(item_id, &mut |e| {
            if e.liked_by_current_user {
                return;
            }
            let before = *e;
            apply_toggle_like(e);
            change = Some(EngagementChange {
                item_id: item_id.clone(),
                user_id: user_id.clone(),
                kind: EngagementKind::Like,
                enabled: true,
                before,
                after: *e,
            });
        });

        if !found {
            return Err(EngagementError::ItemNotFound(item_id.clone()));
        }
        Ok(change)
    }

    /// Undo a failed optimistic toggle.
    ///
    /// Only restores `before` when the item still holds exactly the
    /// optimistic `after`; a later toggle wins over the rollback.
    /// Returns whether anything was restored.
    pub fn rollback<S: EngagementStore>(&self, store: &mut S, change: &EngagementChange) -> bool {
        let mut restored = false;
        store.update_engagement(&change.item_id, &mut |e| {
            if *e == change.after {
                *e = change.before;
                restored = true;
            }
        });

        if restored {
            tracing::info!(item = %change.item_id, kind = %change.kind, "Rolled back engagement");
        } else {
            tracing::debug!(item = %change.item_id, kind = %change.kind, "Rollback skipped, state moved on");
        }
        restored
    }

    fn require_user(&self) -> Result<&UserId> {
        self.user.user_id.as_ref().ok_or(EngagementError::SignInRequired)
    }

    fn apply<S, F>(
        &self,
        store: &mut S,
        item_id: &ItemId,
        kind: EngagementKind,
        transition: F,
    ) -> Result<EngagementChange>
    where
        S: EngagementStore,
        F: Fn(&mut Engagement) -> bool,
    {
        let user_id = self.require_user()?;
        let mut change = None;

        let found = store.update_engagement(item_id, &mut |e| {
            let before = *e;
            let enabled = transition(e);
            change = Some(EngagementChange {
                item_id: item_id.clone(),
                user_id: user_id.clone(),
                kind,
                enabled,
                before,
                after: *e,
            });
        });

        match change {
            Some(change) if found => {
                tracing::debug!(
                    item = %item_id,
                    kind = %kind,
                    enabled = change.enabled,
                    "Engagement toggled"
                );
                Ok(change)
            }
            _ => Err(EngagementError::ItemNotFound(item_id.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStore(HashMap<ItemId, Engagement>);

    impl EngagementStore for MapStore {
        fn update_engagement(
            &mut self,
            item_id: &ItemId,
            f: &mut dyn FnMut(&mut Engagement),
        ) -> bool {
            match self.0.get_mut(item_id) {
                Some(e) => {
                    f(e);
                    true
                }
                None => false,
            }
        }
    }

    fn setup(e: Engagement) -> (EngagementStateMachine, MapStore, ItemId) {
        let id = ItemId::from("clip");
        let mut store = MapStore::default();
        store.0.insert(id.clone(), e);
        (
            EngagementStateMachine::new(UserContext::signed_in("me"), false),
            store,
            id,
        )
    }

    fn state(store: &MapStore, id: &ItemId) -> Engagement {
        store.0[id]
    }

    #[test]
    fn test_hype_implies_like_cascade() {
        let (m, mut store, id) = setup(Engagement {
            like_count: 5,
            hype_count: 2,
            ..Default::default()
        });

        m.toggle_hype(&mut store, &id).unwrap();
        let e = state(&store, &id);
        assert!(e.liked_by_current_user);
        assert_eq!(e.like_count, 6);
        assert!(e.hyped_by_current_user);
        assert_eq!(e.hype_count, 3);

        let change = m.toggle_like(&mut store, &id).unwrap();
        assert!(!change.enabled);
        let e = state(&store, &id);
        assert!(!e.liked_by_current_user);
        assert_eq!(e.like_count, 5);
        assert!(!e.hyped_by_current_user);
        assert_eq!(e.hype_count, 2);
    }

    #[test]
    fn test_dislike_clears_like() {
        let (m, mut store, id) = setup(Engagement {
            like_count: 10,
            liked_by_current_user: true,
            ..Default::default()
        });

        let change = m.toggle_dislike(&mut store, &id).unwrap();
        assert_eq!(change.kind, EngagementKind::Dislike);
        assert!(change.enabled);
        assert_eq!(
            state(&store, &id),
            Engagement {
                like_count: 9,
                liked_by_current_user: false,
                hype_count: 0,
                hyped_by_current_user: false,
                disliked_by_current_user: true,
            }
        );
    }

    #[test]
    fn test_dislike_off_changes_nothing_else() {
        let (m, mut store, id) = setup(Engagement {
            like_count: 3,
            disliked_by_current_user: true,
            ..Default::default()
        });
        m.toggle_dislike(&mut store, &id).unwrap();
        let e = state(&store, &id);
        assert!(!e.disliked_by_current_user);
        assert_eq!(e.like_count, 3);
        assert!(!e.liked_by_current_user);
    }

    #[test]
    fn test_like_clears_dislike() {
        let (m, mut store, id) = setup(Engagement {
            disliked_by_current_user: true,
            ..Default::default()
        });
        m.toggle_like(&mut store, &id).unwrap();
        let e = state(&store, &id);
        assert!(e.liked_by_current_user);
        assert!(!e.disliked_by_current_user);
        assert_eq!(e.like_count, 1);
    }

    #[test]
    fn test_hype_off_leaves_like() {
        let (m, mut store, id) = setup(Engagement::default());
        m.toggle_hype(&mut store, &id).unwrap();
        m.toggle_hype(&mut store, &id).unwrap();
        let e = state(&store, &id);
        assert!(e.liked_by_current_user);
        assert_eq!(e.like_count, 1);
        assert!(!e.hyped_by_current_user);
        assert_eq!(e.hype_count, 0);
    }

    #[test]
    fn test_counters_floor_at_zero() {
        // Server counts can lag behind the user's flags
        let (m, mut store, id) = setup(Engagement {
            liked_by_current_user: true,
            hyped_by_current_user: true,
            ..Default::default()
        });
        m.toggle_like(&mut store, &id).unwrap();
        let e = state(&store, &id);
        assert_eq!(e.like_count, 0);
        assert_eq!(e.hype_count, 0);
    }

    #[test]
    fn test_invariants_hold_for_every_sequence() {
        // All sequences of length 6 over the three toggles
        let toggles = [
            EngagementKind::Like,
            EngagementKind::Dislike,
            EngagementKind::Hype,
        ];
        for seq in 0..3usize.pow(6) {
            let (m, mut store, id) = setup(Engagement {
                like_count: 1,
                hype_count: 0,
                ..Default::default()
            });
            let mut n = seq;
            for _ in 0..6 {
                let kind = toggles[n % 3];
                n /= 3;
                let result = match kind {
                    EngagementKind::Like => m.toggle_like(&mut store, &id),
                    EngagementKind::Dislike => m.toggle_dislike(&mut store, &id),
                    EngagementKind::Hype => m.toggle_hype(&mut store, &id),
                };
                result.unwrap();
                let e = state(&store, &id);
                assert!(e.is_consistent(), "sequence {} broke invariants: {:?}", seq, e);
            }
        }
    }

    #[test]
    fn test_like_on_never_turns_off() {
        let (m, mut store, id) = setup(Engagement::default());
        assert!(m.like_on(&mut store, &id).unwrap().is_some());
        assert!(m.like_on(&mut store, &id).unwrap().is_none());
        let e = state(&store, &id);
        assert!(e.liked_by_current_user);
        assert_eq!(e.like_count, 1);
    }

    #[test]
    fn test_requires_sign_in() {
        let (_, mut store, id) = setup(Engagement::default());
        let m = EngagementStateMachine::new(UserContext::anonymous(), false);
        assert_eq!(
            m.toggle_like(&mut store, &id),
            Err(EngagementError::SignInRequired)
        );
        assert_eq!(state(&store, &id), Engagement::default());
    }

    #[test]
    fn test_unknown_item() {
        let (m, mut store, _) = setup(Engagement::default());
        let ghost = ItemId::from("ghost");
        assert_eq!(
            m.toggle_hype(&mut store, &ghost),
            Err(EngagementError::ItemNotFound(ghost.clone()))
        );
    }

    #[test]
    fn test_rollback_is_compare_and_swap() {
        let (m, mut store, id) = setup(Engagement::default());

        let change = m.toggle_like(&mut store, &id).unwrap();
        assert!(m.rollback(&mut store, &change));
        assert_eq!(state(&store, &id), Engagement::default());

        // A newer toggle wins over a stale rollback
        let change = m.toggle_like(&mut store, &id).unwrap();
        m.toggle_hype(&mut store, &id).unwrap();
        assert!(!m.rollback(&mut store, &change));
        assert!(state(&store, &id).hyped_by_current_user);
    }
}
