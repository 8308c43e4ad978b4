//! Fire-and-forget remote sync
//!
//! Every remote write runs as its own tokio task. The task never touches
//! engine state: it reports one `SyncOutcome` over a channel and the engine
//! applies it on its own turn. A task that dies before reporting (panic in
//! the backend, runtime shutdown) reports a failed outcome instead, so every
//! spawned call is answered exactly once.

use crate::backend::{FeedBackend, RemoteResult};
use clips_core::{AuthorId, HistoryEntry, ItemId, RemoteError, UserId};
use clips_engagement::{EngagementChange, EngagementKind, FollowChange};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Result of one background remote call
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Engagement {
        change: EngagementChange,
        result: RemoteResult<()>,
    },
    /// Follow outcomes name the user they were issued for; the engine drops
    /// them once that user is no longer signed in.
    Follow {
        user_id: UserId,
        change: FollowChange,
        result: RemoteResult<()>,
    },
    FollowCheck {
        user_id: UserId,
        author_id: AuthorId,
        result: RemoteResult<bool>,
    },
    History {
        item_id: ItemId,
        result: RemoteResult<()>,
    },
    ViewIncrement {
        item_id: ItemId,
        result: RemoteResult<()>,
    },
}

/// Spawns remote calls and collects their outcomes
pub struct SyncDispatcher {
    backend: Arc<dyn FeedBackend>,
    runtime: Handle,
    tx: mpsc::UnboundedSender<SyncOutcome>,
    rx: mpsc::UnboundedReceiver<SyncOutcome>,
    in_flight: usize,
}

impl SyncDispatcher {
    pub fn new(backend: Arc<dyn FeedBackend>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            runtime,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn backend(&self) -> &Arc<dyn FeedBackend> {
        &self.backend
    }

    /// Calls spawned whose outcome has not been taken yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Run `task` on the runtime. `fallback` is reported if the task is
    /// dropped before it finishes.
    fn spawn<F>(&mut self, fallback: SyncOutcome, task: F)
    where
        F: Future<Output = SyncOutcome> + Send + 'static,
    {
        self.in_flight += 1;
        let reply = Reply {
            slot: Some((self.tx.clone(), fallback)),
        };
        self.runtime.spawn(async move {
            let outcome = task.await;
            reply.send(outcome);
        });
    }

    // ============== Writes ==============

    /// One remote write per user-facing toggle
    pub fn persist_engagement(&mut self, change: EngagementChange) {
        let backend = Arc::clone(&self.backend);
        let fallback = SyncOutcome::Engagement {
            change: change.clone(),
            result: Err(aborted()),
        };
        self.spawn(fallback, async move {
            let item = &change.item_id;
            let user = &change.user_id;
            let result = match (change.kind, change.enabled) {
                (EngagementKind::Like, true) => backend.persist_like(item, user).await,
                (EngagementKind::Like, false) => backend.persist_unlike(item, user).await,
                (EngagementKind::Dislike, true) => backend.persist_dislike(item, user).await,
                (EngagementKind::Dislike, false) => backend.persist_undislike(item, user).await,
                (EngagementKind::Hype, true) => backend.persist_hype(item, user).await,
                (EngagementKind::Hype, false) => backend.persist_unhype(item, user).await,
            };
            SyncOutcome::Engagement { change, result }
        });
    }

    pub fn persist_follow(&mut self, user_id: UserId, change: FollowChange) {
        let backend = Arc::clone(&self.backend);
        let fallback = SyncOutcome::Follow {
            user_id: user_id.clone(),
            change: change.clone(),
            result: Err(aborted()),
        };
        self.spawn(fallback, async move {
            let result = if change.following {
                backend.persist_follow(&user_id, &change.author_id).await
            } else {
                backend.persist_unfollow(&user_id, &change.author_id).await
            };
            SyncOutcome::Follow {
                user_id,
                change,
                result,
            }
        });
    }

    pub fn check_follow(&mut self, user_id: UserId, author_id: AuthorId) {
        let backend = Arc::clone(&self.backend);
        let fallback = SyncOutcome::FollowCheck {
            user_id: user_id.clone(),
            author_id: author_id.clone(),
            result: Err(aborted()),
        };
        self.spawn(fallback, async move {
            let result = backend.check_follow_state(&user_id, &author_id).await;
            SyncOutcome::FollowCheck {
                user_id,
                author_id,
                result,
            }
        });
    }

    pub fn record_history(&mut self, entry: HistoryEntry) {
        let backend = Arc::clone(&self.backend);
        let fallback = SyncOutcome::History {
            item_id: entry.item_id.clone(),
            result: Err(aborted()),
        };
        self.spawn(fallback, async move {
            let result = backend.record_history_entry(&entry).await;
            SyncOutcome::History {
                item_id: entry.item_id,
                result,
            }
        });
    }

    pub fn record_view(&mut self, item_id: ItemId) {
        let backend = Arc::clone(&self.backend);
        let fallback = SyncOutcome::ViewIncrement {
            item_id: item_id.clone(),
            result: Err(aborted()),
        };
        self.spawn(fallback, async move {
            let result = backend.record_view_increment(&item_id).await;
            SyncOutcome::ViewIncrement { item_id, result }
        });
    }

    // ============== Outcomes ==============

    /// Next finished outcome, without waiting
    pub fn try_next(&mut self) -> Option<SyncOutcome> {
        let outcome = self.rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(outcome)
    }

    /// Wait for the next outcome. `None` when nothing is in flight.
    pub async fn next(&mut self) -> Option<SyncOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let outcome = self.rx.recv().await?;
        self.in_flight -= 1;
        Some(outcome)
    }
}

fn aborted() -> RemoteError {
    RemoteError::Unavailable("sync task aborted".to_string())
}

/// Reply slot owned by a spawned task. Dropping it unsent reports the
/// fallback outcome.
struct Reply {
    slot: Option<(mpsc::UnboundedSender<SyncOutcome>, SyncOutcome)>,
}

impl Reply {
    fn send(mut self, outcome: SyncOutcome) {
        if let Some((tx, _)) = self.slot.take() {
            // Receiver lives as long as the dispatcher; a send error only
            // means the engine was dropped.
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if let Some((tx, fallback)) = self.slot.take() {
            tracing::warn!(?fallback, "Sync task ended without reporting");
            let _ = tx.send(fallback);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use async_trait::async_trait;
    use clips_core::FeedItem;
    use std::time::Duration;

    /// Backend whose every call panics
    struct BrokenBackend;

    #[async_trait]
    impl FeedBackend for BrokenBackend {
        async fn fetch_feed_items(&self) -> RemoteResult<Vec<FeedItem>> {
            panic!("backend crashed")
        }
        async fn persist_like(&self, _: &ItemId, _: &UserId) -> RemoteResult<()> {
            panic!("backend crashed")
        }
        async fn persist_unlike(&self, _: &ItemId, _: &UserId) -> RemoteResult<()> {
            panic!("backend crashed")
        }
        async fn persist_dislike(&self, _: &ItemId, _: &UserId) -> RemoteResult<()> {
            panic!("backend crashed")
        }
        async fn persist_undislike(&self, _: &ItemId, _: &UserId) -> RemoteResult<()> {
            panic!("backend crashed")
        }
        async fn persist_hype(&self, _: &ItemId, _: &UserId) -> RemoteResult<()> {
            panic!("backend crashed")
        }
        async fn persist_unhype(&self, _: &ItemId, _: &UserId) -> RemoteResult<()> {
            panic!("backend crashed")
        }
        async fn persist_follow(&self, _: &UserId, _: &AuthorId) -> RemoteResult<()> {
            panic!("backend crashed")
        }
        async fn persist_unfollow(&self, _: &UserId, _: &AuthorId) -> RemoteResult<()> {
            panic!("backend crashed")
        }
        async fn check_follow_state(&self, _: &UserId, _: &AuthorId) -> RemoteResult<bool> {
            panic!("backend crashed")
        }
        async fn record_history_entry(&self, _: &HistoryEntry) -> RemoteResult<()> {
            panic!("backend crashed")
        }
        async fn record_view_increment(&self, _: &ItemId) -> RemoteResult<()> {
            panic!("backend crashed")
        }
    }

    fn dispatcher(backend: Arc<dyn FeedBackend>) -> SyncDispatcher {
        SyncDispatcher::new(backend, Handle::current())
    }

    #[tokio::test]
    async fn test_outcome_reported_once() {
        let mut sync = dispatcher(Arc::new(MemoryBackend::new()));
        sync.record_view(ItemId::from("a"));
        assert_eq!(sync.in_flight(), 1);

        let outcome = sync.next().await;
        assert_eq!(
            outcome,
            Some(SyncOutcome::ViewIncrement {
                item_id: ItemId::from("a"),
                result: Ok(()),
            })
        );
        assert_eq!(sync.in_flight(), 0);
        assert_eq!(sync.next().await, None);
    }

    #[tokio::test]
    async fn test_panicking_task_reports_failure() {
        let mut sync = dispatcher(Arc::new(BrokenBackend));
        sync.record_view(ItemId::from("a"));
        sync.check_follow(UserId::from("me"), AuthorId::from("ann"));

        let mut outcomes = Vec::new();
        let drained = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(outcome) = sync.next().await {
                outcomes.push(outcome);
            }
        })
        .await;

        assert!(drained.is_ok(), "settling must not hang");
        assert_eq!(sync.in_flight(), 0);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.contains(&SyncOutcome::FollowCheck {
            user_id: UserId::from("me"),
            author_id: AuthorId::from("ann"),
            result: Err(aborted()),
        }));
        assert!(outcomes.iter().all(|o| matches!(
            o,
            SyncOutcome::ViewIncrement { result: Err(_), .. }
                | SyncOutcome::FollowCheck { result: Err(_), .. }
        )));
    }
}
