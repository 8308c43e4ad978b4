//! Scripted feed sessions
//!
//! A script is a JSON list of host events replayed in order against a feed
//! backed by `MemoryBackend` and `MemoryMediaBackend`. Time is virtual: it
//! only moves on `advance` steps, and every gesture deadline crossed on the
//! way is ticked.

use anyhow::{Context, Result};
use clips_core::{FeedItem, ItemId, UserContext};
use clips_feed::{BackendCall, ClipsFeed, FeedEvent, MemoryBackend, Operation};
use clips_gesture::{GestureEvent, TapZone};
use clips_playback::MemoryMediaBackend;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One host event
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Layout { extent: f32 },
    Scroll { offset: f32 },
    Visibility { visible: Vec<(usize, f32)> },
    Activate { index: usize },
    Tap { zone: TapZone },
    LongPress { zone: TapZone },
    Release,
    Advance { ms: u64 },
    ToggleLike { index: usize },
    ToggleDislike { index: usize },
    ToggleHype { index: usize },
    Follow { index: usize },
    Comments { index: usize },
    Share { index: usize },
    Swipe { dx: f32, dy: f32 },
    Focus { focused: bool },
    Mute,
    Refresh,
    SignIn { user_id: String },
    SignOut,
    /// Make a backend operation fail from now on
    Fail { operation: Operation },
    Recover { operation: Operation },
    /// Wait for in-flight remote calls
    Settle,
}

/// Final state of a simulated session
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub active_index: usize,
    pub focused: bool,
    pub muted: bool,
    pub live_sessions: Vec<ItemId>,
    pub items: Vec<FeedItem>,
    pub events: Vec<FeedEvent>,
    pub backend_calls: Vec<BackendCall>,
    pub history_entries: usize,
}

/// Virtual clock anchored at simulation start
struct Clock {
    origin: Instant,
    elapsed: Duration,
}

impl Clock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Duration::ZERO,
        }
    }

    fn now(&self) -> Instant {
        self.origin + self.elapsed
    }

    fn set(&mut self, at: Instant) {
        self.elapsed = at.saturating_duration_since(self.origin);
    }
}

pub fn parse_script(text: &str) -> Result<Vec<Step>> {
    serde_json::from_str(text).context("Invalid script")
}

pub fn parse_feed(text: &str) -> Result<Vec<FeedItem>> {
    serde_json::from_str(text).context("Invalid feed")
}

/// Replay `steps` against a fresh feed serving `items`
pub async fn run(
    config: clips_core::ClipsConfig,
    user: UserContext,
    items: Vec<FeedItem>,
    steps: &[Step],
) -> Result<Report> {
    let backend = Arc::new(MemoryBackend::with_items(items));
    let mut feed = ClipsFeed::new(config, user, backend.clone(), MemoryMediaBackend::new())?;
    let mut clock = Clock::new();
    let mut events = Vec::new();

    feed.load().await.context("Initial feed load failed")?;

    for (n, step) in steps.iter().enumerate() {
        tracing::debug!(step = n, ?step, "Replaying");
        apply(&mut feed, &backend, &mut clock, step)
            .await
            .with_context(|| format!("Step {} ({:?}) failed", n, step))?;
        feed.apply_pending_outcomes();
        events.extend(feed.drain_events());
    }

    feed.settle().await;
    events.extend(feed.drain_events());

    let mut live_sessions = feed.playback().live_items();
    live_sessions.sort();

    Ok(Report {
        active_index: feed.active_index(),
        focused: feed.is_focused(),
        muted: feed.is_muted(),
        live_sessions,
        items: feed.store().snapshot(),
        events,
        backend_calls: backend.calls(),
        history_entries: backend.history().len(),
    })
}

async fn apply(
    feed: &mut ClipsFeed<MemoryMediaBackend>,
    backend: &MemoryBackend,
    clock: &mut Clock,
    step: &Step,
) -> Result<()> {
    match step {
        Step::Layout { extent } => {
            feed.on_layout(*extent);
        }
        Step::Scroll { offset } => {
            feed.on_scroll(*offset);
        }
        Step::Visibility { visible } => {
            feed.on_visibility_changed(visible);
        }
        Step::Activate { index } => feed.set_active_index(*index)?,
        Step::Tap { zone } => feed.handle_gesture(GestureEvent::Tap { zone: *zone }, clock.now()),
        Step::LongPress { zone } => {
            feed.handle_gesture(GestureEvent::LongPressStart { zone: *zone }, clock.now())
        }
        Step::Release => feed.handle_gesture(GestureEvent::LongPressEnd, clock.now()),
        Step::Advance { ms } => {
            let target = clock.now() + Duration::from_millis(*ms);
            while let Some(deadline) = feed.next_deadline() {
                if deadline > target {
                    break;
                }
                clock.set(deadline);
                feed.tick(deadline);
            }
            clock.set(target);
        }
        Step::ToggleLike { index } => feed.toggle_like(*index)?,
        Step::ToggleDislike { index } => feed.toggle_dislike(*index)?,
        Step::ToggleHype { index } => feed.toggle_hype(*index)?,
        Step::Follow { index } => feed.toggle_follow(*index)?,
        Step::Comments { index } => feed.open_comments(*index)?,
        Step::Share { index } => feed.share(*index)?,
        Step::Swipe { dx, dy } => {
            feed.drag_begin();
            feed.drag_update(*dx, *dy);
            feed.drag_end(*dx, *dy);
        }
        Step::Focus { focused } => feed.set_focused(*focused),
        Step::Mute => {
            feed.toggle_mute();
        }
        Step::Refresh => {
            feed.refresh().await?;
        }
        Step::SignIn { user_id } => feed.set_user(UserContext::signed_in(user_id.as_str())),
        Step::SignOut => feed.set_user(UserContext::anonymous()),
        Step::Fail { operation } => backend.fail(*operation),
        Step::Recover { operation } => backend.recover(*operation),
        Step::Settle => {
            feed.settle().await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clips_core::ClipsConfig;

    fn items() -> Vec<FeedItem> {
        parse_feed(
            r#"[
                {"id": "a", "authorId": "ann", "mediaUri": "file:///a.mp4", "likeCount": 4},
                {"id": "b", "authorId": "bob", "mediaUri": "file:///b.mp4"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_script() {
        let steps = parse_script(
            r#"[
                {"step": "tap", "zone": "top"},
                {"step": "advance", "ms": 400},
                {"step": "visibility", "visible": [[1, 0.8]]},
                {"step": "fail", "operation": "persist_like"},
                {"step": "mute"}
            ]"#,
        )
        .unwrap();

        assert_eq!(steps[0], Step::Tap { zone: TapZone::Top });
        assert_eq!(steps[2], Step::Visibility { visible: vec![(1, 0.8)] });
        assert_eq!(
            steps[3],
            Step::Fail {
                operation: Operation::PersistLike
            }
        );
    }

    #[test]
    fn test_unknown_step_rejected() {
        assert!(parse_script(r#"[{"step": "teleport"}]"#).is_err());
    }

    #[tokio::test]
    async fn test_double_tap_then_scroll() {
        let steps = vec![
            Step::Layout { extent: 800.0 },
            Step::Tap { zone: TapZone::Top },
            Step::Advance { ms: 100 },
            Step::Tap { zone: TapZone::Top },
            Step::Advance { ms: 500 },
            Step::Scroll { offset: 800.0 },
        ];
        let report = run(
            ClipsConfig::default(),
            UserContext::signed_in("me"),
            items(),
            &steps,
        )
        .await
        .unwrap();

        assert_eq!(report.active_index, 1);
        assert_eq!(report.live_sessions, vec![ItemId::from("b")]);
        assert_eq!(report.items[0].engagement.like_count, 5);
        assert!(report.items[0].engagement.liked_by_current_user);
        assert_eq!(report.history_entries, 2);
        assert_eq!(
            report
                .backend_calls
                .iter()
                .filter(|c| c.operation == Operation::PersistLike)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_anonymous_toggle_reports_sign_in() {
        let steps = vec![Step::ToggleHype { index: 0 }, Step::Share { index: 1 }];
        let report = run(ClipsConfig::default(), UserContext::anonymous(), items(), &steps)
            .await
            .unwrap();

        assert_eq!(report.events[0], FeedEvent::SignInRequired);
        assert!(matches!(report.events[1], FeedEvent::OpenShareSheet(_)));
        assert_eq!(report.items[0].engagement.like_count, 4);
    }

    #[tokio::test]
    async fn test_bad_index_fails_with_step_context() {
        let steps = vec![Step::ToggleLike { index: 9 }];
        let err = run(ClipsConfig::default(), UserContext::anonymous(), items(), &steps)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Step 0"));
    }
}
