//! Clips feed engine
//!
//! `ClipsFeed` is the one object the host talks to. It owns the feed store,
//! the viewport, the playback arena, the gesture recognizer of the active
//! clip and the sync dispatcher, and keeps them consistent on every event.

use crate::backend::FeedBackend;
use crate::store::FeedDataStore;
use crate::swipe::{SwipeDetector, SwipeOutcome};
use crate::sync::{SyncDispatcher, SyncOutcome};
use crate::viewport::FeedViewportController;
use crate::{FeedError, Result};
use clips_core::{
    AuthorId, ClipsConfig, FeedItem, HistoryEntry, ItemId, ShareData, UserContext, UserId,
};
use clips_engagement::{EngagementError, EngagementKind, EngagementStateMachine, FollowState};
use clips_gesture::{GestureAction, GestureEvent, GestureRecognizer};
use clips_playback::{MediaBackend, PlaybackEvent, PlaybackResourceManager};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;

/// Outbound notifications for the host UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedEvent {
    /// An engagement or follow action needs a signed-in user
    SignInRequired,
    NavigateToProfile { author_id: AuthorId },
    OpenComments { item_id: ItemId },
    OpenShareSheet(ShareData),
    /// Render the placeholder instead of the video
    MediaUnavailable { item_id: ItemId, reason: String },
}

/// Headless short-form video feed
pub struct ClipsFeed<M: MediaBackend> {
    config: ClipsConfig,
    store: FeedDataStore,
    viewport: FeedViewportController,
    playback: PlaybackResourceManager<M>,
    gestures: GestureRecognizer,
    engagement: EngagementStateMachine,
    follows: FollowState,
    swipe: SwipeDetector,
    sync: SyncDispatcher,

    /// Feed-wide mute, applied to every new session
    muted: bool,

    events: Vec<FeedEvent>,
}

impl<M: MediaBackend> ClipsFeed<M> {
    /// Create an empty feed. Must be called inside a tokio runtime; remote
    /// calls are spawned on it.
    pub fn new(
        config: ClipsConfig,
        user: UserContext,
        backend: Arc<dyn FeedBackend>,
        media: M,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| FeedError::NoRuntime)?;

        tracing::info!(
            signed_in = user.is_signed_in(),
            window = config.playback.window_size(),
            rollback = config.engagement.rollback_on_failure,
            "Clips feed created"
        );

        Ok(Self {
            store: FeedDataStore::new(),
            viewport: FeedViewportController::new(config.viewport.clone(), &config.playback),
            playback: PlaybackResourceManager::new(media),
            gestures: GestureRecognizer::new(config.gesture.clone()),
            engagement: EngagementStateMachine::new(user, config.engagement.rollback_on_failure),
            follows: FollowState::new(),
            swipe: SwipeDetector::new(config.viewport.clone()),
            sync: SyncDispatcher::new(backend, runtime),
            muted: false,
            events: Vec::new(),
            config,
        })
    }

    // ============== Loading ==============

    /// Fetch the feed and show it from the top
    pub async fn load(&mut self) -> Result<usize> {
        let backend = Arc::clone(self.sync.backend());
        let items = backend.fetch_feed_items().await?;
        self.replace_items(items);
        Ok(self.store.len())
    }

    /// Pull-to-refresh
    pub async fn refresh(&mut self) -> Result<usize> {
        tracing::info!(items = self.store.len(), "Refreshing feed");
        self.load().await
    }

    /// Replace the feed wholesale. Active index goes back to 0 and the
    /// window is acquired again.
    pub fn replace_items(&mut self, items: Vec<FeedItem>) {
        self.gestures.reset();
        self.swipe.cancel();
        self.playback.clear_window();
        self.store.replace(items);
        self.viewport.reset(self.store.len());
        self.sync_window();
    }

    // ============== Viewport ==============

    /// Visibility report from the list surface
    pub fn on_visibility_changed(&mut self, visible: &[(usize, f32)]) -> Option<usize> {
        let previous = self.active_id();
        let changed = self.viewport.on_visibility_changed(visible)?;
        self.on_active_changed(previous);
        Some(changed)
    }

    /// Raw scroll offset from the surface
    pub fn on_scroll(&mut self, offset: f32) -> Option<usize> {
        let previous = self.active_id();
        let changed = self.viewport.on_scroll(offset)?;
        self.on_active_changed(previous);
        Some(changed)
    }

    /// Item extent re-measured; returns the offset to scroll to
    pub fn on_layout(&mut self, extent: f32) -> f32 {
        self.viewport.on_layout(extent)
    }

    /// Where a released scroll at `offset` should settle
    pub fn snap_target(&self, offset: f32) -> (usize, f32) {
        self.viewport.snap_target(offset)
    }

    /// Jump straight to `index` (programmatic scroll)
    pub fn set_active_index(&mut self, index: usize) -> Result<()> {
        self.item_id_at(index)?;
        let previous = self.active_id();
        if self.viewport.set_active(index).is_some() {
            self.on_active_changed(previous);
        }
        Ok(())
    }

    fn on_active_changed(&mut self, previous: Option<ItemId>) {
        // Scrub state belongs to the clip being left
        let actions = self.gestures.reset();
        if let Some(previous) = previous {
            self.apply_actions(&previous, actions);
            if let Some(session) = self.playback.session_mut(&previous) {
                session.pause();
            }
        }
        self.swipe.cancel();
        self.sync_window();
    }

    /// Bring the playback arena in line with the viewport window
    fn sync_window(&mut self) {
        let members: Vec<ItemId> = match self.viewport.window() {
            Some(range) => range
                .filter_map(|index| self.store.id_at(index).cloned())
                .collect(),
            None => Vec::new(),
        };
        let active = self.active_id();

        self.playback.set_window(members.iter().cloned(), active.clone());

        if self.playback.is_focused() {
            for item_id in &members {
                if let Some(item) = self.store.get(item_id) {
                    self.playback.acquire(item);
                }
            }

            let playing = self.gestures.is_playing();
            let rate = self.gestures.rate();
            for item_id in &members {
                if let Some(session) = self.playback.session_mut(item_id) {
                    session.set_muted(self.muted);
                    if active.as_ref() == Some(item_id) && playing {
                        session.set_rate(rate);
                        session.play();
                    } else {
                        session.pause();
                    }
                }
            }
        }

        self.drain_playback_events();

        if let Some(item_id) = active {
            self.check_follow(&item_id);
        }
    }

    fn drain_playback_events(&mut self) {
        for event in self.playback.drain_events() {
            match event {
                PlaybackEvent::ViewRecorded(item_id) => {
                    if let Some(item) = self.store.get(&item_id) {
                        let entry = HistoryEntry::for_item(item, self.engagement.user());
                        tracing::debug!(item = %item_id, "Recording view");
                        self.sync.record_history(entry);
                        self.sync.record_view(item_id);
                    }
                }
                PlaybackEvent::DecodeFailed { item_id, reason } => {
                    self.events.push(FeedEvent::MediaUnavailable { item_id, reason });
                }
            }
        }
    }

    /// Look up the follow state of the active author the first time one of
    /// their clips becomes active
    fn check_follow(&mut self, item_id: &ItemId) {
        let user_id = match &self.engagement.user().user_id {
            Some(user_id) => user_id.clone(),
            None => return,
        };
        let author_id = match self.store.get(item_id) {
            Some(item) => item.author_id.clone(),
            None => return,
        };
        if self.follows.begin_check(&author_id) {
            self.sync.check_follow(user_id, author_id);
        }
    }

    // ============== Focus ==============

    /// Screen focus. Blur frees every decoder; focus brings the window back
    /// and resumes only the active clip.
    pub fn set_focused(&mut self, focused: bool) {
        if self.playback.is_focused() == focused {
            return;
        }
        tracing::debug!(focused, "Feed focus changed");

        if focused {
            self.playback.set_focused(true);
            self.gestures.reset();
            self.sync_window();
        } else {
            self.gestures.cancel();
            self.swipe.cancel();
            self.playback.set_focused(false);
        }
    }

    pub fn is_focused(&self) -> bool {
        self.playback.is_focused()
    }

    // ============== Gestures ==============

    /// Gesture on the active clip's surface
    pub fn handle_gesture(&mut self, event: GestureEvent, now: Instant) {
        let Some(item_id) = self.active_id() else {
            return;
        };
        if !self.playback.is_focused() {
            tracing::debug!(?event, "Gesture ignored while blurred");
            return;
        }
        let actions = self.gestures.handle(event, now);
        self.apply_actions(&item_id, actions);
    }

    /// Timer expiry; call at `next_deadline`
    pub fn tick(&mut self, now: Instant) {
        let Some(item_id) = self.active_id() else {
            return;
        };
        let actions = self.gestures.tick(now);
        self.apply_actions(&item_id, actions);
    }

    /// When the host should call `tick` next
    pub fn next_deadline(&self) -> Option<Instant> {
        self.gestures.next_deadline()
    }

    fn apply_actions(&mut self, item_id: &ItemId, actions: Vec<GestureAction>) {
        for action in actions {
            match action {
                GestureAction::LikeOn => self.like_on(item_id),
                GestureAction::SetPlaying(playing) => {
                    if let Some(session) = self.playback.session_mut(item_id) {
                        if playing {
                            session.play();
                        } else {
                            session.pause();
                        }
                    }
                }
                GestureAction::SetRate(rate) => {
                    if let Some(session) = self.playback.session_mut(item_id) {
                        session.set_rate(rate);
                    }
                }
                GestureAction::SeekBackward(step) => {
                    if let Some(session) = self.playback.session_mut(item_id) {
                        session.seek_backward(step);
                    }
                }
            }
        }
    }

    fn like_on(&mut self, item_id: &ItemId) {
        match self.engagement.like_on(&mut self.store, item_id) {
            Ok(Some(change)) => self.sync.persist_engagement(change),
            Ok(None) => tracing::debug!(item = %item_id, "Double tap on liked clip"),
            Err(EngagementError::SignInRequired) => self.events.push(FeedEvent::SignInRequired),
            Err(err) => tracing::debug!(item = %item_id, error = %err, "Double tap like dropped"),
        }
    }

    /// Flip the feed-wide mute. Audio only; play state and rate are kept.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        for item_id in self.playback.live_items() {
            if let Some(session) = self.playback.session_mut(&item_id) {
                session.set_muted(self.muted);
            }
        }
        self.muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    // ============== Engagement ==============

    pub fn toggle_like(&mut self, index: usize) -> Result<()> {
        let item_id = self.item_id_at(index)?;
        self.toggle(&item_id, EngagementKind::Like)
    }

    pub fn toggle_dislike(&mut self, index: usize) -> Result<()> {
        let item_id = self.item_id_at(index)?;
        self.toggle(&item_id, EngagementKind::Dislike)
    }

    pub fn toggle_hype(&mut self, index: usize) -> Result<()> {
        let item_id = self.item_id_at(index)?;
        self.toggle(&item_id, EngagementKind::Hype)
    }

    /// Toggle by id, for hosts that keep ids instead of positions
    pub fn toggle_by_id(&mut self, item_id: &ItemId, kind: EngagementKind) -> Result<()> {
        self.toggle(item_id, kind)
    }

    fn toggle(&mut self, item_id: &ItemId, kind: EngagementKind) -> Result<()> {
        let result = match kind {
            EngagementKind::Like => self.engagement.toggle_like(&mut self.store, item_id),
            EngagementKind::Dislike => self.engagement.toggle_dislike(&mut self.store, item_id),
            EngagementKind::Hype => self.engagement.toggle_hype(&mut self.store, item_id),
        };

        match result {
            Ok(change) => {
                self.sync.persist_engagement(change);
                Ok(())
            }
            Err(EngagementError::SignInRequired) => {
                self.events.push(FeedEvent::SignInRequired);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Follow or unfollow the author of the item at `index`
    pub fn toggle_follow(&mut self, index: usize) -> Result<()> {
        let item_id = self.item_id_at(index)?;
        let Some(user_id) = self.engagement.user().user_id.clone() else {
            self.events.push(FeedEvent::SignInRequired);
            return Ok(());
        };
        let author_id = self
            .store
            .get(&item_id)
            .map(|item| item.author_id.clone())
            .ok_or_else(|| FeedError::ItemNotFound(item_id.clone()))?;

        let change = self.follows.toggle(&author_id);
        tracing::debug!(author = %author_id, following = change.following, "Follow toggled");
        self.sync.persist_follow(user_id, change);
        Ok(())
    }

    /// Swap the signed-in user. Known follow state belongs to the old user.
    pub fn set_user(&mut self, user: UserContext) {
        tracing::info!(signed_in = user.is_signed_in(), "User changed");
        self.engagement.set_user(user);
        self.follows.clear();
        if let Some(item_id) = self.active_id() {
            self.check_follow(&item_id);
        }
    }

    // ============== Hand-offs ==============

    pub fn open_comments(&mut self, index: usize) -> Result<()> {
        let item_id = self.item_id_at(index)?;
        self.events.push(FeedEvent::OpenComments { item_id });
        Ok(())
    }

    pub fn share(&mut self, index: usize) -> Result<()> {
        let item = self.item_at(index)?;
        let data = ShareData::from(item);
        self.events.push(FeedEvent::OpenShareSheet(data));
        Ok(())
    }

    /// Author tap on the overlay
    pub fn open_profile(&mut self, index: usize) -> Result<()> {
        let author_id = self.item_at(index)?.author_id.clone();
        self.events.push(FeedEvent::NavigateToProfile { author_id });
        Ok(())
    }

    // ============== Horizontal Swipe ==============

    pub fn drag_begin(&mut self) {
        self.swipe.begin();
    }

    /// Cumulative drag displacement. `true` means the drag is captured
    /// horizontally and the host must not scroll.
    pub fn drag_update(&mut self, dx: f32, dy: f32) -> bool {
        self.swipe.update(dx, dy)
    }

    /// Finish the drag; a long enough left swipe opens the author's profile
    pub fn drag_end(&mut self, dx: f32, dy: f32) -> Option<AuthorId> {
        if self.swipe.end(dx, dy) != SwipeOutcome::NavigateToProfile {
            return None;
        }
        let author_id = self.active_item()?.author_id.clone();
        self.events.push(FeedEvent::NavigateToProfile {
            author_id: author_id.clone(),
        });
        Some(author_id)
    }

    // ============== Remote Outcomes ==============

    /// Apply outcomes that already arrived, without waiting
    pub fn apply_pending_outcomes(&mut self) -> usize {
        let mut applied = 0;
        while let Some(outcome) = self.sync.try_next() {
            self.apply_outcome(outcome);
            applied += 1;
        }
        applied
    }

    /// Wait for every in-flight remote call and apply its outcome
    pub async fn settle(&mut self) -> usize {
        let mut applied = 0;
        while let Some(outcome) = self.sync.next().await {
            self.apply_outcome(outcome);
            applied += 1;
        }
        applied
    }

    /// Remote calls whose outcome has not been applied yet
    pub fn in_flight(&self) -> usize {
        self.sync.in_flight()
    }

    fn apply_outcome(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Engagement { change, result } => match result {
                Ok(()) => tracing::debug!(item = %change.item_id, kind = %change.kind, "Engagement synced"),
                Err(err) => {
                    tracing::warn!(
                        item = %change.item_id,
                        kind = %change.kind,
                        error = %err,
                        "Engagement sync failed"
                    );
                    if self.engagement.rollback_on_failure() {
                        self.engagement.rollback(&mut self.store, &change);
                    }
                }
            },
            // Follow state was cleared when this user signed out
            SyncOutcome::Follow { user_id, change, .. } if !self.is_current_user(&user_id) => {
                tracing::debug!(
                    user = %user_id,
                    author = %change.author_id,
                    "Dropped follow outcome for previous user"
                );
            }
            SyncOutcome::FollowCheck {
                user_id, author_id, ..
            } if !self.is_current_user(&user_id) => {
                tracing::debug!(
                    user = %user_id,
                    author = %author_id,
                    "Dropped follow lookup for previous user"
                );
            }
            SyncOutcome::Follow { change, result, .. } => match result {
                Ok(()) => tracing::debug!(author = %change.author_id, "Follow synced"),
                Err(err) => {
                    tracing::warn!(author = %change.author_id, error = %err, "Follow sync failed");
                    self.follows.rollback(&change);
                }
            },
            SyncOutcome::FollowCheck { author_id, result, .. } => match result {
                Ok(following) => self.follows.complete_check(&author_id, following),
                Err(err) => {
                    tracing::warn!(author = %author_id, error = %err, "Follow lookup failed");
                    self.follows.fail_check(&author_id);
                }
            },
            SyncOutcome::History { item_id, result } => {
                if let Err(err) = result {
                    tracing::warn!(item = %item_id, error = %err, "History write failed");
                }
            }
            SyncOutcome::ViewIncrement { item_id, result } => {
                if let Err(err) = result {
                    tracing::warn!(item = %item_id, error = %err, "View increment failed");
                }
            }
        }
    }

    fn is_current_user(&self, user_id: &UserId) -> bool {
        self.engagement.user().user_id.as_ref() == Some(user_id)
    }

    /// Take pending UI notifications
    pub fn drain_events(&mut self) -> Vec<FeedEvent> {
        std::mem::take(&mut self.events)
    }

    // ============== Queries ==============

    pub fn config(&self) -> &ClipsConfig {
        &self.config
    }

    pub fn store(&self) -> &FeedDataStore {
        &self.store
    }

    pub fn active_index(&self) -> usize {
        self.viewport.active_index()
    }

    pub fn active_item(&self) -> Option<&FeedItem> {
        self.store.get_at(self.viewport.active_index())
    }

    pub fn playback(&self) -> &PlaybackResourceManager<M> {
        &self.playback
    }

    pub fn gestures(&self) -> &GestureRecognizer {
        &self.gestures
    }

    pub fn follows(&self) -> &FollowState {
        &self.follows
    }

    pub fn user(&self) -> &UserContext {
        self.engagement.user()
    }

    fn active_id(&self) -> Option<ItemId> {
        self.store.id_at(self.viewport.active_index()).cloned()
    }

    fn item_id_at(&self, index: usize) -> Result<ItemId> {
        self.store
            .id_at(index)
            .cloned()
            .ok_or(FeedError::IndexOutOfRange {
                index,
                len: self.store.len(),
            })
    }

    fn item_at(&self, index: usize) -> Result<&FeedItem> {
        self.store.get_at(index).ok_or(FeedError::IndexOutOfRange {
            index,
            len: self.store.len(),
        })
    }
}
