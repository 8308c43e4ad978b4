//! Playback resource manager
//!
//! Arena of decoder sessions keyed by item id. A session may exist only for
//! an item inside the load window while the feed screen is focused.

use crate::session::{MediaBackend, PlaybackSession, SessionId};
use crate::PlaybackError;
use clips_core::{FeedItem, ItemId};
use std::collections::{HashMap, HashSet};

/// Lifecycle notifications for the layer above
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// First live session of the active item in this window entry
    ViewRecorded(ItemId),
    /// The media could not be opened; render the placeholder
    DecodeFailed { item_id: ItemId, reason: String },
}

/// Decides which items may hold a decoder and owns those decoders
pub struct PlaybackResourceManager<B: MediaBackend> {
    /// Decoder factory
    backend: B,

    /// Live sessions, at most one per item
    sessions: HashMap<ItemId, PlaybackSession>,

    /// Items currently eligible for a session
    window: HashSet<ItemId>,

    /// The item the user is looking at, if any
    active: Option<ItemId>,

    /// Screen focus; nothing decodes while blurred
    focused: bool,

    /// Items whose view was reported in their current window entry
    viewed: HashSet<ItemId>,

    /// Items that failed to decode in their current window entry
    failed: HashSet<ItemId>,

    /// Pending notifications
    events: Vec<PlaybackEvent>,
}

impl<B: MediaBackend> PlaybackResourceManager<B> {
    /// Create a focused manager with an empty window
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            sessions: HashMap::new(),
            window: HashSet::new(),
            active: None,
            focused: true,
            viewed: HashSet::new(),
            failed: HashSet::new(),
            events: Vec::new(),
        }
    }

    // ============== Window & Focus ==============

    /// Replace the load window. Items that left it lose their session and
    /// their per-entry bookkeeping. Returns the items that left.
    pub fn set_window<I>(&mut self, members: I, active: Option<ItemId>) -> Vec<ItemId>
    where
        I: IntoIterator<Item = ItemId>,
    {
        let next: HashSet<ItemId> = members.into_iter().collect();
        let left: Vec<ItemId> = self.window.difference(&next).cloned().collect();

        for item_id in &left {
            self.release(item_id);
            self.viewed.remove(item_id);
            self.failed.remove(item_id);
        }

        // Sessions outside the window can only remain after an explicit
        // acquire raced a window change; drop them too.
        let strays: Vec<ItemId> = self
            .sessions
            .keys()
            .filter(|id| !next.contains(*id))
            .cloned()
            .collect();
        for item_id in &strays {
            self.release(item_id);
        }

        self.window = next;
        self.active = active.filter(|id| self.window.contains(id));
        left
    }

    /// Forget the whole window (feed refresh or close)
    pub fn clear_window(&mut self) {
        self.set_window(std::iter::empty(), None);
    }

    /// Focus changes. Losing focus pauses and frees every session but keeps
    /// window membership, so regaining focus does not count as a new view.
    pub fn set_focused(&mut self, focused: bool) {
        if self.focused == focused {
            return;
        }
        self.focused = focused;
        if !focused {
            tracing::debug!(sessions = self.sessions.len(), "Screen blurred, releasing sessions");
            self.release_all();
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn in_window(&self, item_id: &ItemId) -> bool {
        self.window.contains(item_id)
    }

    pub fn active(&self) -> Option<&ItemId> {
        self.active.as_ref()
    }

    // ============== Acquire / Release ==============

    /// Get or create the session for `item`.
    ///
    /// Returns `None` when the caller must render a placeholder: outside the
    /// window, screen blurred, no media, or media that already failed to
    /// decode during this window entry.
    pub fn acquire(&mut self, item: &FeedItem) -> Option<SessionId> {
        if !self.focused || !self.window.contains(&item.id) {
            return None;
        }
        if !item.is_playable() || self.failed.contains(&item.id) {
            return None;
        }

        let id = match self.sessions.get(&item.id) {
            Some(session) => session.id(),
            None => self.open(item)?,
        };

        if self.active.as_ref() == Some(&item.id) && self.viewed.insert(item.id.clone()) {
            self.events.push(PlaybackEvent::ViewRecorded(item.id.clone()));
        }

        Some(id)
    }

    fn open(&mut self, item: &FeedItem) -> Option<SessionId> {
        let uri = item.media_uri.clone()?;

        match self.backend.open(&uri) {
            Ok(handle) => {
                let session = PlaybackSession::new(item.id.clone(), uri, handle);
                let id = session.id();
                tracing::debug!(item = %item.id, session = %id, "Opened playback session");
                self.sessions.insert(item.id.clone(), session);
                Some(id)
            }
            Err(err) => {
                tracing::warn!(item = %item.id, uri = %uri, error = %err, "Media failed to decode");
                self.failed.insert(item.id.clone());
                let reason = match err {
                    PlaybackError::Decode { reason, .. } => reason,
                    other => other.to_string(),
                };
                self.events.push(PlaybackEvent::DecodeFailed {
                    item_id: item.id.clone(),
                    reason,
                });
                None
            }
        }
    }

    /// Pause and drop the session for `item_id`. No-op when none exists.
    pub fn release(&mut self, item_id: &ItemId) {
        if let Some(session) = self.sessions.remove(item_id) {
            tracing::debug!(item = %item_id, session = %session.id(), "Released playback session");
            session.shutdown();
        }
    }

    /// Release every live session
    pub fn release_all(&mut self) {
        let ids: Vec<ItemId> = self.sessions.keys().cloned().collect();
        for item_id in &ids {
            self.release(item_id);
        }
    }

    /// Pause every live session without releasing it
    pub fn pause_all(&mut self) {
        for session in self.sessions.values_mut() {
            session.pause();
        }
    }

    // ============== Queries ==============

    pub fn session(&self, item_id: &ItemId) -> Option<&PlaybackSession> {
        self.sessions.get(item_id)
    }

    pub fn session_mut(&mut self, item_id: &ItemId) -> Option<&mut PlaybackSession> {
        self.sessions.get_mut(item_id)
    }

    pub fn live_count(&self) -> usize {
        self.sessions.len()
    }

    /// Items currently holding a session
    pub fn live_items(&self) -> Vec<ItemId> {
        self.sessions.keys().cloned().collect()
    }

    pub fn has_failed(&self, item_id: &ItemId) -> bool {
        self.failed.contains(item_id)
    }

    /// Take pending notifications
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
