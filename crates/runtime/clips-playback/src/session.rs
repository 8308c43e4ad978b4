//! Decoder traits and the session wrapper the manager hands out

use crate::Result;
use clips_core::ItemId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Identity of one live decoder session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform decoder handle bound to one media URI
pub trait MediaSession: Send {
    fn play(&mut self);

    fn pause(&mut self);

    fn set_rate(&mut self, rate: f32);

    fn set_muted(&mut self, muted: bool);

    /// Current playback position
    fn position(&self) -> Duration;

    fn seek(&mut self, position: Duration);

    /// Free the decoder. Called exactly once, after `pause`.
    fn release(&mut self) {}
}

/// Factory for decoder handles
pub trait MediaBackend: Send {
    /// Open a decoder for `uri`. Errors mean the media cannot be played.
    fn open(&mut self, uri: &str) -> Result<Box<dyn MediaSession>>;
}

/// A live decoder owned by one feed item's window slot
pub struct PlaybackSession {
    id: SessionId,
    item_id: ItemId,
    uri: String,
    handle: Box<dyn MediaSession>,
    playing: bool,
    rate: f32,
    muted: bool,
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("id", &self.id)
            .field("item_id", &self.item_id)
            .field("uri", &self.uri)
            .field("playing", &self.playing)
            .field("rate", &self.rate)
            .field("muted", &self.muted)
            .finish()
    }
}

impl PlaybackSession {
    pub(crate) fn new(item_id: ItemId, uri: String, handle: Box<dyn MediaSession>) -> Self {
        Self {
            id: SessionId::new(),
            item_id,
            uri,
            handle,
            playing: false,
            rate: 1.0,
            muted: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn play(&mut self) {
        if !self.playing {
            self.handle.play();
            self.playing = true;
        }
    }

    pub fn pause(&mut self) {
        if self.playing {
            self.handle.pause();
            self.playing = false;
        }
    }

    pub fn set_rate(&mut self, rate: f32) {
        if self.rate != rate {
            self.handle.set_rate(rate);
            self.rate = rate;
        }
    }

    /// Audio only; never touches play state or rate
    pub fn set_muted(&mut self, muted: bool) {
        if self.muted != muted {
            self.handle.set_muted(muted);
            self.muted = muted;
        }
    }

    pub fn position(&self) -> Duration {
        self.handle.position()
    }

    /// Step backwards, clamped at the start of the media
    pub fn seek_backward(&mut self, step: Duration) {
        let target = self.handle.position().saturating_sub(step);
        self.handle.seek(target);
    }

    /// Pause and free the decoder
    pub(crate) fn shutdown(mut self) {
        self.handle.pause();
        self.playing = false;
        self.handle.release();
    }
}
