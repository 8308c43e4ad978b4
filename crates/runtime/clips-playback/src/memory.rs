//! In-memory media backend
//!
//! Simulates decoders without touching real media. Every call is appended to
//! a shared log so hosts (the CLI simulator, tests) can inspect what the
//! manager did to each session.

use crate::session::{MediaBackend, MediaSession};
use crate::{PlaybackError, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One call made against a simulated decoder
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCall {
    Open { handle: u64, uri: String },
    Play { handle: u64 },
    Pause { handle: u64 },
    SetRate { handle: u64, rate: f32 },
    SetMuted { handle: u64, muted: bool },
    Seek { handle: u64, position: Duration },
    Release { handle: u64 },
}

impl MediaCall {
    pub fn handle(&self) -> u64 {
        match self {
            MediaCall::Open { handle, .. }
            | MediaCall::Play { handle }
            | MediaCall::Pause { handle }
            | MediaCall::SetRate { handle, .. }
            | MediaCall::SetMuted { handle, .. }
            | MediaCall::Seek { handle, .. }
            | MediaCall::Release { handle } => *handle,
        }
    }
}

type CallLog = Arc<Mutex<Vec<MediaCall>>>;

/// Simulated decoder factory. Clones share the call log.
#[derive(Debug, Clone, Default)]
pub struct MemoryMediaBackend {
    log: CallLog,
    broken: HashSet<String>,
    next_handle: u64,
    start_position: Duration,
}

impl MemoryMediaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `open` fail for this URI
    pub fn fail_uri(mut self, uri: impl Into<String>) -> Self {
        self.broken.insert(uri.into());
        self
    }

    /// Position new sessions report before any seek
    pub fn with_start_position(mut self, position: Duration) -> Self {
        self.start_position = position;
        self
    }

    /// Snapshot of every call so far
    pub fn calls(&self) -> Vec<MediaCall> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Calls made against a single handle
    pub fn calls_for(&self, handle: u64) -> Vec<MediaCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.handle() == handle)
            .collect()
    }

    /// Handle numbers opened for `uri`, oldest first
    pub fn handles_for(&self, uri: &str) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MediaCall::Open { handle, uri: u } if u == uri => Some(handle),
                _ => None,
            })
            .collect()
    }

    /// Number of decoders opened so far
    pub fn open_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MediaCall::Open { .. }))
            .count()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.clear();
        }
    }
}

impl MediaBackend for MemoryMediaBackend {
    fn open(&mut self, uri: &str) -> Result<Box<dyn MediaSession>> {
        if self.broken.contains(uri) {
            return Err(PlaybackError::Decode {
                uri: uri.to_string(),
                reason: "simulated decoder failure".to_string(),
            });
        }

        self.next_handle += 1;
        let handle = self.next_handle;
        record(
            &self.log,
            MediaCall::Open {
                handle,
                uri: uri.to_string(),
            },
        );

        Ok(Box::new(MemorySession {
            handle,
            log: Arc::clone(&self.log),
            position: self.start_position,
        }))
    }
}

struct MemorySession {
    handle: u64,
    log: CallLog,
    position: Duration,
}

fn record(log: &CallLog, call: MediaCall) {
    if let Ok(mut log) = log.lock() {
        log.push(call);
    }
}

impl MediaSession for MemorySession {
    fn play(&mut self) {
        record(&self.log, MediaCall::Play { handle: self.handle });
    }

    fn pause(&mut self) {
        record(&self.log, MediaCall::Pause { handle: self.handle });
    }

    fn set_rate(&mut self, rate: f32) {
        record(
            &self.log,
            MediaCall::SetRate {
                handle: self.handle,
                rate,
            },
        );
    }

    fn set_muted(&mut self, muted: bool) {
        record(
            &self.log,
            MediaCall::SetMuted {
                handle: self.handle,
                muted,
            },
        );
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn seek(&mut self, position: Duration) {
        self.position = position;
        record(
            &self.log,
            MediaCall::Seek {
                handle: self.handle,
                position,
            },
        );
    }

    fn release(&mut self) {
        record(&self.log, MediaCall::Release { handle: self.handle });
    }
}
