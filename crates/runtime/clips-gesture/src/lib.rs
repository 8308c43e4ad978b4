//! # Clips Gesture
//!
//! Gesture state machine for the active clip's surface.
//!
//! ```text
//!            tap                      tap (same zone, < window)
//!   Idle ─────────────> AwaitingSecondTap ─────────────────────> Idle + LikeOn
//!    │ ▲                      │
//!    │ │                      └── window expires ──> Idle + toggle play/pause
//!    │ │ release
//!    │ ├──────── FastForwarding   (long press, top half: rate 2x)
//!    │ └──────── Rewinding        (long press, bottom half: step back every tick)
//!    └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The recognizer is pure: the host feeds it events and timestamps and it
//! answers with [`GestureAction`]s for the engine to apply.

pub mod recognizer;

pub use recognizer::{GestureAction, GestureEvent, GestureRecognizer, GestureState, TapZone};
