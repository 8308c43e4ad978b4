//! Tagged-state gesture recognizer
//!
//! One dispatch function (`handle`) plus `tick` for timer expiry. Time is
//! always passed in, so timer callbacks and new events can never race.

use clips_core::GestureConfig;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Which half of the surface a press landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapZone {
    Top,
    Bottom,
}

impl TapZone {
    /// Classify a press at `y` on a surface `height` tall
    pub fn from_position(y: f32, height: f32) -> Self {
        if y < height / 2.0 {
            TapZone::Top
        } else {
            TapZone::Bottom
        }
    }
}

/// Raw gesture input from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GestureEvent {
    /// A completed short press
    Tap { zone: TapZone },
    /// A press held past the platform's long-press delay
    LongPressStart { zone: TapZone },
    /// The held press was lifted
    LongPressEnd,
}

/// What the engine should do in response
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    /// Play (`true`) or pause (`false`) the active session
    SetPlaying(bool),
    /// Double tap: turn like on (never off)
    LikeOn,
    /// Transport rate override
    SetRate(f32),
    /// Step the active session back, clamped at 0
    SeekBackward(Duration),
}

/// Recognizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    AwaitingSecondTap { since: Instant, zone: TapZone },
    FastForwarding,
    Rewinding { next_tick: Instant },
}

/// Per-item gesture state machine
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    config: GestureConfig,
    state: GestureState,
    playing: bool,
    rate: f32,
}

impl GestureRecognizer {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: GestureState::Idle,
            playing: true,
            rate: 1.0,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Whether the active clip should be playing
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current transport rate override
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Single dispatch for every gesture event
    pub fn handle(&mut self, event: GestureEvent, now: Instant) -> Vec<GestureAction> {
        let mut actions = Vec::new();
        self.expire_pending_tap(now, &mut actions);

        match event {
            GestureEvent::Tap { zone } => self.on_tap(zone, now, &mut actions),
            GestureEvent::LongPressStart { zone } => self.on_long_press(zone, now, &mut actions),
            GestureEvent::LongPressEnd => self.on_release(&mut actions),
        }

        actions
    }

    /// Advance timers: resolve an expired pending tap and emit due rewind steps
    pub fn tick(&mut self, now: Instant) -> Vec<GestureAction> {
        let mut actions = Vec::new();
        self.expire_pending_tap(now, &mut actions);

        if let GestureState::Rewinding { mut next_tick } = self.state {
            let step = self.config.rewind_step();
            while next_tick <= now {
                actions.push(GestureAction::SeekBackward(step));
                next_tick += self.config.rewind_tick();
            }
            self.state = GestureState::Rewinding { next_tick };
        }

        actions
    }

    /// When the host should call `tick` next
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            GestureState::AwaitingSecondTap { since, .. } => {
                Some(since + self.config.double_tap_window())
            }
            GestureState::Rewinding { next_tick } => Some(next_tick),
            _ => None,
        }
    }

    /// Abort any scrub and pending tap (release, blur, deactivation).
    /// Reverts the rate override and clears the rewind tick.
    pub fn cancel(&mut self) -> Vec<GestureAction> {
        let mut actions = Vec::new();
        if self.state != GestureState::Idle {
            tracing::debug!(state = ?self.state, "Gesture cancelled");
        }
        self.state = GestureState::Idle;
        if self.rate != 1.0 {
            self.rate = 1.0;
            actions.push(GestureAction::SetRate(1.0));
        }
        actions
    }

    /// Fresh state for a newly focused or newly active clip
    pub fn reset(&mut self) -> Vec<GestureAction> {
        let actions = self.cancel();
        self.playing = true;
        actions
    }

    // ============== Transitions ==============

    fn expire_pending_tap(&mut self, now: Instant, actions: &mut Vec<GestureAction>) {
        if let GestureState::AwaitingSecondTap { since, .. } = self.state {
            if now.saturating_duration_since(since) >= self.config.double_tap_window() {
                self.state = GestureState::Idle;
                self.resolve_single_tap(actions);
            }
        }
    }

    fn resolve_single_tap(&mut self, actions: &mut Vec<GestureAction>) {
        self.playing = !self.playing;
        tracing::debug!(playing = self.playing, "Single tap");
        actions.push(GestureAction::SetPlaying(self.playing));
    }

    fn on_tap(&mut self, zone: TapZone, now: Instant, actions: &mut Vec<GestureAction>) {
        match self.state {
            GestureState::Idle => {
                self.state = GestureState::AwaitingSecondTap { since: now, zone };
            }
            GestureState::AwaitingSecondTap { zone: first, .. } if first == zone => {
                tracing::debug!(?zone, "Double tap");
                self.state = GestureState::Idle;
                actions.push(GestureAction::LikeOn);
            }
            GestureState::AwaitingSecondTap { .. } => {
                // Different zone: the first press stands alone
                self.resolve_single_tap(actions);
                self.state = GestureState::AwaitingSecondTap { since: now, zone };
            }
            GestureState::FastForwarding | GestureState::Rewinding { .. } => {
                tracing::debug!(state = ?self.state, "Tap ignored during scrub");
            }
        }
    }

    fn on_long_press(&mut self, zone: TapZone, now: Instant, actions: &mut Vec<GestureAction>) {
        match self.state {
            GestureState::FastForwarding | GestureState::Rewinding { .. } => return,
            // A hold right after a tap discards the tap
            GestureState::AwaitingSecondTap { .. } | GestureState::Idle => {}
        }

        match zone {
            TapZone::Top => {
                self.state = GestureState::FastForwarding;
                self.rate = self.config.fast_forward_rate;
                actions.push(GestureAction::SetRate(self.rate));
            }
            TapZone::Bottom => {
                self.state = GestureState::Rewinding {
                    next_tick: now + self.config.rewind_tick(),
                };
            }
        }
        tracing::debug!(state = ?self.state, "Scrub started");
    }

    fn on_release(&mut self, actions: &mut Vec<GestureAction>) {
        match self.state {
            GestureState::FastForwarding | GestureState::Rewinding { .. } => {
                actions.extend(self.cancel());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn recognizer() -> GestureRecognizer {
        GestureRecognizer::new(GestureConfig::default())
    }

    const TOP: GestureEvent = GestureEvent::Tap { zone: TapZone::Top };

    #[test]
    fn test_double_tap_likes_without_toggle() {
        let mut g = recognizer();
        let t0 = Instant::now();

        let mut actions = g.handle(TOP, t0);
        actions.extend(g.handle(TOP, t0 + ms(100)));
        actions.extend(g.tick(t0 + ms(1000)));

        assert_eq!(actions, vec![GestureAction::LikeOn]);
        assert!(g.is_playing());
        assert_eq!(g.state(), GestureState::Idle);
    }

    #[test]
    fn test_single_tap_toggles_after_silence() {
        let mut g = recognizer();
        let t0 = Instant::now();

        let mut actions = g.handle(TOP, t0);
        assert!(actions.is_empty());
        actions.extend(g.tick(t0 + ms(400)));

        assert_eq!(actions, vec![GestureAction::SetPlaying(false)]);
        assert!(!g.is_playing());

        // And again resumes
        g.handle(TOP, t0 + ms(1000));
        assert_eq!(g.tick(t0 + ms(1400)), vec![GestureAction::SetPlaying(true)]);
    }

    #[test]
    fn test_tap_at_boundary_is_single_tap() {
        let mut g = recognizer();
        let t0 = Instant::now();

        g.handle(TOP, t0);
        let actions = g.handle(TOP, t0 + ms(300));

        // First press resolves alone; second starts a new pending tap
        assert_eq!(actions, vec![GestureAction::SetPlaying(false)]);
        assert!(matches!(g.state(), GestureState::AwaitingSecondTap { .. }));
        assert!(!actions.contains(&GestureAction::LikeOn));
    }

    #[test]
    fn test_taps_in_different_zones_are_not_double() {
        let mut g = recognizer();
        let t0 = Instant::now();

        g.handle(TOP, t0);
        let actions = g.handle(GestureEvent::Tap { zone: TapZone::Bottom }, t0 + ms(50));
        assert_eq!(actions, vec![GestureAction::SetPlaying(false)]);
    }

    #[test]
    fn test_fast_forward_sets_and_reverts_rate() {
        let mut g = recognizer();
        let t0 = Instant::now();

        let start = g.handle(GestureEvent::LongPressStart { zone: TapZone::Top }, t0);
        assert_eq!(start, vec![GestureAction::SetRate(2.0)]);
        assert_eq!(g.state(), GestureState::FastForwarding);

        let end = g.handle(GestureEvent::LongPressEnd, t0 + ms(900));
        assert_eq!(end, vec![GestureAction::SetRate(1.0)]);
        assert_eq!(g.state(), GestureState::Idle);
    }

    #[test]
    fn test_rewind_steps_on_each_tick() {
        let mut g = recognizer();
        let t0 = Instant::now();

        g.handle(GestureEvent::LongPressStart { zone: TapZone::Bottom }, t0);
        assert!(g.tick(t0 + ms(50)).is_empty());
        assert_eq!(
            g.tick(t0 + ms(100)),
            vec![GestureAction::SeekBackward(ms(200))]
        );
        // Late tick catches up
        assert_eq!(g.tick(t0 + ms(300)).len(), 2);

        assert!(g.handle(GestureEvent::LongPressEnd, t0 + ms(320)).is_empty());
        assert!(g.tick(t0 + ms(1000)).is_empty());
        assert_eq!(g.next_deadline(), None);
    }

    #[test]
    fn test_long_press_discards_pending_tap() {
        let mut g = recognizer();
        let t0 = Instant::now();

        g.handle(TOP, t0);
        g.handle(GestureEvent::LongPressStart { zone: TapZone::Bottom }, t0 + ms(100));
        let actions = g.tick(t0 + ms(150));
        assert!(!actions.contains(&GestureAction::SetPlaying(false)));
        assert!(g.is_playing());
    }

    #[test]
    fn test_second_long_press_ignored_while_scrubbing() {
        let mut g = recognizer();
        let t0 = Instant::now();

        g.handle(GestureEvent::LongPressStart { zone: TapZone::Top }, t0);
        let actions = g.handle(GestureEvent::LongPressStart { zone: TapZone::Bottom }, t0);
        assert!(actions.is_empty());
        assert_eq!(g.state(), GestureState::FastForwarding);
    }

    #[test]
    fn test_cancel_reverts_fast_forward() {
        let mut g = recognizer();
        let t0 = Instant::now();

        g.handle(GestureEvent::LongPressStart { zone: TapZone::Top }, t0);
        assert_eq!(g.cancel(), vec![GestureAction::SetRate(1.0)]);
        assert_eq!(g.rate(), 1.0);
        assert!(g.cancel().is_empty());
    }

    #[test]
    fn test_reset_resumes_playing() {
        let mut g = recognizer();
        let t0 = Instant::now();

        g.handle(TOP, t0);
        g.tick(t0 + ms(400));
        assert!(!g.is_playing());

        g.reset();
        assert!(g.is_playing());
        assert_eq!(g.state(), GestureState::Idle);
    }

    #[test]
    fn test_zone_from_position() {
        assert_eq!(TapZone::from_position(10.0, 800.0), TapZone::Top);
        assert_eq!(TapZone::from_position(400.0, 800.0), TapZone::Bottom);
    }
}
