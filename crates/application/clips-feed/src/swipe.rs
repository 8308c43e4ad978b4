//! Horizontal swipe-to-profile detection
//!
//! A drag is classified once it moves past the capture slop: horizontal if
//! |dx| > |dy|, vertical otherwise. Vertical drags belong to the snap scroll
//! and are never captured here.

use clips_core::ViewportConfig;
use serde::{Deserialize, Serialize};

/// Classification of the drag in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragAxis {
    Undecided,
    Horizontal,
    Vertical,
}

/// Result of a finished drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
    None,
    NavigateToProfile,
}

/// Tracks one drag at a time
#[derive(Debug, Clone)]
pub struct SwipeDetector {
    config: ViewportConfig,
    axis: Option<DragAxis>,
}

impl SwipeDetector {
    pub fn new(config: ViewportConfig) -> Self {
        Self { config, axis: None }
    }

    pub fn axis(&self) -> Option<DragAxis> {
        self.axis
    }

    pub fn begin(&mut self) {
        self.axis = Some(DragAxis::Undecided);
    }

    /// Cumulative displacement since `begin`. Returns whether the drag is
    /// captured as horizontal (the host must then suppress scrolling).
    pub fn update(&mut self, dx: f32, dy: f32) -> bool {
        let axis = match self.axis {
            Some(DragAxis::Undecided) => {
                let slop = self.config.swipe_capture_slop;
                if dx.abs() <= slop && dy.abs() <= slop {
                    DragAxis::Undecided
                } else if dx.abs() > dy.abs() {
                    DragAxis::Horizontal
                } else {
                    DragAxis::Vertical
                }
            }
            Some(decided) => decided,
            None => return false,
        };
        self.axis = Some(axis);
        axis == DragAxis::Horizontal
    }

    /// Finish the drag with its final displacement
    pub fn end(&mut self, dx: f32, dy: f32) -> SwipeOutcome {
        if self.axis == Some(DragAxis::Undecided) {
            self.update(dx, dy);
        }
        let axis = self.axis.take();

        if axis == Some(DragAxis::Horizontal) && dx < -self.config.profile_swipe_threshold {
            tracing::debug!(dx, "Swipe to profile");
            SwipeOutcome::NavigateToProfile
        } else {
            SwipeOutcome::None
        }
    }

    /// Abandon the drag (item deactivated, screen blurred)
    pub fn cancel(&mut self) {
        self.axis = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> SwipeDetector {
        SwipeDetector::new(ViewportConfig::default())
    }

    #[test]
    fn test_left_swipe_past_threshold() {
        let mut d = detector();
        d.begin();
        assert!(!d.update(-5.0, 1.0));
        assert!(d.update(-30.0, 4.0));
        assert_eq!(d.end(-120.0, 10.0), SwipeOutcome::NavigateToProfile);
        assert_eq!(d.axis(), None);
    }

    #[test]
    fn test_short_swipe_does_nothing() {
        let mut d = detector();
        d.begin();
        d.update(-40.0, 0.0);
        assert_eq!(d.end(-60.0, 0.0), SwipeOutcome::None);
    }

    #[test]
    fn test_swipe_must_exceed_threshold() {
        let mut d = detector();
        d.begin();
        d.update(-40.0, 0.0);
        assert_eq!(d.end(-80.0, 0.0), SwipeOutcome::None);

        d.begin();
        d.update(-40.0, 0.0);
        assert_eq!(d.end(-80.5, 0.0), SwipeOutcome::NavigateToProfile);
    }

    #[test]
    fn test_right_swipe_does_nothing() {
        let mut d = detector();
        d.begin();
        d.update(40.0, 0.0);
        assert_eq!(d.end(200.0, 0.0), SwipeOutcome::None);
    }

    #[test]
    fn test_vertical_drag_never_captured() {
        let mut d = detector();
        d.begin();
        assert!(!d.update(-8.0, -40.0));
        // Once vertical, stays vertical even if it drifts sideways
        assert!(!d.update(-150.0, -60.0));
        assert_eq!(d.end(-150.0, -60.0), SwipeOutcome::None);
    }

    #[test]
    fn test_fast_flick_classified_on_end() {
        let mut d = detector();
        d.begin();
        assert_eq!(d.end(-100.0, 5.0), SwipeOutcome::NavigateToProfile);
    }
}
