//! Feed viewport controller
//!
//! Tracks the active index of a vertically paged list whose pages are one
//! item extent tall, and derives the load window from it.

use clips_core::{PlaybackConfig, ViewportConfig};
use std::ops::RangeInclusive;

/// Position bookkeeping for the snap-scrolling feed surface
#[derive(Debug, Clone)]
pub struct FeedViewportController {
    config: ViewportConfig,
    window_before: usize,
    window_after: usize,

    /// Item the user is looking at
    active_index: usize,

    /// Number of items in the feed
    item_count: usize,

    /// Measured height of one page; 0 until the first layout
    extent: f32,

    /// Last reported scroll offset
    offset: f32,
}

impl FeedViewportController {
    pub fn new(config: ViewportConfig, playback: &PlaybackConfig) -> Self {
        Self {
            config,
            window_before: playback.window_before,
            window_after: playback.window_after,
            active_index: 0,
            item_count: 0,
            extent: 0.0,
            offset: 0.0,
        }
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn extent(&self) -> f32 {
        self.extent
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Start over with `item_count` items, first item active (refresh)
    pub fn reset(&mut self, item_count: usize) {
        self.item_count = item_count;
        self.active_index = 0;
        self.offset = 0.0;
    }

    /// Move the active index. Returns the previous index when it changed.
    pub fn set_active(&mut self, index: usize) -> Option<usize> {
        if self.item_count == 0 || index >= self.item_count || index == self.active_index {
            return None;
        }
        let previous = self.active_index;
        self.active_index = index;
        tracing::debug!(from = previous, to = index, "Active item changed");
        Some(previous)
    }

    /// Visibility report from the list surface: `(index, visible fraction)`.
    ///
    /// The first item in scroll order at or above the threshold becomes
    /// active. Returns the new active index when it changed.
    pub fn on_visibility_changed(&mut self, visible: &[(usize, f32)]) -> Option<usize> {
        let threshold = self.config.active_visibility_threshold;
        let candidate = visible
            .iter()
            .filter(|(index, fraction)| *index < self.item_count && *fraction >= threshold)
            .map(|(index, _)| *index)
            .min()?;

        self.set_active(candidate).map(|_| candidate)
    }

    /// Raw scroll offset from the surface
    pub fn on_scroll(&mut self, offset: f32) -> Option<usize> {
        self.offset = offset.max(0.0);
        let visible = self.visibility_at(self.offset);
        self.on_visibility_changed(&visible)
    }

    /// Visible fraction of each item overlapping the viewport at `offset`
    pub fn visibility_at(&self, offset: f32) -> Vec<(usize, f32)> {
        if self.extent <= 0.0 || self.item_count == 0 {
            return Vec::new();
        }

        let first = (offset / self.extent).floor().max(0.0) as usize;
        let last = ((offset + self.extent) / self.extent).ceil() as usize;

        (first..=last.min(self.item_count - 1))
            .filter_map(|index| {
                let top = index as f32 * self.extent;
                let bottom = top + self.extent;
                let overlap = bottom.min(offset + self.extent) - top.max(offset);
                if overlap > 0.0 {
                    Some((index, overlap / self.extent))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Re-measure the page extent (layout pass or rotation). Returns the
    /// offset that keeps the active item aligned under the new extent.
    pub fn on_layout(&mut self, extent: f32) -> f32 {
        if extent > 0.0 && extent != self.extent {
            tracing::debug!(old = self.extent, new = extent, "Item extent re-measured");
            self.extent = extent;
        }
        self.offset = self.offset_for(self.active_index);
        self.offset
    }

    /// Scroll offset at which `index` fills the viewport
    pub fn offset_for(&self, index: usize) -> f32 {
        index as f32 * self.extent
    }

    /// Nearest page for a released scroll at `offset`
    pub fn snap_target(&self, offset: f32) -> (usize, f32) {
        if self.extent <= 0.0 || self.item_count == 0 {
            return (0, 0.0);
        }
        let index = ((offset.max(0.0) / self.extent).round() as usize).min(self.item_count - 1);
        (index, self.offset_for(index))
    }

    /// Indices allowed to hold a playback session
    pub fn window(&self) -> Option<RangeInclusive<usize>> {
        if self.item_count == 0 {
            return None;
        }
        let start = self.active_index.saturating_sub(self.window_before);
        let end = (self.active_index + self.window_after).min(self.item_count - 1);
        Some(start..=end)
    }
}
