//! Scroll-offset mapping strategies.
//!
//! Browsers cap the height of a scrollable element, so a list whose total
//! pixel height exceeds that cap cannot use the scrollbar position as the
//! scroll offset directly. The engine therefore works in two coordinate
//! systems:
//!
//! * the *global* offset — the unbounded logical scroll position, and
//! * the *physical* offset — what the host's scroll container reports,
//!
//! related by `global = physical + sub_window_offset`. [`DirectSpace`] is
//! the identity mapping used when the list fits under the cap;
//! [`CompressedSpace`] maintains a sub-window offset and periodically
//! remaps the physical position. The two live behind one trait and are
//! selected by a capacity check, never by specializing the engine.

use crate::config::WindowConfig;

/// Where a scroll event originated. Scrollbar drags track absolute list
/// position; everything else is relative motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollSource {
    /// Wheel, touch or keyboard-driven relative scrolling.
    Relative,
    /// Pointer dragging the scrollbar thumb.
    ScrollbarDrag,
    /// `scroll_to` / `scroll_to_item` calls.
    Programmatic,
}

/// A mapping between physical and global scroll offsets.
pub trait ScrollSpace: std::fmt::Debug {
    /// Total size the host should give its scroll container.
    fn physical_size(&self) -> f64;

    /// Current delta between global and physical offsets.
    fn sub_window_offset(&self) -> f64;

    /// Global offset for a physical one.
    fn global_offset(&self, physical: f64) -> f64 {
        physical + self.sub_window_offset()
    }

    /// Choose a physical offset (adjusting the sub-window as needed) such
    /// that `global_offset(result) == global` exactly, clamped into the
    /// valid global scroll range.
    fn physical_for_global(&mut self, global: f64, viewport: f64) -> f64;

    /// React to the host having scrolled to `physical`. Returns a new
    /// physical offset when the space decided to remap (the host must move
    /// its scroll container there); `None` when the position stands.
    fn after_scroll(
        &mut self,
        physical: f64,
        viewport: f64,
        source: ScrollSource,
        is_scrolling: bool,
    ) -> Option<f64>;
}

/// Identity mapping: the list fits under the physical size ceiling.
#[derive(Debug)]
pub struct DirectSpace {
    total_size: f64,
}

impl DirectSpace {
    pub fn new(total_size: f64) -> Self {
        Self { total_size }
    }
}

impl ScrollSpace for DirectSpace {
    fn physical_size(&self) -> f64 {
        self.total_size
    }

    fn sub_window_offset(&self) -> f64 {
        0.0
    }

    fn physical_for_global(&mut self, global: f64, viewport: f64) -> f64 {
        global.clamp(0.0, (self.total_size - viewport).max(0.0))
    }

    fn after_scroll(&mut self, _: f64, _: f64, _: ScrollSource, _: bool) -> Option<f64> {
        None
    }
}

/// Large-list mapping: remaps an unbounded logical range onto a bounded
/// physical scrollbar range.
#[derive(Debug)]
pub struct CompressedSpace {
    total_size: f64,
    physical_size: f64,
    sub_window_offset: f64,
    boundary_buffer_ratio: f64,
    drift_tolerance_scrolling: f64,
    drift_tolerance_idle: f64,
}

impl CompressedSpace {
    pub fn new(total_size: f64, config: &WindowConfig) -> Self {
        Self {
            total_size,
            physical_size: config.max_physical_size.min(total_size),
            sub_window_offset: 0.0,
            boundary_buffer_ratio: config.boundary_buffer_ratio,
            drift_tolerance_scrolling: config.drift_tolerance_scrolling,
            drift_tolerance_idle: config.drift_tolerance_idle,
        }
    }

    fn physical_scroll_range(&self, viewport: f64) -> f64 {
        (self.physical_size - viewport).max(0.0)
    }

    fn global_scroll_range(&self, viewport: f64) -> f64 {
        (self.total_size - viewport).max(0.0)
    }

    fn relative_physical(&self, physical: f64, viewport: f64) -> f64 {
        let range = self.physical_scroll_range(viewport);
        if range <= 0.0 {
            0.0
        } else {
            physical / range
        }
    }

    fn relative_global(&self, global: f64, viewport: f64) -> f64 {
        let range = self.global_scroll_range(viewport);
        if range <= 0.0 {
            0.0
        } else {
            global / range
        }
    }
}

impl ScrollSpace for CompressedSpace {
    fn physical_size(&self) -> f64 {
        self.physical_size
    }

    fn sub_window_offset(&self) -> f64 {
        self.sub_window_offset
    }

    fn physical_for_global(&mut self, global: f64, viewport: f64) -> f64 {
        let global = global.clamp(0.0, self.global_scroll_range(viewport));
        let rel = self.relative_global(global, viewport);
        // Whole pixels; fractional physical offsets jitter in the host and
        // cost float exactness below.
        let physical = (rel * self.physical_scroll_range(viewport))
            .round()
            .clamp(0.0, self.physical_scroll_range(viewport));
        // The sub-window is computed as a difference so that
        // physical + sub_window == global holds exactly.
        self.sub_window_offset = global - physical;
        physical
    }

    fn after_scroll(
        &mut self,
        physical: f64,
        viewport: f64,
        source: ScrollSource,
        is_scrolling: bool,
    ) -> Option<f64> {
        if source == ScrollSource::ScrollbarDrag && is_scrolling {
            // The thumb position is an absolute statement of where in the
            // log the user wants to be; retarget the sub-window to it.
            let rel = self.relative_physical(physical, viewport).clamp(0.0, 1.0);
            let global = rel * self.global_scroll_range(viewport);
            self.sub_window_offset = global - physical;
            return None;
        }

        let global = self.global_offset(physical);
        let buffer = self.boundary_buffer_ratio * self.physical_size;
        let near_boundary = physical < buffer
            || physical > self.physical_scroll_range(viewport) - buffer;
        let drift = (self.relative_physical(physical, viewport)
            - self.relative_global(global, viewport))
        .abs();
        let tolerance = if is_scrolling {
            self.drift_tolerance_scrolling
        } else {
            self.drift_tolerance_idle
        };

        if near_boundary || drift > tolerance {
            let remapped = self.physical_for_global(global, viewport);
            tracing::trace!(
                physical,
                remapped,
                sub_window_offset = self.sub_window_offset,
                "compressed scroll space remapped"
            );
            Some(remapped)
        } else {
            None
        }
    }
}

/// Pick the mapping for the given total size: compressed when the list
/// would not fit under the ceiling, direct otherwise.
pub fn select_scroll_space(total_size: f64, config: &WindowConfig) -> Box<dyn ScrollSpace> {
    if total_size > config.max_physical_size {
        Box::new(CompressedSpace::new(total_size, config))
    } else {
        Box::new(DirectSpace::new(total_size))
    }
}
