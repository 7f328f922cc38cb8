//! # Scroll Page Tracker
//!
//! Derives the current page from the scroll offset. Scroll events arrive in
//! bursts, so each one replaces the pending recomputation and only the last
//! offset of a burst is evaluated, [`SCROLL_DEBOUNCE`] after it.
//!
//! The page stride is [`LayoutConfig::page_for_offset`], the same geometry
//! pagination uses, so the current page and the page count can never
//! disagree about where a page ends.
//!
//! The listener is passive: scrolling is never cancelled.

use std::time::Duration;

use tracing::debug;

use crate::config::LayoutConfig;
use crate::scheduler::{Deferral, Scheduler, TaskHandle};

pub const SCROLL_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
pub struct ScrollTracker {
    pending: Option<TaskHandle>,
    scroll_top: f64,
}

impl ScrollTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scroll event and (re)arm the debounce with `task`.
    pub fn on_scroll<T>(&mut self, scheduler: &mut Scheduler<T>, scroll_top: f64, task: T) {
        self.scroll_top = scroll_top;
        let handle =
            scheduler.reschedule(self.pending, Deferral::After(SCROLL_DEBOUNCE), task);
        self.pending = Some(handle);
    }

    /// The debounce for `handle` fired. Returns the page for the last
    /// recorded offset, or `None` if `handle` was superseded.
    pub fn settle(
        &mut self,
        handle: TaskHandle,
        config: &LayoutConfig,
        total_pages: usize,
    ) -> Option<usize> {
        if self.pending != Some(handle) {
            return None;
        }
        self.pending = None;
        let page = self.current_page(config, total_pages);
        debug!(scroll_top = self.scroll_top, page, total_pages, "scroll settled");
        Some(page)
    }

    /// Page for the last recorded offset, without waiting for the debounce.
    pub fn current_page(&self, config: &LayoutConfig, total_pages: usize) -> usize {
        config.page_for_offset(self.scroll_top, total_pages)
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Forget the pending debounce. The caller cancels the task itself.
    pub fn reset(&mut self) -> Option<TaskHandle> {
        self.pending.take()
    }
}
