//! # Layout Configuration
//!
//! The read-mostly snapshot of page geometry every component works from.
//! The engine never mutates it; only explicit settings changes (zoom, margin
//! edits) replace it.
//!
//! All page arithmetic lives here so the pagination engine and the scroll
//! tracker cannot drift apart: both call [`LayoutConfig::content_per_page`]
//! and [`LayoutConfig::page_break_gap`] rather than re-deriving them.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Page geometry for one render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub page_width: f64,
    pub page_height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    /// Visual zoom, 100 = unscaled.
    pub zoom_percent: f64,
    /// Visible gap between two simulated pages.
    pub inter_page_gap: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let (page_width, page_height) = PageSize::A4.dimensions();
        Self {
            page_width,
            page_height,
            margin_top: 40.0,
            margin_bottom: 40.0,
            margin_left: 40.0,
            margin_right: 40.0,
            zoom_percent: 100.0,
            inter_page_gap: 20.0,
        }
    }
}

impl LayoutConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_page_size(mut self, size: PageSize) -> Self {
        let (width, height) = size.dimensions();
        self.page_width = width;
        self.page_height = height;
        self
    }

    pub fn with_margins(mut self, top: f64, bottom: f64) -> Self {
        self.margin_top = top;
        self.margin_bottom = bottom;
        self
    }

    pub fn with_zoom(mut self, zoom_percent: f64) -> Self {
        self.zoom_percent = zoom_percent;
        self
    }

    /// Vertical budget for content on one page. May be zero or negative when
    /// the margins are misconfigured; callers treat that as single-page.
    pub fn content_per_page(&self) -> f64 {
        self.page_height - self.margin_top - self.margin_bottom
    }

    /// Horizontal budget for content, never negative.
    pub fn content_width(&self) -> f64 {
        (self.page_width - self.margin_left - self.margin_right).max(0.0)
    }

    /// Extra space a page spacer adds beyond the unused remainder of its page:
    /// the bottom margin of the page it closes, the visible gap, and the top
    /// margin of the page it opens.
    pub fn page_break_gap(&self) -> f64 {
        self.margin_bottom + self.inter_page_gap + self.margin_top
    }

    /// Unscaled distance from the top of one page's content to the next.
    pub fn page_visual_height(&self) -> f64 {
        self.content_per_page() + self.page_break_gap()
    }

    /// Zoom as a multiplier. Non-positive or non-finite zoom renders unscaled.
    pub fn zoom_factor(&self) -> f64 {
        let factor = self.zoom_percent / 100.0;
        if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            1.0
        }
    }

    /// The 1-based page visible at `scroll_top` (viewport pixels), clamped to
    /// `[1, total_pages]`.
    pub fn page_for_offset(&self, scroll_top: f64, total_pages: usize) -> usize {
        let total = total_pages.max(1);
        let stride = self.page_visual_height() * self.zoom_factor();
        if stride.is_nan() || stride <= 0.0 || !scroll_top.is_finite() || scroll_top <= 0.0 {
            return 1;
        }
        let page = (scroll_top / stride).floor() as usize + 1;
        page.clamp(1, total)
    }
}

/// Standard page sizes in layout pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height).
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.0, 842.0),
            PageSize::A5 => (420.0, 595.0),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}
