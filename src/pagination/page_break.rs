//! # Page Break Planning
//!
//! The pure half of pagination: given the rendered heights of the surface's
//! top-level blocks, decide where page spacers go and how tall each one is.
//! Nothing here touches the tree, which keeps the rules easy to test.

/// Rendered heights within this distance of the page budget still count as
/// fitting. Absorbs subpixel rounding from the renderer.
pub const FIT_TOLERANCE: f64 = 2.0;

/// A spacer to insert before one of the top-level blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct PageBreak {
    /// Index of the block the spacer goes in front of.
    pub before: usize,
    /// Unused remainder of the closing page plus the inter-page gap.
    pub spacer_height: f64,
}

/// What to do with one block while walking the document.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakDecision {
    /// Zero-height block: contributes nothing, never triggers a break.
    Skip,
    /// Place the block on the current page (it fits).
    Place,
    /// Close the current page with a spacer, then place the block on the
    /// next one.
    BreakBefore { remaining: f64 },
}

/// Decide how to place a block of `height` when `used` of the page's
/// `content_per_page` is already taken.
pub fn decide_break(used: f64, height: f64, content_per_page: f64) -> BreakDecision {
    if height <= 0.0 {
        return BreakDecision::Skip;
    }
    // Never break before anything has been placed on the page.
    if used > 0.0 && used + height > content_per_page {
        return BreakDecision::BreakBefore {
            remaining: content_per_page - used,
        };
    }
    BreakDecision::Place
}

/// Plan every page break for blocks of the given heights.
///
/// Blocks are never split. A block taller than a whole page overflows its
/// page; the walk then carries on from `used % content_per_page`, an
/// estimate of where the overflow left off.
pub fn plan_page_breaks(
    block_heights: &[f64],
    content_per_page: f64,
    page_gap: f64,
) -> Vec<PageBreak> {
    if content_per_page <= 0.0 {
        return Vec::new();
    }
    let total: f64 = block_heights.iter().filter(|h| **h > 0.0).sum();
    if total <= content_per_page + FIT_TOLERANCE {
        return Vec::new();
    }

    let mut breaks = Vec::new();
    let mut used = 0.0;
    for (index, &height) in block_heights.iter().enumerate() {
        match decide_break(used, height, content_per_page) {
            BreakDecision::Skip => continue,
            BreakDecision::Place => {}
            BreakDecision::BreakBefore { remaining } => {
                breaks.push(PageBreak {
                    before: index,
                    spacer_height: remaining + page_gap,
                });
                used = 0.0;
            }
        }
        used += height;
        if used > content_per_page {
            used %= content_per_page;
        }
    }
    breaks
}
