//! # Pagination Engine
//!
//! Keeps one continuous editable surface looking like a stack of pages.
//!
//! The surface is never split. Instead, a pass walks its top-level blocks and
//! inserts a *page spacer* in front of each block that would overflow the
//! current page. A spacer is an empty, non-editable block as tall as the
//! unused rest of the page plus the gap to the next page's content, so the
//! block it precedes starts exactly where the next page's content area
//! begins.
//!
//! Spacers are bookkeeping, not content. Every pass removes all existing
//! spacers before computing new ones, and [`strip_spacers`] removes them from
//! serialized markup, so the persisted document never contains them:
//!
//! ```text
//! strip_spacers(paginate(html)) == html
//! ```

pub mod page_break;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use crate::config::LayoutConfig;
use crate::measure::Measure;
use crate::surface::{Element, NodeId, Surface, SPACER_ATTR};

use page_break::{plan_page_breaks, FIT_TOLERANCE};

/// Class carried by spacers for styling. Matching uses [`SPACER_ATTR`] only.
pub const SPACER_CLASS: &str = "page-spacer";

/// Build the element for a spacer of the given height.
pub fn spacer_element(height: f64) -> Element {
    Element::new("div")
        .with_attr("class", SPACER_CLASS)
        .with_attr(SPACER_ATTR, "true")
        .with_attr("contenteditable", "false")
        .with_attr("aria-hidden", "true")
        .with_attr(
            "style",
            format!("height:{}px;user-select:none;pointer-events:none", format_px(height)),
        )
}

fn format_px(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

/// Remove every page spacer from serialized markup.
///
/// Works on the text directly: each spacer element (with anything inside it)
/// is cut out by byte range, and everything else is returned untouched.
/// Markup the reader cannot follow is returned unchanged.
pub fn strip_spacers(html: &str) -> String {
    if !html.contains(SPACER_ATTR) {
        return html.to_string();
    }
    match spacer_ranges(html) {
        Ok(ranges) => {
            let mut out = String::with_capacity(html.len());
            let mut last = 0;
            for (start, end) in ranges {
                out.push_str(&html[last..start]);
                last = end;
            }
            out.push_str(&html[last..]);
            out
        }
        Err(e) => {
            warn!(error = %e, "could not scan markup for page spacers, leaving it as is");
            html.to_string()
        }
    }
}

/// Byte ranges of the outermost spacer elements in `html`.
fn spacer_ranges(html: &str) -> Result<Vec<(usize, usize)>, quick_xml::Error> {
    let mut reader = Reader::from_str(html);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }

    let mut ranges = Vec::new();
    // (start offset, nesting depth) of the spacer currently being skipped
    let mut open: Option<(usize, usize)> = None;

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader.read_event()?;
        let end = reader.buffer_position() as usize;
        match event {
            Event::Start(e) => {
                let void = crate::surface::is_void(&String::from_utf8_lossy(e.name().as_ref()));
                match open.as_mut() {
                    Some((_, depth)) if !void => *depth += 1,
                    Some(_) => {}
                    None if is_spacer_tag(&e) => {
                        if void {
                            ranges.push((start, end));
                        } else {
                            open = Some((start, 1));
                        }
                    }
                    None => {}
                }
            }
            Event::Empty(e) => {
                if open.is_none() && is_spacer_tag(&e) {
                    ranges.push((start, end));
                }
            }
            Event::End(e) => {
                let void = crate::surface::is_void(&String::from_utf8_lossy(e.name().as_ref()));
                if let Some((spacer_start, depth)) = open.as_mut() {
                    if !void {
                        *depth -= 1;
                        if *depth == 0 {
                            ranges.push((*spacer_start, end));
                            open = None;
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    // An unterminated spacer runs to the end of the input.
    if let Some((spacer_start, _)) = open {
        ranges.push((spacer_start, html.len()));
    }
    Ok(ranges)
}

fn is_spacer_tag(e: &quick_xml::events::BytesStart) -> bool {
    e.html_attributes()
        .filter_map(|a| a.ok())
        .any(|a| a.key.as_ref().eq_ignore_ascii_case(SPACER_ATTR.as_bytes()))
}

/// The persistable content of `surface`: its markup without spacers.
pub fn clean_html(surface: &Surface) -> String {
    strip_spacers(&surface.serialize())
}

/// Maintains page spacers in a surface.
#[derive(Debug, Clone)]
pub struct PaginationEngine {
    last_page_count: usize,
}

impl Default for PaginationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PaginationEngine {
    pub fn new() -> Self {
        Self { last_page_count: 1 }
    }

    /// Page count from the most recent pass.
    pub fn page_count(&self) -> usize {
        self.last_page_count
    }

    /// Recompute page spacers and return the total page count.
    ///
    /// A detached surface is left alone and the previous count is returned.
    /// A page with no room for content (margins at least as tall as the page)
    /// is a single page with no spacers.
    pub fn recompute(
        &mut self,
        surface: &mut Surface,
        measure: &dyn Measure,
        config: &LayoutConfig,
    ) -> usize {
        if !surface.is_attached() {
            debug!(pages = self.last_page_count, "surface detached, skipping pagination");
            return self.last_page_count;
        }

        let removed = remove_spacers(surface);
        let content_per_page = config.content_per_page();
        if content_per_page <= 0.0 {
            debug!(content_per_page, "no room for content, treating as one page");
            self.last_page_count = 1;
            return 1;
        }

        let blocks: Vec<NodeId> = surface.children(surface.root()).to_vec();
        let heights: Vec<f64> = blocks
            .iter()
            .map(|&b| measure.block_height(surface, b, config))
            .collect();
        let total: f64 = heights.iter().filter(|h| **h > 0.0).sum();
        if total <= content_per_page + FIT_TOLERANCE {
            self.last_page_count = 1;
            return 1;
        }

        let breaks = plan_page_breaks(&heights, content_per_page, config.page_break_gap());
        let root = surface.root();
        for brk in &breaks {
            let spacer = surface.create_element(spacer_element(brk.spacer_height));
            surface.insert_before(root, spacer, Some(blocks[brk.before]));
        }

        self.last_page_count = breaks.len() + 1;
        debug!(
            removed,
            inserted = breaks.len(),
            pages = self.last_page_count,
            total_height = total,
            "pagination pass"
        );
        self.last_page_count
    }
}

/// Remove every spacer from the surface, returning how many there were.
pub fn remove_spacers(surface: &mut Surface) -> usize {
    let spacers = surface.page_spacers();
    for &spacer in &spacers {
        surface.remove(spacer);
    }
    spacers.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::HeuristicMeasure;

    fn config(page_height: f64, top: f64, bottom: f64) -> LayoutConfig {
        LayoutConfig {
            page_height,
            ..LayoutConfig::default()
        }
        .with_margins(top, bottom)
    }

    fn blocks(heights: &[u32]) -> String {
        heights
            .iter()
            .enumerate()
            .map(|(i, h)| format!(r#"<div data-height="{h}">block {i}</div>"#))
            .collect()
    }

    #[test]
    fn scenario_three_blocks_two_pages() {
        let html = blocks(&[400, 500, 200]);
        let mut surface = Surface::parse(&html).unwrap();
        let mut engine = PaginationEngine::new();
        let pages = engine.recompute(
            &mut surface,
            &HeuristicMeasure::default(),
            &config(842.0, 40.0, 40.0),
        );
        assert_eq!(pages, 2);

        let children = surface.children(surface.root()).to_vec();
        assert_eq!(children.len(), 4);
        assert!(surface.is_page_spacer(children[1]));
        let style = surface.element(children[1]).unwrap().style_value("height");
        // 762 - 400 remaining, plus 40 + 20 + 40 gap
        assert_eq!(style, Some("462px"));
    }

    #[test]
    fn page_count_matches_spacers() {
        let html = blocks(&[300, 300, 300, 300, 300, 300, 300]);
        let mut surface = Surface::parse(&html).unwrap();
        let pages = PaginationEngine::new().recompute(
            &mut surface,
            &HeuristicMeasure::default(),
            &LayoutConfig::default(),
        );
        assert_eq!(pages, 1 + surface.page_spacers().len());
        assert_eq!(pages, 4);
    }

    #[test]
    fn recompute_is_idempotent() {
        let html = blocks(&[500, 500, 500]);
        let mut surface = Surface::parse(&html).unwrap();
        let mut engine = PaginationEngine::new();
        let measure = HeuristicMeasure::default();
        let cfg = LayoutConfig::default();
        engine.recompute(&mut surface, &measure, &cfg);
        let first = surface.serialize();
        engine.recompute(&mut surface, &measure, &cfg);
        assert_eq!(surface.serialize(), first);
        assert_eq!(clean_html(&surface), html);
    }

    #[test]
    fn degenerate_margins_single_page() {
        let html = blocks(&[500, 500, 500]);
        let mut surface = Surface::parse(&html).unwrap();
        let mut engine = PaginationEngine::new();
        let measure = HeuristicMeasure::default();
        assert_eq!(engine.recompute(&mut surface, &measure, &LayoutConfig::default()), 3);

        let pages = engine.recompute(&mut surface, &measure, &config(842.0, 421.0, 421.0));
        assert_eq!(pages, 1);
        assert!(surface.page_spacers().is_empty());
    }

    #[test]
    fn empty_surface_is_one_page() {
        let mut surface = Surface::new();
        let pages = PaginationEngine::new().recompute(
            &mut surface,
            &HeuristicMeasure::default(),
            &LayoutConfig::default(),
        );
        assert_eq!(pages, 1);
    }

    #[test]
    fn detached_surface_keeps_last_count() {
        let mut surface = Surface::parse(&blocks(&[500, 500, 500])).unwrap();
        let mut engine = PaginationEngine::new();
        let measure = HeuristicMeasure::default();
        let cfg = LayoutConfig::default();
        assert_eq!(engine.recompute(&mut surface, &measure, &cfg), 3);

        let before = surface.serialize();
        surface.detach();
        surface.load_html(&blocks(&[10])).unwrap();
        assert_eq!(engine.recompute(&mut surface, &measure, &cfg), 3);
        assert_ne!(surface.serialize(), before);
        assert!(surface.page_spacers().is_empty());
    }

    #[test]
    fn strip_leaves_other_markup_untouched() {
        let html = r#"<p class="x">a</p><div class="page-spacer" data-page-spacer="true" style="height:10px"></div><p>b &amp; c</p>"#;
        assert_eq!(strip_spacers(html), r#"<p class="x">a</p><p>b &amp; c</p>"#);
    }

    #[test]
    fn strip_handles_self_closing_and_nested() {
        let html = r#"<p>a</p><div data-page-spacer="true"/><div data-page-spacer="true"><div>x</div><br></div><p>b</p>"#;
        assert_eq!(strip_spacers(html), "<p>a</p><p>b</p>");
    }

    #[test]
    fn strip_without_spacers_is_identity() {
        let html = "<p>one</p>\n<p>two</p>";
        assert_eq!(strip_spacers(html), html);
    }

    #[test]
    fn strip_is_inverse_of_insertion() {
        let html = blocks(&[700, 300, 900, 100, 50]);
        let mut surface = Surface::parse(&html).unwrap();
        PaginationEngine::new().recompute(
            &mut surface,
            &HeuristicMeasure::default(),
            &LayoutConfig::default(),
        );
        assert!(!surface.page_spacers().is_empty());
        assert_eq!(strip_spacers(&surface.serialize()), html);
    }

    #[test]
    fn px_formatting() {
        assert_eq!(format_px(462.0), "462");
        assert_eq!(format_px(12.346), "12.35");
    }
}
