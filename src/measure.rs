//! # Height Measurement
//!
//! Pagination needs the rendered height of every top-level block. In a
//! browser that is the layout engine's job; here it is a port, [`Measure`],
//! so the engine can run against a real renderer, a test double, or the
//! headless estimator below.
//!
//! [`HeuristicMeasure`] approximates a browser well enough for server-side
//! pagination and tests: explicit heights always win, inline text is wrapped
//! greedily at UAX#14 break opportunities against the page's content width,
//! and headings scale the font.

use unicode_linebreak::{linebreaks, BreakOpportunity};

use crate::config::LayoutConfig;
use crate::image_loader::{data_uri_dimensions, fit_within};
use crate::surface::{Element, NodeData, NodeId, Surface};

/// Source of rendered heights for surface nodes.
pub trait Measure {
    /// Rendered height of `node`, in unscaled layout pixels.
    fn block_height(&self, surface: &Surface, node: NodeId, config: &LayoutConfig) -> f64;
}

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "dfn", "em", "font", "i", "kbd",
    "label", "mark", "q", "s", "samp", "small", "span", "strike", "strong", "sub", "sup", "time",
    "u", "var", "br", "wbr",
];

const LIST_INDENT: f64 = 40.0;

/// Headless height estimator.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicMeasure {
    /// Base font size in pixels.
    pub font_size: f64,
    /// Line height as a multiple of the font size.
    pub line_height: f64,
    /// Average advance of one character, as a fraction of the font size.
    pub char_width: f64,
}

impl Default for HeuristicMeasure {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            line_height: 1.5,
            char_width: 0.5,
        }
    }
}

impl Measure for HeuristicMeasure {
    fn block_height(&self, surface: &Surface, node: NodeId, config: &LayoutConfig) -> f64 {
        self.height(surface, node, config.content_width(), self.font_size)
    }
}

impl HeuristicMeasure {
    fn height(&self, surface: &Surface, node: NodeId, width: f64, font_size: f64) -> f64 {
        match surface.data(node) {
            NodeData::Comment(_) => 0.0,
            NodeData::Text(raw) => {
                let mut run = String::new();
                push_collapsed(&mut run, raw);
                self.run_height(&run, width, font_size)
            }
            NodeData::Element(el) => self.element_height(surface, node, el, width, font_size),
        }
    }

    fn element_height(
        &self,
        surface: &Surface,
        node: NodeId,
        el: &Element,
        width: f64,
        font_size: f64,
    ) -> f64 {
        if let Some(h) = explicit_height(el) {
            return h;
        }
        if el.is_tag("img") {
            return image_height(el, width);
        }
        if el.is_void() && !el.is_tag("br") {
            return 0.0;
        }
        let font_size = font_size_for(el, font_size);
        if el.is_tag("br") {
            return font_size * self.line_height;
        }
        if el.is_tag("tr") {
            return self.row_height(surface, node, width, font_size);
        }
        let width = if el.is_tag("ul") || el.is_tag("ol") {
            (width - LIST_INDENT).max(0.0)
        } else {
            width
        };

        let mut total = 0.0;
        let mut run = String::new();
        for &child in surface.children(node) {
            if is_inline(surface, child) {
                self.collect_inline(surface, child, &mut run, &mut total, width, font_size);
            } else {
                total += self.run_height(&run, width, font_size);
                run.clear();
                total += self.height(surface, child, width, font_size);
            }
        }
        total + self.run_height(&run, width, font_size)
    }

    /// Flatten an inline subtree into `run`. Images inside inline content
    /// contribute their own height directly.
    fn collect_inline(
        &self,
        surface: &Surface,
        node: NodeId,
        run: &mut String,
        total: &mut f64,
        width: f64,
        font_size: f64,
    ) {
        match surface.data(node) {
            NodeData::Text(raw) => push_collapsed(run, raw),
            NodeData::Comment(_) => {}
            NodeData::Element(el) if el.is_tag("br") => run.push('\n'),
            NodeData::Element(el) if el.is_tag("img") => {
                *total += explicit_height(el).unwrap_or_else(|| image_height(el, width));
            }
            NodeData::Element(_) => {
                for &child in surface.children(node) {
                    self.collect_inline(surface, child, run, total, width, font_size);
                }
            }
        }
    }

    /// Cells sit side by side; the row is as tall as its tallest cell.
    fn row_height(&self, surface: &Surface, row: NodeId, width: f64, font_size: f64) -> f64 {
        let cells: Vec<NodeId> = surface
            .children(row)
            .iter()
            .copied()
            .filter(|&c| surface.element(c).is_some())
            .collect();
        if cells.is_empty() {
            return 0.0;
        }
        let cell_width = width / cells.len() as f64;
        cells
            .into_iter()
            .map(|c| self.height(surface, c, cell_width, font_size))
            .fold(0.0, f64::max)
    }

    fn run_height(&self, run: &str, width: f64, font_size: f64) -> f64 {
        self.count_lines(run, width, font_size) as f64 * font_size * self.line_height
    }

    /// Greedy line count for a collapsed run, where `\n` marks a forced
    /// break.
    pub fn count_lines(&self, text: &str, width: f64, font_size: f64) -> usize {
        if text.trim_matches(' ').is_empty() && !text.contains('\n') {
            return 0;
        }
        let advance = font_size * self.char_width;
        let max_chars = if advance > 0.0 {
            ((width / advance).floor() as usize).max(1)
        } else {
            usize::MAX
        };

        let mut lines = 1;
        let mut line_len = 0usize;
        let mut start = 0;
        for (pos, opportunity) in linebreaks(text) {
            let segment = &text[start..pos];
            start = pos;
            let visible = segment.trim_end().chars().count();
            let full = segment.trim_end_matches('\n').chars().count();
            if line_len > 0 && line_len + visible > max_chars {
                lines += 1;
                line_len = 0;
            }
            if visible > max_chars {
                // A single word wider than the line wraps by characters.
                lines += (visible - 1) / max_chars;
                line_len = (visible - 1) % max_chars + 1 + (full - visible);
            } else {
                // Trailing spaces hang past the edge without wrapping.
                line_len += full;
            }
            if opportunity == BreakOpportunity::Mandatory && pos < text.len() {
                lines += 1;
                line_len = 0;
            }
        }
        lines
    }
}

fn is_inline(surface: &Surface, node: NodeId) -> bool {
    match surface.data(node) {
        NodeData::Text(_) | NodeData::Comment(_) => true,
        NodeData::Element(el) => INLINE_TAGS.iter().any(|t| el.is_tag(t)),
    }
}

/// A height the markup states outright: `data-height`, an inline
/// `height:Npx`, or the `height` attribute of replaced content.
pub fn explicit_height(el: &Element) -> Option<f64> {
    if let Some(h) = el.attr("data-height").and_then(parse_px) {
        return Some(h);
    }
    if let Some(h) = el.style_value("height").and_then(parse_px) {
        return Some(h);
    }
    let replaced = ["img", "table", "iframe", "video", "canvas"]
        .iter()
        .any(|t| el.is_tag(t));
    if replaced {
        return el.attr("height").and_then(parse_px);
    }
    None
}

/// Height of an image without a stated height: its intrinsic size (read
/// from an inline data URI) scaled down to `width`. Unknown sources are
/// zero until the markup states a size.
fn image_height(el: &Element, width: f64) -> f64 {
    let Some((w, h)) = el.attr("src").and_then(|src| data_uri_dimensions(src).ok()) else {
        return 0.0;
    };
    let display_width = el.attr("width").and_then(parse_px).unwrap_or(w as f64);
    fit_within(w as f64, h as f64, display_width.min(width), f64::INFINITY).1
}

/// Parse `"12"`, `"12.5px"`. Anything else (percentages, `auto`) is `None`.
pub fn parse_px(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn font_size_for(el: &Element, inherited: f64) -> f64 {
    if let Some(px) = el.style_value("font-size").and_then(parse_px) {
        return px;
    }
    let scale = match el.tag.to_ascii_lowercase().as_str() {
        "h1" => 2.0,
        "h2" => 1.5,
        "h3" => 1.17,
        "h5" => 0.83,
        "h6" => 0.67,
        "small" => 0.83,
        _ => 1.0,
    };
    inherited * scale
}

/// Append `raw` with whitespace collapsed and character references counted
/// as one character.
fn push_collapsed(run: &mut String, raw: &str) {
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            if !run.ends_with(' ') && !run.ends_with('\n') {
                run.push(' ');
            }
        } else if c == '&' {
            let reference: String = chars
                .clone()
                .take_while(|&n| n != ';' && !n.is_whitespace())
                .collect();
            let terminated = chars.clone().nth(reference.chars().count()) == Some(';');
            if terminated && !reference.is_empty() {
                for _ in 0..=reference.chars().count() {
                    chars.next();
                }
                run.push('x');
            } else {
                run.push('&');
            }
        } else {
            run.push(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measure_first(html: &str) -> f64 {
        let surface = Surface::parse(html).unwrap();
        let first = surface.children(surface.root())[0];
        HeuristicMeasure::default().block_height(&surface, first, &LayoutConfig::default())
    }

    #[test]
    fn explicit_heights_win() {
        assert_eq!(measure_first(r#"<div data-height="400">text</div>"#), 400.0);
        assert_eq!(measure_first(r#"<div style="height: 120px">text</div>"#), 120.0);
        assert_eq!(measure_first(r#"<img src="a.png" height="80">"#), 80.0);
    }

    #[test]
    fn inline_image_uses_intrinsic_size() {
        let mut buf = Vec::new();
        let img = image::RgbaImage::new(1030, 200);
        image::ImageEncoder::write_image(
            image::codecs::png::PngEncoder::new(&mut buf),
            img.as_raw(),
            1030,
            200,
            image::ColorType::Rgba8,
        )
        .unwrap();
        use base64::Engine;
        let src = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&buf)
        );
        // 1030 wide on a 515 content width halves the height
        assert_eq!(measure_first(&format!(r#"<img src="{src}">"#)), 100.0);
        assert_eq!(measure_first(r#"<img src="remote.png">"#), 0.0);
    }

    #[test]
    fn empty_block_is_zero_height() {
        assert_eq!(measure_first("<p></p>"), 0.0);
        assert_eq!(measure_first("<p>   </p>"), 0.0);
    }

    #[test]
    fn empty_paragraph_with_break_is_one_line() {
        assert_eq!(measure_first("<p><br></p>"), 24.0);
    }

    #[test]
    fn short_paragraph_is_one_line() {
        assert_eq!(measure_first("<p>Hello world</p>"), 24.0);
    }

    #[test]
    fn headings_scale() {
        assert_eq!(measure_first("<h1>Title</h1>"), 48.0);
    }

    #[test]
    fn long_text_wraps() {
        // 515px content width at 8px per char fits 64 chars per line.
        let words = "word ".repeat(40); // 200 chars
        let h = measure_first(&format!("<p>{words}</p>"));
        assert_eq!(h, 4.0 * 24.0);
    }

    #[test]
    fn nested_blocks_sum() {
        let h = measure_first("<div><p>a</p><p>b</p><p data-height=\"10\"></p></div>");
        assert_eq!(h, 58.0);
    }

    #[test]
    fn table_rows_take_tallest_cell() {
        let h = measure_first(
            r#"<table><tr><td data-height="30"></td><td data-height="50"></td></tr><tr><td>x</td></tr></table>"#,
        );
        assert_eq!(h, 74.0);
    }

    #[test]
    fn forced_breaks_count() {
        let m = HeuristicMeasure::default();
        assert_eq!(m.count_lines("a\nb\nc", 500.0, 16.0), 3);
        assert_eq!(m.count_lines("a\n", 500.0, 16.0), 1);
        assert_eq!(m.count_lines("", 500.0, 16.0), 0);
    }

    #[test]
    fn unbreakable_word_wraps_by_characters() {
        let m = HeuristicMeasure::default();
        // 10 chars per line
        assert_eq!(m.count_lines(&"x".repeat(25), 80.0, 16.0), 3);
    }

    #[test]
    fn references_count_as_one_char() {
        let mut run = String::new();
        push_collapsed(&mut run, "a&nbsp;&amp;  b & c");
        assert_eq!(run, "axx b & c");
    }

    #[test]
    fn parse_px_forms() {
        assert_eq!(parse_px("12"), Some(12.0));
        assert_eq!(parse_px(" 12.5px "), Some(12.5));
        assert_eq!(parse_px("50%"), None);
        assert_eq!(parse_px("-3"), None);
    }
}
