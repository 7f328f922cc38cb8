//! # Zones and Drop Routing
//!
//! A page has three editable regions: the header band (inside the top
//! margin), the body, and the footer band (inside the bottom margin). The
//! body is the main editable surface; header and footer are small surfaces
//! of their own that are only editable while activated.
//!
//! During a drag the pointer position is classified into one of the three
//! so the drop target can be highlighted, and on drop the image files are
//! routed to the right place. Classification works in unscaled layout
//! units: the container on screen is scaled by the zoom factor, the margins
//! are not.

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::error::Result;
use crate::image_loader::EmbeddedImage;
use crate::measure::Measure;
use crate::surface::{Caret, Element, Surface};

/// One of the three regions of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Header,
    Body,
    Footer,
}

/// The regions that have their own edit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginZone {
    Header,
    Footer,
}

impl From<MarginZone> for Zone {
    fn from(zone: MarginZone) -> Self {
        match zone {
            MarginZone::Header => Zone::Header,
            MarginZone::Footer => Zone::Footer,
        }
    }
}

impl Zone {
    pub fn margin(self) -> Option<MarginZone> {
        match self {
            Zone::Header => Some(MarginZone::Header),
            Zone::Footer => Some(MarginZone::Footer),
            Zone::Body => None,
        }
    }
}

impl MarginZone {
    /// Height of the band the zone lives in.
    pub fn band_height(self, config: &LayoutConfig) -> f64 {
        match self {
            MarginZone::Header => config.margin_top,
            MarginZone::Footer => config.margin_bottom,
        }
        .max(0.0)
    }
}

/// On-screen box of the drop container, in viewport pixels (scaled).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerRect {
    pub left: f64,
    pub top: f64,
    pub height: f64,
}

impl ContainerRect {
    /// Convert a viewport point to unscaled container coordinates.
    pub fn to_local(&self, x: f64, y: f64, zoom: f64) -> (f64, f64) {
        ((x - self.left) / zoom, (y - self.top) / zoom)
    }
}

/// Classify a viewport `pointer_y` against the container.
pub fn classify_zone(pointer_y: f64, container: &ContainerRect, config: &LayoutConfig) -> Zone {
    let zoom = config.zoom_factor();
    let (_, y) = container.to_local(container.left, pointer_y, zoom);
    let height = container.height / zoom;
    if y < config.margin_top {
        Zone::Header
    } else if y > height - config.margin_bottom {
        Zone::Footer
    } else {
        Zone::Body
    }
}

/// Resolves a drop point to a caret in the body, the way a browser's
/// point-to-caret lookup does.
pub trait CaretResolver {
    /// `x`/`y` are unscaled container coordinates.
    fn caret_from_point(
        &self,
        surface: &Surface,
        measure: &dyn Measure,
        config: &LayoutConfig,
        x: f64,
        y: f64,
    ) -> Option<Caret>;
}

/// Resolves to the nearest boundary between top-level blocks, using the
/// same heights pagination uses. Horizontal position is not considered.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockCaretResolver;

impl CaretResolver for BlockCaretResolver {
    fn caret_from_point(
        &self,
        surface: &Surface,
        measure: &dyn Measure,
        config: &LayoutConfig,
        _x: f64,
        y: f64,
    ) -> Option<Caret> {
        let root = surface.root();
        let y = y - config.margin_top;
        let mut top = 0.0;
        for (index, &child) in surface.children(root).iter().enumerate() {
            let height = measure.block_height(surface, child, config);
            if y < top + height / 2.0 {
                return Some(Caret {
                    node: root,
                    offset: index,
                });
            }
            top += height;
        }
        Some(surface.end_caret())
    }
}

/// Build an `<img>` for an embedded image fitted into the given box.
///
/// Images of unknown size get no `width`/`height`; the box is applied as
/// CSS limits instead.
pub fn image_element(image: &EmbeddedImage, max_width: f64, max_height: f64) -> Element {
    let img = Element::new("img").with_attr("src", image.data_uri.clone());
    match image.fitted(max_width, max_height) {
        Some((width, height)) => img
            .with_attr("width", format!("{}", width.round() as u64))
            .with_attr("height", format!("{}", height.round() as u64))
            .with_attr("style", "max-width:100%"),
        None if max_height.is_finite() => img.with_attr(
            "style",
            format!("max-width:100%;max-height:{}px", max_height.max(0.0).round() as u64),
        ),
        None => img.with_attr("style", "max-width:100%"),
    }
}

/// What a `data-variable` chip shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageVariable {
    PageNumber,
    TotalPages,
}

impl PageVariable {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "page" | "pageNumber" | "page-number" => Some(Self::PageNumber),
            "pages" | "totalPages" | "total-pages" => Some(Self::TotalPages),
            _ => None,
        }
    }
}

/// Fill the page-number chips of a zone for one page.
///
/// Every element with a recognised `data-variable` gets its content replaced
/// by the number. Unknown variables are left as they are.
pub fn render_page_variables(zone_html: &str, page: usize, total_pages: usize) -> Result<String> {
    let mut surface = Surface::parse(zone_html)?;
    let chips: Vec<_> = surface
        .descendants(surface.root())
        .into_iter()
        .filter_map(|id| {
            let variable = surface
                .element(id)?
                .attr("data-variable")
                .and_then(PageVariable::from_name)?;
            Some((id, variable))
        })
        .collect();

    for (chip, variable) in chips {
        let value = match variable {
            PageVariable::PageNumber => page,
            PageVariable::TotalPages => total_pages,
        };
        for child in surface.children(chip).to_vec() {
            surface.remove(child);
        }
        let text = surface.create_text(value.to_string());
        surface.append_child(chip, text);
    }
    Ok(surface.serialize())
}
