//! # Folio
//!
//! A paged editing engine for one continuous rich-text surface.
//!
//! Browser editors give you an endless column of content. Documents that end
//! up on paper need pages: a fixed content height per page, visible gaps,
//! headers and footers, a page counter that tracks the scroll position.
//!
//! Folio keeps the document as one surface and makes it *look* paged. A
//! pagination pass measures the top-level blocks and inserts page spacers
//! wherever the next block would overflow the current page. Spacers are pure
//! bookkeeping: they are stripped from everything that gets persisted, and
//! if a destructive edit wipes them out they are rebuilt on the next frame.
//!
//! ## Architecture
//!
//! ```text
//! Persisted HTML
//!       ↓
//!   [surface]     Arena tree, lenient HTML parse/serialize, caret
//!       ↓
//!   [measure]     Rendered block heights (headless estimator by default)
//!       ↓
//!   [pagination]  Page spacers, page count, clean HTML
//!       ↓
//!   [editor]      Zones, drops, keys, scroll, self-healing, history
//! ```

pub mod config;
pub mod editor;
pub mod error;
pub mod image_loader;
pub mod keyboard;
pub mod measure;
pub mod observer;
pub mod pagination;
pub mod scheduler;
pub mod surface;
pub mod tracker;
pub mod zones;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::{LayoutConfig, PageSize};
pub use editor::{DocumentHost, Editor, EditorState, History, SnapshotHistory};
pub use error::{FolioError, Result};
pub use pagination::{clean_html, strip_spacers, PaginationEngine};
pub use surface::Surface;

use measure::HeuristicMeasure;

/// Paginate a document headlessly.
///
/// Returns the markup with page spacers in place and the page count. Any
/// spacers already in `html` are replaced.
pub fn paginate_html(html: &str, config: &LayoutConfig) -> Result<(String, usize)> {
    let mut surface = Surface::parse(html)?;
    let pages =
        PaginationEngine::new().recompute(&mut surface, &HeuristicMeasure::default(), config);
    Ok((surface.serialize(), pages))
}

/// Page count of a document under `config`.
pub fn page_count(html: &str, config: &LayoutConfig) -> Result<usize> {
    paginate_html(html, config).map(|(_, pages)| pages)
}
