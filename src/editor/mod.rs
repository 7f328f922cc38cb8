//! # Editor Controller
//!
//! Owns one paged document and everything that acts on it: the body surface,
//! the header and footer zone surfaces, the pagination engine, the
//! self-healing observer, the scroll tracker, and the scheduler their
//! deferred work runs on.
//!
//! Host events come in through plain method calls (`key_down`, `drag_over`,
//! `drop_files`, `scroll`, `edit_body`), and host time through
//! [`Editor::tick_frame`] and [`Editor::advance`]. Results go back out
//! through the [`DocumentHost`] callbacks and the [`History`] service. The
//! controller is single-threaded: each call runs to completion before the
//! next one starts.
//!
//! ```text
//!  events ──▶ Editor ──▶ body Surface ◀── PaginationEngine
//!               │            │
//!               │            └─ records ─▶ SelfHealingObserver
//!               │                              │
//!               └──── Scheduler ◀── repair ────┘
//!                        │
//!                        └─ settle / debounce / repair tasks ─▶ Editor
//! ```

mod history;
mod state;

pub use history::{History, SnapshotHistory};
pub use state::{EditorMode, EditorState, Focus};

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::LayoutConfig;
use crate::error::{FolioError, Result};
use crate::image_loader::{embed_dropped_file, DroppedFile};
use crate::keyboard::{self, KeyCommand, KeyEvent, INDENT};
use crate::measure::{HeuristicMeasure, Measure};
use crate::observer::SelfHealingObserver;
use crate::pagination::{self, PaginationEngine};
use crate::scheduler::{Deferral, Scheduler, TaskHandle};
use crate::surface::{Caret, NodeId, Surface};
use crate::tracker::ScrollTracker;
use crate::zones::{self, BlockCaretResolver, CaretResolver, ContainerRect, MarginZone, Zone};

/// How long a freshly activated zone gets to mount before dropped images
/// are inserted into it.
pub const ZONE_SETTLE_DELAY: Duration = Duration::from_millis(150);

/// Callbacks into the embedding application. All default to no-ops.
pub trait DocumentHost {
    /// The body changed; `clean_html` is the persistable document.
    fn document_changed(&mut self, _clean_html: &str) {}
    fn zone_changed(&mut self, _zone: MarginZone, _html: &str) {}
    fn recompute_stats(&mut self) {}
    fn find_replace_toggled(&mut self, _open: bool) {}
    fn current_page_changed(&mut self, _page: usize, _total_pages: usize) {}
}

impl DocumentHost for () {}

#[derive(Debug)]
enum EditorTask {
    RepairPagination,
    SettleScroll,
    InsertZoneImages {
        zone: MarginZone,
        files: Vec<DroppedFile>,
    },
}

/// What happened to a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DropReport {
    pub zone: Zone,
    /// Image files taken from the payload.
    pub accepted: usize,
    /// Non-image files, silently skipped.
    pub ignored: usize,
    /// Images already in the body. Zone drops insert after the settle delay.
    pub inserted: usize,
}

pub struct Editor<H: DocumentHost = (), Y: History = SnapshotHistory> {
    config: LayoutConfig,
    body: Surface,
    header: Surface,
    footer: Surface,
    state: EditorState,
    engine: PaginationEngine,
    observer: SelfHealingObserver,
    tracker: ScrollTracker,
    scheduler: Scheduler<EditorTask>,
    measure: Box<dyn Measure>,
    caret_resolver: Option<Box<dyn CaretResolver>>,
    host: H,
    history: Y,
    torn_down: bool,
}

impl<H: DocumentHost, Y: History> Editor<H, Y> {
    pub fn new(config: LayoutConfig, host: H, history: Y) -> Self {
        let mut body = Surface::new();
        let observer = SelfHealingObserver::observe(&mut body);
        Self {
            config,
            body,
            header: Surface::new(),
            footer: Surface::new(),
            state: EditorState::default(),
            engine: PaginationEngine::new(),
            observer,
            tracker: ScrollTracker::new(),
            scheduler: Scheduler::new(),
            measure: Box::new(HeuristicMeasure::default()),
            caret_resolver: Some(Box::new(BlockCaretResolver)),
            host,
            history,
            torn_down: false,
        }
    }

    pub fn with_measure(mut self, measure: impl Measure + 'static) -> Self {
        self.measure = Box::new(measure);
        self
    }

    /// `None` makes body drops insert at the current selection.
    pub fn with_caret_resolver(mut self, resolver: Option<Box<dyn CaretResolver>>) -> Self {
        self.caret_resolver = resolver;
        self
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// The body surface, spacers included.
    pub fn body(&self) -> &Surface {
        &self.body
    }

    pub fn zone_surface(&self, zone: MarginZone) -> &Surface {
        match zone {
            MarginZone::Header => &self.header,
            MarginZone::Footer => &self.footer,
        }
    }

    fn zone_surface_mut(&mut self, zone: MarginZone) -> &mut Surface {
        match zone {
            MarginZone::Header => &mut self.header,
            MarginZone::Footer => &mut self.footer,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn history(&self) -> &Y {
        &self.history
    }

    pub fn page_count(&self) -> usize {
        self.state.total_pages
    }

    pub fn current_page(&self) -> usize {
        self.state.current_page
    }

    /// Deferred tasks not yet run.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // ── Document ─────────────────────────────────────────────────

    /// Mount a persisted document. It becomes the first history entry.
    pub fn load_html(&mut self, html: &str) -> Result<usize> {
        if self.torn_down {
            return Ok(self.state.total_pages);
        }
        self.replace_body(html)?;
        let pages = self.repaginate();
        let clean = self.clean_html();
        self.history.push(clean);
        Ok(pages)
    }

    pub fn load_zone_html(&mut self, zone: MarginZone, html: &str) -> Result<()> {
        let surface = self.zone_surface_mut(zone);
        surface.load_html(html)?;
        surface.reclaim(&[]);
        Ok(())
    }

    /// Persistable body content, without page spacers.
    pub fn clean_html(&self) -> String {
        pagination::clean_html(&self.body)
    }

    pub fn zone_html(&self, zone: MarginZone) -> String {
        self.zone_surface(zone).serialize()
    }

    /// A zone's content with its page-number chips filled in for `page`.
    pub fn render_zone(&self, zone: MarginZone, page: usize) -> Result<String> {
        zones::render_page_variables(&self.zone_html(zone), page, self.state.total_pages)
    }

    fn replace_body(&mut self, html: &str) -> Result<()> {
        self.observer.begin_update();
        let loaded = self.body.load_html(html);
        self.observer.end_update(&mut self.body);
        loaded?;
        self.state.selected_element = None;
        Ok(())
    }

    /// Run a pagination pass now.
    pub fn repaginate(&mut self) -> usize {
        if self.torn_down {
            return self.state.total_pages;
        }
        self.observer.begin_update();
        let pages = self
            .engine
            .recompute(&mut self.body, self.measure.as_ref(), &self.config);
        self.observer.end_update(&mut self.body);
        // Spacers from the previous pass and content dropped by edits are
        // detached by now; only the selection may still point at one.
        let keep: Vec<NodeId> = self.state.selected_element.into_iter().collect();
        let freed = self.body.reclaim(&keep);
        if freed > 0 {
            debug!(freed, "reclaimed detached nodes");
        }
        let page = self.state.current_page.clamp(1, pages);
        self.set_page_info(page, pages);
        pages
    }

    fn set_page_info(&mut self, page: usize, total_pages: usize) {
        if page == self.state.current_page && total_pages == self.state.total_pages {
            return;
        }
        self.state.current_page = page;
        self.state.total_pages = total_pages;
        self.host.current_page_changed(page, total_pages);
    }

    /// Apply a user edit to the body. Edits that destroy page spacers are
    /// repaired on the next frame. Returns `None` once torn down.
    pub fn edit_body<R>(&mut self, edit: impl FnOnce(&mut Surface) -> R) -> Option<R> {
        if self.torn_down {
            return None;
        }
        let out = edit(&mut self.body);
        self.collect_mutations();
        Some(out)
    }

    fn collect_mutations(&mut self) {
        if self.observer.collect(&mut self.body) {
            let handle = self
                .scheduler
                .schedule(Deferral::NextFrame, EditorTask::RepairPagination);
            self.observer.repair_scheduled(handle);
        }
    }

    /// The standard body-changed handler: repaginate, refresh stats, record
    /// history, notify the host.
    pub fn body_changed(&mut self) {
        if self.torn_down {
            return;
        }
        self.repaginate();
        self.host.recompute_stats();
        let html = self.clean_html();
        self.history.push(html.clone());
        self.host.document_changed(&html);
    }

    /// Replace layout geometry (page size, margins, zoom) and repaginate.
    pub fn set_config(&mut self, config: LayoutConfig) -> usize {
        self.config = config;
        let pages = self.repaginate();
        let page = self.tracker.current_page(&self.config, pages);
        self.set_page_info(page, pages);
        pages
    }

    pub fn set_container_rect(&mut self, rect: ContainerRect) {
        self.state.container = rect;
    }

    // ── Time ─────────────────────────────────────────────────────

    /// Run the tasks queued for the next animation frame. Returns how many ran.
    pub fn tick_frame(&mut self) -> usize {
        let tasks = self.scheduler.next_frame();
        let count = tasks.len();
        for (handle, task) in tasks {
            self.run_task(handle, task);
        }
        count
    }

    /// Let `by` of time pass and run every timer that came due.
    pub fn advance(&mut self, by: Duration) -> usize {
        let tasks = self.scheduler.advance(by);
        let count = tasks.len();
        for (handle, task) in tasks {
            self.run_task(handle, task);
        }
        count
    }

    fn run_task(&mut self, handle: TaskHandle, task: EditorTask) {
        match task {
            EditorTask::RepairPagination => {
                self.observer.repair_started(handle);
                let pages = self.repaginate();
                debug!(pages, "pagination repaired");
            }
            EditorTask::SettleScroll => {
                let total = self.state.total_pages;
                if let Some(page) = self.tracker.settle(handle, &self.config, total) {
                    self.set_page_info(page, total);
                }
            }
            EditorTask::InsertZoneImages { zone, files } => {
                self.insert_zone_images(zone, &files);
            }
        }
    }

    /// Cancel everything pending and unmount. Every later call is a no-op.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        let cancelled = self.scheduler.cancel_all();
        self.tracker.reset();
        self.observer.disconnect(&mut self.body);
        self.body.detach();
        self.header.detach();
        self.footer.detach();
        self.state.drag_zone = None;
        self.torn_down = true;
        debug!(cancelled, "editor torn down");
    }

    // ── Selection and zones ──────────────────────────────────────

    /// Select a body element as a whole.
    pub fn select_element(&mut self, id: NodeId) -> Result<()> {
        let selectable = id != self.body.root()
            && self.body.element(id).is_some()
            && self.body.is_connected(id)
            && !self.body.is_page_spacer(id);
        if !selectable {
            return Err(FolioError::NotAnElement(id));
        }
        self.state.selected_element = Some(id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.state.selected_element = None;
    }

    /// Put a zone in edit mode. Returns `false` if it already was.
    pub fn enter_zone(&mut self, zone: MarginZone) -> bool {
        if self.torn_down || self.state.editing_zone == Some(zone) {
            return false;
        }
        self.exit_zone();
        self.state.editing_zone = Some(zone);
        self.state.selected_element = None;
        self.state.focus = Focus::Zone(zone);
        true
    }

    /// Leave zone edit mode, handing the zone's content to the host. Any
    /// element selection goes with it.
    pub fn exit_zone(&mut self) -> Option<MarginZone> {
        let zone = self.state.editing_zone.take()?;
        self.state.selected_element = None;
        if self.state.focus == Focus::Zone(zone) {
            self.state.focus = Focus::Body;
        }
        let html = self.zone_html(zone);
        self.host.zone_changed(zone, &html);
        Some(zone)
    }

    // ── Drag and drop ────────────────────────────────────────────

    /// Pointer moved during a drag. Returns whether the default action is
    /// prevented, which is what allows the drop.
    pub fn drag_over(&mut self, pointer_y: f64) -> bool {
        if self.torn_down {
            return false;
        }
        let zone = zones::classify_zone(pointer_y, &self.state.container, &self.config);
        self.state.drag_zone = Some(zone);
        true
    }

    /// Pointer left an element during a drag. Crossing into a descendant of
    /// the container keeps the highlight.
    pub fn drag_leave(&mut self, related_target_inside: bool) {
        if !related_target_inside {
            self.state.drag_zone = None;
        }
    }

    /// Files dropped at a viewport point. The default action is always
    /// prevented.
    pub fn drop_files(
        &mut self,
        pointer_x: f64,
        pointer_y: f64,
        files: Vec<DroppedFile>,
    ) -> DropReport {
        self.state.drag_zone = None;
        let zone = zones::classify_zone(pointer_y, &self.state.container, &self.config);
        let total = files.len();
        let images: Vec<DroppedFile> = files.into_iter().filter(|f| f.is_image()).collect();
        let mut report = DropReport {
            zone,
            accepted: images.len(),
            ignored: total - images.len(),
            inserted: 0,
        };
        if self.torn_down || images.is_empty() {
            return report;
        }

        match zone.margin() {
            Some(margin) => {
                self.enter_zone(margin);
                let handle = self.scheduler.schedule(
                    Deferral::After(ZONE_SETTLE_DELAY),
                    EditorTask::InsertZoneImages {
                        zone: margin,
                        files: images,
                    },
                );
                debug!(?handle, zone = ?margin, "zone images waiting for the zone to settle");
            }
            None => report.inserted = self.insert_body_images(pointer_x, pointer_y, &images),
        }
        report
    }

    fn insert_zone_images(&mut self, zone: MarginZone, files: &[DroppedFile]) -> usize {
        if self.state.editing_zone != Some(zone) {
            debug!(?zone, files = files.len(), "zone no longer active, dropping images");
            return 0;
        }
        let max_width = self.config.content_width();
        let max_height = zone.band_height(&self.config);
        let mut inserted = 0;
        for file in files {
            let image = match embed_dropped_file(file) {
                Ok(image) => image,
                Err(e) => {
                    warn!(file = %file.name, error = %e, "skipping dropped image");
                    continue;
                }
            };
            let surface = self.zone_surface_mut(zone);
            if !surface.is_attached() {
                return inserted;
            }
            let img = surface.create_element(zones::image_element(&image, max_width, max_height));
            let root = surface.root();
            surface.append_child(root, img);
            inserted += 1;

            let html = self.zone_html(zone);
            self.host.zone_changed(zone, &html);
        }
        inserted
    }

    fn insert_body_images(&mut self, x: f64, y: f64, files: &[DroppedFile]) -> usize {
        if !self.body.is_attached() {
            return 0;
        }
        self.state.focus = Focus::Body;
        self.state.selected_element = None;

        let (local_x, local_y) = self
            .state
            .container
            .to_local(x, y, self.config.zoom_factor());
        if let Some(resolver) = &self.caret_resolver {
            let caret = resolver.caret_from_point(
                &self.body,
                self.measure.as_ref(),
                &self.config,
                local_x,
                local_y,
            );
            if caret.is_some() {
                self.body.set_caret(caret);
            }
        }

        let max_width = self.config.content_width();
        let mut inserted = 0;
        for file in files {
            match embed_dropped_file(file) {
                Ok(image) => {
                    let img = self.body.create_element(zones::image_element(
                        &image,
                        max_width,
                        f64::INFINITY,
                    ));
                    self.body.insert_at_cursor(&[img]);
                    inserted += 1;
                }
                Err(e) => warn!(file = %file.name, error = %e, "skipping dropped image"),
            }
        }
        self.collect_mutations();
        if inserted > 0 {
            self.body_changed();
        }
        inserted
    }

    // ── Keyboard and scroll ──────────────────────────────────────

    /// Global key listener. Returns whether the default action is prevented.
    pub fn key_down(&mut self, event: &KeyEvent) -> bool {
        if self.torn_down {
            return false;
        }
        self.state.focus = event.focus;
        let command = keyboard::interpret(event, &self.state);
        self.execute(command);
        command.prevents_default()
    }

    pub fn execute(&mut self, command: KeyCommand) {
        match command {
            KeyCommand::PassThrough | KeyCommand::DeferToZone => {}
            KeyCommand::ClearSelection => self.clear_selection(),
            KeyCommand::DeleteSelected => self.delete_selected(),
            KeyCommand::InsertIndent => self.insert_indent(),
            KeyCommand::ToggleFindReplace => {
                self.state.find_replace_open = !self.state.find_replace_open;
                self.host.find_replace_toggled(self.state.find_replace_open);
            }
            KeyCommand::Undo => {
                if let Some(html) = self.history.undo() {
                    self.restore(&html);
                }
            }
            KeyCommand::Redo => {
                if let Some(html) = self.history.redo() {
                    self.restore(&html);
                }
            }
        }
    }

    /// Indent at the caret. Without one the indent goes at the end of the
    /// last content block; an empty body is left alone.
    fn insert_indent(&mut self) {
        if self.body.caret().is_none() {
            let root = self.body.root();
            let last_block = self.body.children(root).iter().rev().copied().find(|&id| {
                self.body
                    .element(id)
                    .is_some_and(|el| !el.is_void() && !self.body.is_page_spacer(id))
            });
            let Some(block) = last_block else {
                debug!("no caret and no block to indent");
                return;
            };
            let end = Caret {
                node: block,
                offset: self.body.children(block).len(),
            };
            self.body.set_caret(Some(end));
        }
        self.body.insert_text_at_cursor(INDENT);
        self.collect_mutations();
        self.body_changed();
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.state.selected_element.take() else {
            return;
        };
        if !self.body.is_connected(id) {
            debug!(?id, "selected element already gone");
            return;
        }
        self.body.remove(id);
        self.collect_mutations();
        self.body_changed();
    }

    /// Show a history snapshot without recording it again.
    fn restore(&mut self, html: &str) {
        if let Err(e) = self.replace_body(html) {
            warn!(error = %e, "history snapshot could not be loaded");
            return;
        }
        self.repaginate();
        self.host.recompute_stats();
        let clean = self.clean_html();
        self.host.document_changed(&clean);
    }

    /// Scroll listener. Passive: scrolling is never prevented.
    pub fn scroll(&mut self, scroll_top: f64) {
        if self.torn_down {
            return;
        }
        self.tracker
            .on_scroll(&mut self.scheduler, scroll_top, EditorTask::SettleScroll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::Key;

    #[derive(Default)]
    struct Recorder {
        documents: Vec<String>,
        zones: Vec<(MarginZone, String)>,
        stats: usize,
        pages: Vec<(usize, usize)>,
        find_replace: Vec<bool>,
    }

    impl DocumentHost for Recorder {
        fn document_changed(&mut self, clean_html: &str) {
            self.documents.push(clean_html.to_string());
        }
        fn zone_changed(&mut self, zone: MarginZone, html: &str) {
            self.zones.push((zone, html.to_string()));
        }
        fn recompute_stats(&mut self) {
            self.stats += 1;
        }
        fn find_replace_toggled(&mut self, open: bool) {
            self.find_replace.push(open);
        }
        fn current_page_changed(&mut self, page: usize, total_pages: usize) {
            self.pages.push((page, total_pages));
        }
    }

    fn editor() -> Editor<Recorder, SnapshotHistory> {
        Editor::new(
            LayoutConfig::default(),
            Recorder::default(),
            SnapshotHistory::new(),
        )
    }

    const THREE_PAGES: &str = r#"<div data-height="500">a</div><div data-height="500">b</div><div data-height="500">c</div>"#;

    #[test]
    fn load_paginates_and_reports_pages() {
        let mut editor = editor();
        assert_eq!(editor.load_html(THREE_PAGES).unwrap(), 3);
        assert_eq!(editor.page_count(), 3);
        assert_eq!(editor.host().pages, vec![(1, 3)]);
        assert_eq!(editor.clean_html(), THREE_PAGES);
        assert_eq!(editor.body().page_spacers().len(), 2);
    }

    #[test]
    fn deleting_spacers_is_repaired_next_frame() {
        let mut editor = editor();
        editor.load_html(THREE_PAGES).unwrap();
        let before = editor.body().serialize();

        editor.edit_body(|surface| {
            for spacer in surface.page_spacers() {
                surface.remove(spacer);
            }
        });
        assert!(editor.body().page_spacers().is_empty());
        assert_eq!(editor.pending_tasks(), 1);

        assert_eq!(editor.tick_frame(), 1);
        assert_eq!(editor.body().serialize(), before);
        assert_eq!(editor.tick_frame(), 0, "repair does not trigger itself");
    }

    #[test]
    fn escape_clears_selection() {
        let mut editor = editor();
        editor.load_html(THREE_PAGES).unwrap();
        let first = editor.body().children(editor.body().root())[0];
        editor.select_element(first).unwrap();
        assert_eq!(editor.state().mode(), EditorMode::ElementSelected);
        assert!(editor.key_down(&KeyEvent::new(Key::Escape, Focus::Body)));
        assert_eq!(editor.state().mode(), EditorMode::Idle);
    }

    #[test]
    fn spacers_and_root_are_not_selectable() {
        let mut editor = editor();
        editor.load_html(THREE_PAGES).unwrap();
        let spacer = editor.body().page_spacers()[0];
        assert!(editor.select_element(spacer).is_err());
        let root = editor.body().root();
        assert!(editor.select_element(root).is_err());
        assert!(editor.select_element(NodeId::from_raw(9999)).is_err());
    }

    #[test]
    fn delete_selected_runs_body_changed() {
        let mut editor = editor();
        editor.load_html(THREE_PAGES).unwrap();
        let first = editor.body().children(editor.body().root())[0];
        editor.select_element(first).unwrap();
        assert!(editor.key_down(&KeyEvent::new(Key::Delete, Focus::Body)));

        let expected = r#"<div data-height="500">b</div><div data-height="500">c</div>"#;
        assert_eq!(editor.clean_html(), expected);
        assert_eq!(editor.page_count(), 2);
        assert_eq!(editor.host().stats, 1);
        assert_eq!(editor.host().documents, vec![expected.to_string()]);
        assert_eq!(editor.history().current(), Some(expected));
        assert_eq!(editor.state().selected_element, None);
    }

    #[test]
    fn tab_inserts_indent_at_caret() {
        let mut editor = editor();
        editor.load_html("<p>ab</p><p>c</p>").unwrap();
        editor.edit_body(|body| {
            let p = body.children(body.root())[0];
            let text = body.children(p)[0];
            body.set_caret(Some(Caret { node: text, offset: 1 }));
        });
        assert!(editor.key_down(&KeyEvent::new(Key::Tab, Focus::Body)));
        assert_eq!(editor.clean_html(), format!("<p>a{INDENT}b</p><p>c</p>"));
    }

    #[test]
    fn tab_without_caret_indents_last_block() {
        let mut editor = editor();
        editor.load_html("<p>x</p><p>y</p>").unwrap();
        assert!(editor.key_down(&KeyEvent::new(Key::Tab, Focus::Body)));
        assert!(editor.key_down(&KeyEvent::new(Key::Tab, Focus::Body)));
        assert_eq!(
            editor.clean_html(),
            format!("<p>x</p><p>y{INDENT}{INDENT}</p>")
        );
        let root = editor.body().root();
        assert!(editor
            .body()
            .children(root)
            .iter()
            .all(|&id| editor.body().text(id).is_none()));
    }

    #[test]
    fn tab_on_empty_body_changes_nothing() {
        let mut editor = editor();
        editor.load_html("").unwrap();
        assert!(editor.key_down(&KeyEvent::new(Key::Tab, Focus::Body)));
        assert_eq!(editor.clean_html(), "");
        assert!(editor.host().documents.is_empty());
    }

    #[test]
    fn leaving_a_zone_drops_the_selection() {
        let mut editor = editor();
        editor.load_html(THREE_PAGES).unwrap();
        editor.enter_zone(MarginZone::Header);
        let first = editor.body().children(editor.body().root())[0];
        editor.select_element(first).unwrap();
        assert_eq!(
            editor.state().mode(),
            EditorMode::ZoneEditing(MarginZone::Header)
        );

        editor.exit_zone();
        assert_eq!(editor.state().selected_element, None);
        assert_eq!(editor.state().mode(), EditorMode::Idle);

        // Delete no longer reaches the element picked during zone editing.
        assert!(!editor.key_down(&KeyEvent::new(Key::Delete, Focus::Body)));
        assert_eq!(editor.clean_html(), THREE_PAGES);
    }

    #[test]
    fn repagination_keeps_the_arena_bounded() {
        let mut editor = editor();
        editor.load_html(THREE_PAGES).unwrap();
        editor.body_changed();
        let settled = editor.body().arena_len();
        for _ in 0..1000 {
            editor.repaginate();
            editor.body_changed();
        }
        assert_eq!(editor.body().arena_len(), settled);
        assert_eq!(editor.page_count(), 3);
    }

    #[test]
    fn reclaim_keeps_the_selected_element() {
        let mut editor = editor();
        editor.load_html(THREE_PAGES).unwrap();
        let first = editor.body().children(editor.body().root())[0];
        let html = editor.body().outer_html(first);
        editor.select_element(first).unwrap();
        editor.edit_body(|body| body.remove(first));
        editor.repaginate();
        assert_eq!(editor.body().outer_html(first), html);
    }

    #[test]
    fn find_replace_toggles() {
        let mut editor = editor();
        let ctrl_h = KeyEvent::new(Key::Char('h'), Focus::Body).with_ctrl();
        editor.key_down(&ctrl_h);
        editor.key_down(&ctrl_h);
        assert_eq!(editor.host().find_replace, vec![true, false]);
    }

    #[test]
    fn undo_restores_without_recording() {
        let mut editor = editor();
        editor.load_html(THREE_PAGES).unwrap();
        let first = editor.body().children(editor.body().root())[0];
        editor.select_element(first).unwrap();
        editor.key_down(&KeyEvent::new(Key::Delete, Focus::Body));

        let undo = KeyEvent::new(Key::Char('z'), Focus::Body).with_ctrl();
        editor.key_down(&undo);
        assert_eq!(editor.clean_html(), THREE_PAGES);
        assert_eq!(editor.page_count(), 3);
        assert!(editor.history().can_redo());

        let redo = KeyEvent::new(Key::Char('y'), Focus::Body).with_ctrl();
        editor.key_down(&redo);
        assert_eq!(editor.page_count(), 2);
    }

    #[test]
    fn zones_exit_with_notification() {
        let mut editor = editor();
        editor.load_zone_html(MarginZone::Header, "<p>Title</p>").unwrap();
        assert!(editor.enter_zone(MarginZone::Header));
        assert!(!editor.enter_zone(MarginZone::Header));
        assert_eq!(editor.state().focus, Focus::Zone(MarginZone::Header));

        assert!(editor.enter_zone(MarginZone::Footer));
        assert_eq!(
            editor.host().zones,
            vec![(MarginZone::Header, "<p>Title</p>".to_string())]
        );
        assert_eq!(editor.exit_zone(), Some(MarginZone::Footer));
        assert_eq!(editor.exit_zone(), None);
        assert_eq!(editor.state().focus, Focus::Body);
    }

    #[test]
    fn render_zone_fills_page_numbers() {
        let mut editor = editor();
        editor.load_html(THREE_PAGES).unwrap();
        editor
            .load_zone_html(
                MarginZone::Footer,
                r#"<span data-variable="page"></span>/<span data-variable="pages"></span>"#,
            )
            .unwrap();
        assert_eq!(
            editor.render_zone(MarginZone::Footer, 2).unwrap(),
            r#"<span data-variable="page">2</span>/<span data-variable="pages">3</span>"#
        );
    }

    #[test]
    fn scroll_is_debounced() {
        let mut editor = editor();
        editor.load_html(THREE_PAGES).unwrap();
        let stride = editor.config().page_visual_height();
        editor.scroll(stride * 0.5);
        editor.scroll(stride * 1.2);
        assert_eq!(editor.advance(Duration::from_millis(50)), 0);
        assert_eq!(editor.current_page(), 1);
        assert_eq!(editor.advance(Duration::from_millis(50)), 1);
        assert_eq!(editor.current_page(), 2);
        assert_eq!(editor.host().pages.last(), Some(&(2, 3)));
    }

    #[test]
    fn zoom_change_repaginates_and_recomputes_page() {
        let mut editor = editor();
        editor.load_html(THREE_PAGES).unwrap();
        let stride = editor.config().page_visual_height();
        editor.scroll(stride * 1.5);
        editor.advance(Duration::from_millis(100));
        assert_eq!(editor.current_page(), 2);

        let zoomed = editor.config().with_zoom(200.0);
        assert_eq!(editor.set_config(zoomed), 3);
        assert_eq!(editor.current_page(), 1);
    }

    #[test]
    fn teardown_cancels_and_disables() {
        let mut editor = editor();
        editor.load_html(THREE_PAGES).unwrap();
        editor.scroll(2000.0);
        editor.edit_body(|surface| {
            let spacer = surface.page_spacers()[0];
            surface.remove(spacer);
        });
        assert_eq!(editor.pending_tasks(), 2);

        editor.teardown();
        assert!(editor.is_torn_down());
        assert_eq!(editor.pending_tasks(), 0);
        assert_eq!(editor.tick_frame(), 0);
        assert_eq!(editor.edit_body(|_| ()), None);
        assert!(!editor.key_down(&KeyEvent::new(Key::Tab, Focus::Body)));
        assert_eq!(editor.repaginate(), 3);
    }
}
