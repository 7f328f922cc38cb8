//! # Self-Healing Observer
//!
//! Page spacers live inside the editable surface, so the user can destroy
//! them: select-all and delete, paste over a range, cut across a page
//! boundary. None of those go through the editor's input handlers.
//!
//! The observer watches child-list changes on the surface root. When a
//! removed node turns out to be a spacer it asks for one repair pass on the
//! next animation frame. Any further spacer removals before that frame fold
//! into the same pass. Changes made while pagination itself is writing are
//! ignored, otherwise every pass would schedule the next one.
//!
//! The repair runs a frame late on purpose: a destructive edit may leave the
//! page layout visibly wrong for one frame.

use tracing::debug;

use crate::scheduler::TaskHandle;
use crate::surface::{MutationRecord, Surface, SubscriptionId};

#[derive(Debug)]
pub struct SelfHealingObserver {
    subscription: SubscriptionId,
    updating: bool,
    pending: Option<TaskHandle>,
}

impl SelfHealingObserver {
    /// Start observing `surface`.
    pub fn observe(surface: &mut Surface) -> Self {
        Self {
            subscription: surface.subscribe(),
            updating: false,
            pending: None,
        }
    }

    pub fn disconnect(&mut self, surface: &mut Surface) {
        surface.unsubscribe(self.subscription);
        self.pending = None;
    }

    /// Mark the start of a self-inflicted update. Changes collected until
    /// [`end_update`](Self::end_update) are discarded.
    pub fn begin_update(&mut self) {
        self.updating = true;
    }

    pub fn end_update(&mut self, surface: &mut Surface) {
        let own = surface.take_records(self.subscription);
        debug!(records = own.len(), "discarding pagination's own changes");
        self.updating = false;
    }

    pub fn is_updating(&self) -> bool {
        self.updating
    }

    /// Drain queued changes. Returns `true` when a repair pass should be
    /// scheduled; the caller then hands the task handle back through
    /// [`repair_scheduled`](Self::repair_scheduled).
    pub fn collect(&mut self, surface: &mut Surface) -> bool {
        let records = surface.take_records(self.subscription);
        if self.updating {
            return false;
        }
        if !spacer_removed(surface, &records) {
            return false;
        }
        if self.pending.is_some() {
            debug!("spacer removed, repair already pending");
            return false;
        }
        debug!("spacer removed by an edit, scheduling repair");
        true
    }

    pub fn repair_scheduled(&mut self, handle: TaskHandle) {
        self.pending = Some(handle);
    }

    /// The repair for `handle` is running (or was cancelled).
    pub fn repair_started(&mut self, handle: TaskHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }

    pub fn pending_repair(&self) -> Option<TaskHandle> {
        self.pending
    }
}

fn spacer_removed(surface: &Surface, records: &[MutationRecord]) -> bool {
    records
        .iter()
        .filter(|r| r.target == surface.root())
        .flat_map(|r| r.removed.iter())
        .any(|&id| surface.is_page_spacer(id))
}
