use serde::{Deserialize, Serialize};

use crate::surface::NodeId;
use crate::zones::{ContainerRect, MarginZone, Zone};

/// Where keyboard focus currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Focus {
    #[default]
    Body,
    Zone(MarginZone),
    /// A plain `<input>` or `<textarea>` outside the surface.
    TextInput,
    Elsewhere,
}

/// Interaction mode, derived from [`EditorState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Idle,
    ZoneEditing(MarginZone),
    ElementSelected,
}

/// UI state of one editor instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    /// Header or footer currently in edit mode.
    pub editing_zone: Option<MarginZone>,
    /// Zone highlighted during a drag.
    pub drag_zone: Option<Zone>,
    /// Body element picked as a whole (image, table).
    pub selected_element: Option<NodeId>,
    pub focus: Focus,
    pub find_replace_open: bool,
    pub total_pages: usize,
    pub current_page: usize,
    /// Drop container box in viewport pixels.
    pub container: ContainerRect,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            editing_zone: None,
            drag_zone: None,
            selected_element: None,
            focus: Focus::Body,
            find_replace_open: false,
            total_pages: 1,
            current_page: 1,
            container: ContainerRect::default(),
        }
    }
}

impl EditorState {
    /// Zone editing takes precedence over a body selection.
    pub fn mode(&self) -> EditorMode {
        match (self.editing_zone, self.selected_element) {
            (Some(zone), _) => EditorMode::ZoneEditing(zone),
            (None, Some(_)) => EditorMode::ElementSelected,
            (None, None) => EditorMode::Idle,
        }
    }
}
