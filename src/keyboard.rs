//! # Keyboard Commands
//!
//! One global key listener feeds every key press through [`interpret`],
//! which maps it to a [`KeyCommand`] given the current editor state. The
//! mapping is pure: the editor executes the command and tells the host
//! whether to suppress the default action.
//!
//! Check order matters. Escape and Delete are looked at before any
//! Ctrl/Cmd combination because they arrive with no modifier at all.

use serde::{Deserialize, Serialize};

use crate::editor::{EditorMode, EditorState, Focus};

/// Fixed-width indentation inserted for Tab, as raw markup.
pub const INDENT: &str = "&nbsp;&nbsp;&nbsp;&nbsp;";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    Tab,
    Enter,
    Char(char),
    Other,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            "Delete" | "Del" => Key::Delete,
            "Backspace" => Key::Backspace,
            "Tab" => Key::Tab,
            "Enter" => Key::Enter,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Other,
                }
            }
        }
    }

    fn is_char(self, expected: char) -> bool {
        matches!(self, Key::Char(c) if c.eq_ignore_ascii_case(&expected))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
    /// Where keyboard focus was when the key was pressed.
    pub focus: Focus,
}

impl KeyEvent {
    pub fn new(key: Key, focus: Focus) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            shift: false,
            alt: false,
            focus,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    fn any_modifier(&self) -> bool {
        self.ctrl || self.meta || self.shift || self.alt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyCommand {
    /// Not ours; let the browser handle it.
    PassThrough,
    /// The active zone's own handler deals with it.
    DeferToZone,
    ClearSelection,
    DeleteSelected,
    InsertIndent,
    ToggleFindReplace,
    Undo,
    Redo,
}

impl KeyCommand {
    pub fn prevents_default(self) -> bool {
        !matches!(self, KeyCommand::PassThrough | KeyCommand::DeferToZone)
    }
}

pub fn interpret(event: &KeyEvent, state: &EditorState) -> KeyCommand {
    let mode = state.mode();

    if event.key == Key::Escape {
        return match mode {
            EditorMode::ZoneEditing(_) => KeyCommand::DeferToZone,
            EditorMode::ElementSelected => KeyCommand::ClearSelection,
            EditorMode::Idle => KeyCommand::PassThrough,
        };
    }

    if matches!(event.key, Key::Delete | Key::Backspace) {
        // Text controls keep their own editing, even with an element selected.
        if mode == EditorMode::ElementSelected && event.focus != Focus::TextInput {
            return KeyCommand::DeleteSelected;
        }
        return KeyCommand::PassThrough;
    }

    if event.key == Key::Tab && !event.any_modifier() {
        if event.focus == Focus::Body {
            return KeyCommand::InsertIndent;
        }
        return KeyCommand::PassThrough;
    }

    if !event.command() {
        return KeyCommand::PassThrough;
    }
    if event.key.is_char('h') {
        KeyCommand::ToggleFindReplace
    } else if event.key.is_char('z') {
        if event.shift {
            KeyCommand::Redo
        } else {
            KeyCommand::Undo
        }
    } else if event.key.is_char('y') {
        KeyCommand::Redo
    } else {
        KeyCommand::PassThrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::NodeId;
    use crate::zones::MarginZone;

    fn idle() -> EditorState {
        EditorState::default()
    }

    fn selected() -> EditorState {
        EditorState {
            selected_element: Some(NodeId::from_raw(3)),
            ..EditorState::default()
        }
    }

    fn zone_editing() -> EditorState {
        EditorState {
            editing_zone: Some(MarginZone::Header),
            focus: Focus::Zone(MarginZone::Header),
            ..EditorState::default()
        }
    }

    #[test]
    fn escape_depends_on_mode() {
        let esc = KeyEvent::new(Key::Escape, Focus::Body);
        assert_eq!(interpret(&esc, &idle()), KeyCommand::PassThrough);
        assert_eq!(interpret(&esc, &selected()), KeyCommand::ClearSelection);
        assert_eq!(interpret(&esc, &zone_editing()), KeyCommand::DeferToZone);
        assert!(!KeyCommand::DeferToZone.prevents_default());
    }

    #[test]
    fn delete_removes_selection_outside_inputs() {
        for key in [Key::Delete, Key::Backspace] {
            assert_eq!(
                interpret(&KeyEvent::new(key, Focus::Body), &selected()),
                KeyCommand::DeleteSelected
            );
            assert_eq!(
                interpret(&KeyEvent::new(key, Focus::TextInput), &selected()),
                KeyCommand::PassThrough
            );
            assert_eq!(
                interpret(&KeyEvent::new(key, Focus::Body), &idle()),
                KeyCommand::PassThrough
            );
        }
    }

    #[test]
    fn tab_indents_inside_body_only() {
        let tab = KeyEvent::new(Key::Tab, Focus::Body);
        assert_eq!(interpret(&tab, &idle()), KeyCommand::InsertIndent);
        assert!(KeyCommand::InsertIndent.prevents_default());
        assert_eq!(
            interpret(&tab.with_shift(), &idle()),
            KeyCommand::PassThrough
        );
        assert_eq!(
            interpret(&KeyEvent::new(Key::Tab, Focus::Elsewhere), &idle()),
            KeyCommand::PassThrough
        );
    }

    #[test]
    fn command_shortcuts() {
        let ctrl = |c| KeyEvent::new(Key::Char(c), Focus::Body).with_ctrl();
        assert_eq!(interpret(&ctrl('h'), &zone_editing()), KeyCommand::ToggleFindReplace);
        assert_eq!(interpret(&ctrl('z'), &idle()), KeyCommand::Undo);
        assert_eq!(interpret(&ctrl('Z').with_shift(), &idle()), KeyCommand::Redo);
        assert_eq!(interpret(&ctrl('y'), &idle()), KeyCommand::Redo);
        assert_eq!(
            interpret(&KeyEvent::new(Key::Char('z'), Focus::Body).with_meta(), &idle()),
            KeyCommand::Undo
        );
        assert_eq!(
            interpret(&KeyEvent::new(Key::Char('z'), Focus::Body), &idle()),
            KeyCommand::PassThrough
        );
    }

    #[test]
    fn key_names() {
        assert_eq!(Key::from_name("Escape"), Key::Escape);
        assert_eq!(Key::from_name("z"), Key::Char('z'));
        assert_eq!(Key::from_name("ArrowLeft"), Key::Other);
    }
}
