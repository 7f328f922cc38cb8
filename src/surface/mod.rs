//! # Editable Surface
//!
//! The single mutable document tree every component works on. It is a small
//! DOM: elements, text and comments in an arena, addressed by [`NodeId`].
//!
//! Removing a node detaches it but keeps it in the arena, so a handle held
//! by a change record (or by the editor's selection) can still be inspected
//! after the fact. This is what lets the self-healing observer ask "was the
//! node that just disappeared a page spacer?". Detached nodes are freed by
//! [`Surface::reclaim`] once nothing refers to them any more, and their
//! slots are reused for new nodes.
//!
//! Child-list changes are reported as [`MutationRecord`]s, queued separately
//! for every subscriber and drained with [`Surface::take_records`]. Only
//! changes to connected nodes are reported; building a detached fragment is
//! silent until the fragment is inserted.

mod html;

pub use html::is_void;

use crate::error::Result;

/// Attribute that marks a page spacer. Legitimate content never carries it.
pub const SPACER_ATTR: &str = "data-page-spacer";

/// Handle to a node in a [`Surface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Rebuild a handle from [`NodeId::index`], for hosts that keep ids
    /// outside the surface.
    pub fn from_raw(index: usize) -> Self {
        NodeId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element(Element),
    /// Raw (escaped) character data.
    Text(String),
    /// Raw comment body, without the `<!--`/`-->` delimiters.
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    /// Attributes in source order. Values are raw (escaped).
    pub attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    pub fn is_void(&self) -> bool {
        is_void(&self.tag)
    }

    /// A `name:value` declaration from the inline `style` attribute.
    pub fn style_value(&self, property: &str) -> Option<&str> {
        self.attr("style")?.split(';').find_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case(property)
                .then(|| value.trim())
        })
    }
}

/// One child-list change: `added` and `removed` children of `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// Handle returned by [`Surface::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(usize);

/// A caret position. In a text node `offset` counts characters of the raw
/// text; in an element it is a child index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub node: NodeId,
    pub offset: usize,
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Data reported for ids that do not name a node.
static VACANT: NodeData = NodeData::Comment(String::new());

/// The editable document tree.
#[derive(Debug, Clone)]
pub struct Surface {
    slots: Vec<Slot>,
    /// Reclaimed slots, reused before the arena grows.
    free: Vec<usize>,
    root: NodeId,
    attached: bool,
    caret: Option<Caret>,
    queues: Vec<Option<Vec<MutationRecord>>>,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    /// An empty, attached surface.
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                data: NodeData::Element(Element::new("body")),
                parent: None,
                children: Vec::new(),
            }],
            free: Vec::new(),
            root: NodeId(0),
            attached: true,
            caret: None,
            queues: Vec::new(),
        }
    }

    pub fn parse(html: &str) -> Result<Self> {
        let mut surface = Self::new();
        surface.load_html(html)?;
        Ok(surface)
    }

    /// Replace the whole content with `html`. On a parse error the surface is
    /// left untouched.
    pub fn load_html(&mut self, html: &str) -> Result<()> {
        let nodes = self.parse_fragment(html)?;
        let old = std::mem::take(&mut self.slot_mut(self.root).children);
        for &child in &old {
            self.slot_mut(child).parent = None;
        }
        for &node in &nodes {
            self.slot_mut(node).parent = Some(self.root);
        }
        self.slot_mut(self.root).children = nodes.clone();
        self.caret = None;
        self.record(self.root, nodes, old);
        Ok(())
    }

    /// Parse `html` into detached nodes, returned in document order.
    pub fn parse_fragment(&mut self, html: &str) -> Result<Vec<NodeId>> {
        html::parse_fragment(self, html)
    }

    /// Serialized content (the root's inner HTML).
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for &child in self.children(self.root) {
            html::write_node(self, child, &mut out);
        }
        out
    }

    /// Outer HTML of a single node.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        html::write_node(self, id, &mut out);
        out
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether the surface is mounted. Detached surfaces keep their content
    /// but the engine treats them as unavailable.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    /// Node data. Unknown ids read as an empty comment.
    pub fn data(&self, id: NodeId) -> &NodeData {
        self.slots.get(id.0).map_or(&VACANT, |s| &s.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.slots.get(id.0)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.slots.get_mut(id.0)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.slots.get(id.0)?.data {
            NodeData::Text(raw) => Some(raw),
            _ => None,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slots.get(id.0).map_or(&[], |s| s.children.as_slice())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id.0).and_then(|s| s.parent)
    }

    /// Whether `id` is reachable from the root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.slots.get(node.0).and_then(|s| s.parent);
        }
        false
    }

    /// Whether `node` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.slots.get(n.0).and_then(|s| s.parent);
        }
        false
    }

    pub fn is_page_spacer(&self, id: NodeId) -> bool {
        self.element(id)
            .is_some_and(|el| el.attr(SPACER_ATTR).is_some())
    }

    /// Every connected page spacer, in document order.
    pub fn page_spacers(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.is_page_spacer(id))
            .collect()
    }

    /// `id` and everything below it, pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// Concatenated raw text below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.push_slot(NodeData::Element(element))
    }

    pub fn create_text(&mut self, raw: impl Into<String>) -> NodeId {
        self.push_slot(NodeData::Text(raw.into()))
    }

    pub fn create_comment(&mut self, raw: impl Into<String>) -> NodeId {
        self.push_slot(NodeData::Comment(raw.into()))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` under `parent` before `reference` (or last when
    /// `reference` is `None` or not a child of `parent`). A child that
    /// already has a parent is moved.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let known = parent.0 < self.slots.len() && child.0 < self.slots.len();
        if !known || child == parent || self.contains(child, parent) {
            return;
        }
        self.remove(child);
        let siblings = &self.slot(parent).children;
        let index = reference
            .and_then(|r| siblings.iter().position(|&c| c == r))
            .unwrap_or(siblings.len());
        self.slot_mut(parent).children.insert(index, child);
        self.slot_mut(child).parent = Some(parent);
        self.record(parent, vec![child], Vec::new());
    }

    /// Detach `id` from its parent. Returns `false` if it had none.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.slots.get(id.0).and_then(|s| s.parent) else {
            return false;
        };
        self.slot_mut(parent).children.retain(|&c| c != id);
        self.slot_mut(id).parent = None;
        if let Some(caret) = self.caret {
            if self.contains(id, caret.node) {
                self.caret = None;
            }
        }
        self.record(parent, Vec::new(), vec![id]);
        true
    }

    /// Free every node that is not connected, not in `keep`, not the
    /// caret's node and not named by a queued change record (subtrees of
    /// those stay too). Returns how many slots were freed.
    ///
    /// Handles to freed nodes must not be used afterwards: their slots are
    /// handed out again by the `create_*` methods.
    pub fn reclaim(&mut self, keep: &[NodeId]) -> usize {
        let mut held: Vec<NodeId> = vec![self.root];
        held.extend_from_slice(keep);
        held.extend(self.caret.map(|c| c.node));
        for queue in self.queues.iter().flatten() {
            for record in queue {
                held.push(record.target);
                held.extend_from_slice(&record.added);
                held.extend_from_slice(&record.removed);
            }
        }

        let mut live = vec![false; self.slots.len()];
        for id in held {
            if id.0 < live.len() && !live[id.0] {
                for node in self.descendants(id) {
                    live[node.0] = true;
                }
            }
        }

        let mut vacant = vec![false; self.slots.len()];
        for &index in &self.free {
            vacant[index] = true;
        }
        self.free.clear();

        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if live[index] {
                // A held node inside a freed subtree becomes a detached root.
                if slot.parent.is_some_and(|p| !live[p.0]) {
                    slot.parent = None;
                }
                continue;
            }
            if !vacant[index] {
                freed += 1;
                slot.data = VACANT.clone();
                slot.parent = None;
                slot.children = Vec::new();
            }
            self.free.push(index);
        }
        freed
    }

    /// Number of slots in the arena, live or free.
    pub fn arena_len(&self) -> usize {
        self.slots.len()
    }

    // ── Change records ───────────────────────────────────────────

    pub fn subscribe(&mut self) -> SubscriptionId {
        self.queues.push(Some(Vec::new()));
        SubscriptionId(self.queues.len() - 1)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        if let Some(queue) = self.queues.get_mut(id.0) {
            *queue = None;
        }
    }

    /// Drain the records queued for `id` since the last call.
    pub fn take_records(&mut self, id: SubscriptionId) -> Vec<MutationRecord> {
        self.queues
            .get_mut(id.0)
            .and_then(|q| q.as_mut())
            .map(std::mem::take)
            .unwrap_or_default()
    }

    fn record(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        if (added.is_empty() && removed.is_empty()) || !self.is_connected(target) {
            return;
        }
        let record = MutationRecord {
            target,
            added,
            removed,
        };
        for queue in self.queues.iter_mut().flatten() {
            queue.push(record.clone());
        }
    }

    // ── Caret and insertion ──────────────────────────────────────

    pub fn caret(&self) -> Option<Caret> {
        self.caret.filter(|c| self.is_valid_caret(*c))
    }

    pub fn set_caret(&mut self, caret: Option<Caret>) {
        self.caret = caret;
    }

    /// Caret after the last child of the root.
    pub fn end_caret(&self) -> Caret {
        Caret {
            node: self.root,
            offset: self.children(self.root).len(),
        }
    }

    fn is_valid_caret(&self, caret: Caret) -> bool {
        if caret.node.0 >= self.slots.len() || !self.is_connected(caret.node) {
            return false;
        }
        match self.data(caret.node) {
            NodeData::Text(raw) => caret.offset <= raw.chars().count(),
            NodeData::Element(_) => caret.offset <= self.children(caret.node).len(),
            NodeData::Comment(_) => false,
        }
    }

    /// Insert detached `nodes` at `caret`, splitting a text node if the caret
    /// is inside one. Returns the caret just after the inserted nodes.
    pub fn insert_at(&mut self, caret: Caret, nodes: &[NodeId]) -> Caret {
        let caret = if self.is_valid_caret(caret) {
            caret
        } else {
            self.end_caret()
        };
        let (parent, index) = match self.data(caret.node).clone() {
            NodeData::Text(raw) => {
                let Some(parent) = self.parent(caret.node) else {
                    return caret;
                };
                let position = self.child_index(parent, caret.node);
                let split = snap_out_of_reference(&raw, char_to_byte(&raw, caret.offset));
                if split == 0 {
                    (parent, position)
                } else if split >= raw.len() {
                    (parent, position + 1)
                } else {
                    let (left, right) = raw.split_at(split);
                    let right = self.create_text(right.to_string());
                    self.slot_mut(caret.node).data = NodeData::Text(left.to_string());
                    let next = self.children(parent).get(position + 1).copied();
                    self.insert_before(parent, right, next);
                    (parent, position + 1)
                }
            }
            _ => (caret.node, caret.offset),
        };

        let mut index = index;
        for &node in nodes {
            let reference = self.children(parent).get(index).copied();
            self.insert_before(parent, node, reference);
            index = self.child_index(parent, node) + 1;
        }
        Caret {
            node: parent,
            offset: index,
        }
    }

    /// Insert `nodes` at the current caret (or at the end when there is
    /// none) and leave the caret after them.
    pub fn insert_at_cursor(&mut self, nodes: &[NodeId]) -> Caret {
        let at = self.caret().unwrap_or_else(|| self.end_caret());
        let after = self.insert_at(at, nodes);
        self.caret = Some(after);
        after
    }

    /// Insert raw text at the caret, merging into the text node the caret is
    /// in when there is one.
    pub fn insert_text_at_cursor(&mut self, raw: &str) {
        if let Some(caret) = self.caret() {
            if let NodeData::Text(existing) = &mut self.slots[caret.node.0].data {
                let at = snap_out_of_reference(existing, char_to_byte(existing, caret.offset));
                existing.insert_str(at, raw);
                let offset = existing[..at + raw.len()].chars().count();
                self.caret = Some(Caret {
                    node: caret.node,
                    offset,
                });
                return;
            }
        }
        let text = self.create_text(raw.to_string());
        self.insert_at_cursor(&[text]);
        self.caret = Some(Caret {
            node: text,
            offset: raw.chars().count(),
        });
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> usize {
        self.children(parent)
            .iter()
            .position(|&c| c == child)
            .unwrap_or(self.children(parent).len())
    }

    fn push_slot(&mut self, data: NodeData) -> NodeId {
        let slot = Slot {
            data,
            parent: None,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = slot;
                NodeId(index)
            }
            None => {
                self.slots.push(slot);
                NodeId(self.slots.len() - 1)
            }
        }
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.0]
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        &mut self.slots[id.0]
    }
}

fn char_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

/// Move a byte index that falls inside a character reference (`&nbsp;`) to
/// just after it.
fn snap_out_of_reference(raw: &str, at: usize) -> usize {
    let before = &raw[..at];
    let Some(amp) = before.rfind('&') else {
        return at;
    };
    if before[amp..].contains(|c: char| c == ';' || c.is_whitespace()) {
        return at;
    }
    match raw[at..].find(';') {
        Some(semi) if !raw[at..at + semi].contains(char::is_whitespace) => at + semi + 1,
        _ => at,
    }
}
