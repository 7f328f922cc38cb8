//! Lenient HTML reading and writing for the editable surface.
//!
//! Editors emit HTML, not XML: void elements without a slash, valueless
//! attributes, stray closing tags. The reader is quick-xml with end-name
//! checking off plus a small amount of HTML knowledge layered on top.
//!
//! Text and attribute values are stored exactly as they appear in the
//! source (still escaped). Writing them back verbatim keeps the
//! parse → serialize trip byte-stable for normalized markup.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{Element, NodeData, NodeId, Surface};
use crate::error::{FolioError, Result};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Whether `tag` never has children or a closing tag in HTML.
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Parse `html` into detached nodes owned by `surface`. Returns the
/// top-level nodes in document order.
pub(super) fn parse_fragment(surface: &mut Surface, html: &str) -> Result<Vec<NodeId>> {
    let mut reader = Reader::from_str(html);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }

    let mut roots = Vec::new();
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        let position = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|source| FolioError::Markup { position, source })?;

        match event {
            Event::Start(e) => {
                let element = element_from(&e);
                let void = element.is_void();
                let id = surface.create_element(element);
                attach(surface, &stack, &mut roots, id);
                if !void {
                    stack.push(id);
                }
            }
            Event::Empty(e) => {
                let id = surface.create_element(element_from(&e));
                attach(surface, &stack, &mut roots, id);
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if is_void(&name) {
                    continue;
                }
                // Close the nearest matching open element, implicitly closing
                // anything opened inside it. Unmatched ends are ignored.
                let open = stack.iter().rposition(|id| {
                    surface
                        .element(*id)
                        .is_some_and(|el| el.tag.eq_ignore_ascii_case(&name))
                });
                if let Some(pos) = open {
                    stack.truncate(pos);
                }
            }
            Event::Text(t) => {
                let raw = String::from_utf8_lossy(&t).into_owned();
                if !raw.is_empty() {
                    let id = surface.create_text(raw);
                    attach(surface, &stack, &mut roots, id);
                }
            }
            Event::CData(c) => {
                let raw = format!("<![CDATA[{}]]>", String::from_utf8_lossy(&c));
                let id = surface.create_text(raw);
                attach(surface, &stack, &mut roots, id);
            }
            Event::Comment(c) => {
                let id = surface.create_comment(String::from_utf8_lossy(&c).into_owned());
                attach(surface, &stack, &mut roots, id);
            }
            Event::Eof => break,
            // Declarations, processing instructions and doctypes carry no content.
            _ => {}
        }
    }

    Ok(roots)
}

fn attach(surface: &mut Surface, stack: &[NodeId], roots: &mut Vec<NodeId>, id: NodeId) {
    match stack.last() {
        Some(&parent) => surface.append_child(parent, id),
        None => roots.push(id),
    }
}

fn element_from(e: &BytesStart) -> Element {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let attrs = e
        .html_attributes()
        .filter_map(|a| a.ok())
        .map(|a| {
            (
                String::from_utf8_lossy(a.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&a.value).into_owned(),
            )
        })
        .collect();
    Element { tag, attrs }
}

/// Append the outer HTML of `id` to `out`.
pub(super) fn write_node(surface: &Surface, id: NodeId, out: &mut String) {
    match surface.data(id) {
        NodeData::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                // Values are stored raw; pick the quote the value does not use.
                let quote = if value.contains('"') { '\'' } else { '"' };
                out.push('=');
                out.push(quote);
                out.push_str(value);
                out.push(quote);
            }
            out.push('>');
            if el.is_void() {
                return;
            }
            for &child in surface.children(id) {
                write_node(surface, child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
        NodeData::Text(raw) => out.push_str(raw),
        NodeData::Comment(raw) => {
            out.push_str("<!--");
            out.push_str(raw);
            out.push_str("-->");
        }
    }
}
