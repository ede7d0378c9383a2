/*!
 * Arena-backed document model for chapter markup.
 *
 * Chapters are parsed into a flat `Vec` of nodes addressed by `NodeId`. Element
 * children are stored as id lists, so an extraction pass can hand out ids and a
 * later reinsertion pass can mutate exactly those nodes without holding references
 * into the tree.
 *
 * Parsing is permissive: unmatched end tags are ignored, HTML void elements do not
 * need to be closed, unclosed elements are closed at end of input and HTML named
 * entities are resolved. Only input the tokenizer cannot read at all is rejected.
 */

use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;

use crate::errors::MarkupError;

/// Stable index of a node inside its `Document`
pub type NodeId = usize;

/// Elements that never have children or an end tag in HTML
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is kept verbatim instead of being unescaped
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Leading XML declaration and DOCTYPE
static PROLOG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(?:<\?xml.*?\?>\s*)?(?:<!DOCTYPE[^\[>]*(?:\[.*?\])?\s*>)?")
        .expect("Invalid prolog regex")
});

/// A node of a parsed chapter
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentNode {
    /// Character data, already unescaped
    Text(String),
    /// An element with its attributes and child ids
    Element(Element),
    /// Comment body without the `<!--`/`-->` delimiters
    Comment(String),
    /// CDATA body without the delimiters
    CData(String),
    /// Markup emitted verbatim (processing instructions, script bodies)
    Raw(String),
}

/// Element node payload
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Tag name as written in the source
    pub name: String,
    /// Attributes in source order; values are kept in their escaped form
    pub attributes: Vec<(String, String)>,
    /// Child node ids in document order
    pub children: Vec<NodeId>,
    /// Whether the source used the `<tag/>` form
    pub self_closing: bool,
}

impl Element {
    /// Lowercased tag name, used for all classification decisions
    pub fn tag(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// Whether this element's tag matches `tag`, ignoring ASCII case
    pub fn is(&self, tag: &str) -> bool {
        self.name.eq_ignore_ascii_case(tag)
    }

    /// Value of an attribute, if present
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// A parsed chapter document
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<DocumentNode>,
    roots: Vec<NodeId>,
}

impl Document {
    /// Parse markup into a document. The input should not contain an XML prolog;
    /// see `split_prolog`.
    pub fn parse(markup: &str) -> Result<Self, MarkupError> {
        let mut reader = Reader::from_str(markup);
        {
            let config = reader.config_mut();
            config.trim_text(false);
            config.check_end_names = false;
            config.allow_unmatched_ends = true;
        }

        let mut doc = Document::default();
        let mut open: Vec<NodeId> = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| MarkupError::Parse(format!("at byte {}: {}", reader.buffer_position(), e)))?;

            match event {
                Event::Eof => break,
                Event::Start(start) => {
                    let element = element_from(&start, false);
                    let is_void = is_void_element(&element.name);
                    let id = doc.push(DocumentNode::Element(element), open.last().copied());
                    if !is_void {
                        open.push(id);
                    }
                }
                Event::Empty(start) => {
                    let element = element_from(&start, true);
                    doc.push(DocumentNode::Element(element), open.last().copied());
                }
                Event::End(end) => {
                    let name = bytes_to_string(end.name().as_ref());
                    let position = open.iter().rposition(|&id| {
                        doc.element(id).is_some_and(|element| element.is(&name))
                    });
                    if let Some(position) = position {
                        open.truncate(position);
                    }
                }
                Event::Text(text) => {
                    let parent = open.last().copied();
                    let in_raw_text = parent
                        .and_then(|id| doc.element(id))
                        .is_some_and(|element| RAW_TEXT_ELEMENTS.iter().any(|tag| element.is(tag)));
                    let node = if in_raw_text {
                        DocumentNode::Raw(bytes_to_string(text.into_inner()))
                    } else {
                        let decoded = text.unescape_with(resolve_html5_entity).map(|s| s.into_owned());
                        DocumentNode::Text(decoded.unwrap_or_else(|_| bytes_to_string(text.into_inner())))
                    };
                    doc.push(node, parent);
                }
                Event::CData(data) => {
                    doc.push(DocumentNode::CData(bytes_to_string(data.into_inner())), open.last().copied());
                }
                Event::Comment(comment) => {
                    doc.push(DocumentNode::Comment(bytes_to_string(comment.into_inner())), open.last().copied());
                }
                Event::PI(pi) => {
                    let raw = format!("<?{}{}?>", bytes_to_string(pi.target()), bytes_to_string(pi.content()));
                    doc.push(DocumentNode::Raw(raw), open.last().copied());
                }
                Event::DocType(doctype) => {
                    let raw = format!("<!DOCTYPE {}>", bytes_to_string(doctype.into_inner()));
                    doc.push(DocumentNode::Raw(raw), open.last().copied());
                }
                // A declaration after the prolog has been split off is not meaningful.
                Event::Decl(_) => {}
            }
        }

        Ok(doc)
    }

    fn push(&mut self, node: DocumentNode, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        match parent {
            Some(parent_id) => {
                if let Some(DocumentNode::Element(parent)) = self.nodes.get_mut(parent_id) {
                    parent.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        id
    }

    /// Top-level node ids in document order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&DocumentNode> {
        self.nodes.get(id)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.nodes.get(id) {
            Some(DocumentNode::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// Text of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id) {
            Some(DocumentNode::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Replace the content of a text node
    pub fn set_text(&mut self, id: NodeId, content: String) -> bool {
        match self.nodes.get_mut(id) {
            Some(DocumentNode::Text(text)) => {
                *text = content;
                true
            }
            _ => false,
        }
    }

    /// Children of an element, or the roots when `id` is `None`
    pub fn children(&self, id: Option<NodeId>) -> &[NodeId] {
        match id {
            Some(id) => self.element(id).map(|e| e.children.as_slice()).unwrap_or(&[]),
            None => &self.roots,
        }
    }

    /// First element with the given tag in document order
    pub fn find_element(&self, tag: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(element) = self.element(id) {
                if element.is(tag) {
                    return Some(id);
                }
                stack.extend(element.children.iter().rev());
            }
        }
        None
    }

    /// All descendant ids of `root` (or of the whole document) in document order
    pub fn descendants(&self, root: Option<NodeId>) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(element) = self.element(id) {
                stack.extend(element.children.iter().rev());
            }
        }
        out
    }

    /// Concatenated text of every text node under `root`
    pub fn text_content(&self, root: Option<NodeId>) -> String {
        let mut out = String::new();
        if let Some(text) = root.and_then(|id| self.text(id)) {
            out.push_str(text);
        }
        for id in self.descendants(root) {
            if let Some(text) = self.text(id) {
                out.push_str(text);
            }
        }
        out
    }

    /// Serialize the document back to markup, keeping each element's source form
    pub fn serialize(&self) -> String {
        self.serialize_with(false)
    }

    /// Serialize with every void element in the XHTML `<tag ... />` form
    pub fn serialize_xhtml(&self) -> String {
        self.serialize_with(true)
    }

    fn serialize_with(&self, xhtml: bool) -> String {
        let mut out = String::with_capacity(self.nodes.len() * 16);
        for &id in &self.roots {
            self.write_node(id, xhtml, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, xhtml: bool, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match node {
            DocumentNode::Text(text) => escape_text_into(out, text),
            DocumentNode::Comment(body) => {
                out.push_str("<!--");
                out.push_str(body);
                out.push_str("-->");
            }
            DocumentNode::CData(body) => {
                out.push_str("<![CDATA[");
                out.push_str(body);
                out.push_str("]]>");
            }
            DocumentNode::Raw(raw) => out.push_str(raw),
            DocumentNode::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for (key, value) in &element.attributes {
                    let quote = if value.contains('"') { '\'' } else { '"' };
                    out.push(' ');
                    out.push_str(key);
                    out.push('=');
                    out.push(quote);
                    out.push_str(value);
                    out.push(quote);
                }

                let is_void = element.children.is_empty() && is_void_element(&element.name);
                if xhtml && is_void {
                    out.push_str(" />");
                    return;
                }
                if element.children.is_empty() && element.self_closing {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                if is_void {
                    return;
                }

                for &child in &element.children {
                    self.write_node(child, xhtml, out);
                }
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
    }
}

/// Split markup into its leading XML declaration/DOCTYPE and the remainder.
///
/// The prolog is returned exactly as found so it can be reattached verbatim.
pub fn split_prolog(markup: &str) -> (&str, &str) {
    let end = PROLOG_REGEX.find(markup).map(|m| m.end()).unwrap_or(0);
    markup.split_at(end)
}

/// Whether `name` is an HTML void element
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|tag| name.eq_ignore_ascii_case(tag))
}

fn element_from(start: &BytesStart<'_>, self_closing: bool) -> Element {
    let mut attributes = Vec::new();
    let mut iter = start.html_attributes();
    iter.with_checks(false);
    for attr in iter.flatten() {
        attributes.push((bytes_to_string(attr.key.as_ref()), bytes_to_string(attr.value.as_ref())));
    }
    Element {
        name: bytes_to_string(start.name().as_ref()),
        attributes,
        children: Vec::new(),
        self_closing,
    }
}

fn escape_text_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn bytes_to_string(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}
