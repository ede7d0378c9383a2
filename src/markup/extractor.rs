/*!
 * Paragraph-level text extraction from chapter markup.
 *
 * The extractor walks the document body once, collecting text into `TextBlock`s.
 * Block-level elements open a new paragraph before and after their content; inline
 * content joins the running paragraph. Each block remembers the ids of the text
 * nodes that contributed to it so translations can later be written back into the
 * same nodes.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::dom::{Document, DocumentNode, NodeId, split_prolog};
use crate::errors::{Degraded, Diagnostic};

/// Elements whose subtree never contains translatable prose
const SKIP_TAGS: &[&str] = &["script", "style", "meta", "title", "nav", "head", "template"];

/// Elements that start and end a paragraph
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "br", "section", "article", "blockquote",
    "pre", "ul", "ol", "dl", "dt", "dd", "table", "tr", "td", "th", "figure", "figcaption",
    "header", "footer", "aside", "main", "hr", "body",
];

/// A blank line inside one text node; block text never contains one
static BLANK_LINES_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\n\s*\n\s*").expect("Invalid blank line regex"));

/// Headings kept when a page is classified as navigation
const NAVIGATION_HEADINGS: &[&str] = &["h1", "h2", "h3"];

/// Each link is weighted as this many characters of text
const LINK_WEIGHT_CHARS: usize = 20;

/// Link density above which a page counts as navigation
const NAVIGATION_DENSITY: f64 = 0.5;

/// Minimum number of links on a navigation page
const NAVIGATION_MIN_LINKS: usize = 5;

/// What to do with text inside `<a>` elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkTextPolicy {
    /// Link text is part of the running paragraph
    #[default]
    Include,
    /// Link text is left out of extraction and keeps its original wording
    Exclude,
}

/// Rules applied while extracting a chapter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionPolicy {
    /// Handling of anchor text
    pub link_text: LinkTextPolicy,
}

impl ExtractionPolicy {
    pub fn new(link_text: LinkTextPolicy) -> Self {
        Self { link_text }
    }
}

/// A logical paragraph of extracted text
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    /// Position in extraction order
    pub sequence_index: usize,
    /// Trimmed, non-empty paragraph text
    pub text: String,
    /// Text nodes that contributed to this block, in document order
    pub source_nodes: Vec<NodeId>,
}

/// Result of extracting a chapter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Paragraphs in document order
    pub blocks: Vec<TextBlock>,
    /// Whether the page is mostly links and should be passed through untranslated
    pub is_navigation_page: bool,
}

impl Extraction {
    /// Blocks joined with blank lines, the form sent for translation
    pub fn joined_text(&self) -> String {
        self.blocks
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Total characters over all blocks
    pub fn char_count(&self) -> usize {
        self.blocks.iter().map(|block| block.text.chars().count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Extract paragraph text from chapter markup.
///
/// A document that cannot be parsed yields an empty extraction wrapped in `Degraded`
/// with a `ParseFailure` diagnostic.
pub fn extract_text(markup: &str, policy: &ExtractionPolicy) -> Result<Extraction, Degraded<Extraction>> {
    let (_, body) = split_prolog(markup);
    match Document::parse(body) {
        Ok(doc) => Ok(extract_from_document(&doc, policy)),
        Err(e) => Err(Degraded::new(
            Extraction::default(),
            Diagnostic::ParseFailure(e.to_string()),
        )),
    }
}

/// Extract paragraph text from an already parsed document
pub fn extract_from_document(doc: &Document, policy: &ExtractionPolicy) -> Extraction {
    let root = doc.find_element("body");

    if is_navigation_page(doc, root) {
        debug!("Document classified as navigation page");
        return Extraction {
            blocks: extract_headings(doc, root),
            is_navigation_page: true,
        };
    }

    let mut walker = BlockWalker::new(doc, policy);
    match root {
        Some(body) => walker.visit(body),
        None => {
            for &id in doc.roots() {
                walker.visit(id);
            }
        }
    }

    Extraction {
        blocks: walker.finish(),
        is_navigation_page: false,
    }
}

/// Link density check: `links * 20 / text_chars > 0.5` with more than five links
fn is_navigation_page(doc: &Document, root: Option<NodeId>) -> bool {
    let link_count = doc
        .descendants(root)
        .into_iter()
        .filter(|&id| doc.element(id).is_some_and(|element| element.is("a")))
        .count();
    if link_count <= NAVIGATION_MIN_LINKS {
        return false;
    }

    let text_chars = doc.text_content(root).trim().chars().count();
    if text_chars == 0 {
        return true;
    }
    let density = (link_count * LINK_WEIGHT_CHARS) as f64 / text_chars as f64;
    density > NAVIGATION_DENSITY
}

fn extract_headings(doc: &Document, root: Option<NodeId>) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    for id in doc.descendants(root) {
        let Some(element) = doc.element(id) else {
            continue;
        };
        if !NAVIGATION_HEADINGS.iter().any(|tag| element.is(tag)) {
            continue;
        }
        let source_nodes: Vec<NodeId> = doc
            .descendants(Some(id))
            .into_iter()
            .filter(|&child| doc.text(child).is_some_and(|t| !t.trim().is_empty()))
            .collect();
        let text = source_nodes
            .iter()
            .filter_map(|&child| doc.text(child))
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(" ");
        if !text.is_empty() {
            blocks.push(TextBlock {
                sequence_index: blocks.len(),
                text,
                source_nodes,
            });
        }
    }
    blocks
}

/// Paragraph under construction
#[derive(Default)]
struct OpenBlock {
    text: String,
    nodes: Vec<NodeId>,
}

struct BlockWalker<'a> {
    doc: &'a Document,
    policy: &'a ExtractionPolicy,
    blocks: Vec<OpenBlock>,
}

impl<'a> BlockWalker<'a> {
    fn new(doc: &'a Document, policy: &'a ExtractionPolicy) -> Self {
        Self {
            doc,
            policy,
            blocks: Vec::new(),
        }
    }

    fn visit(&mut self, id: NodeId) {
        let Some(node) = self.doc.node(id) else {
            return;
        };
        match node {
            DocumentNode::Text(text) => self.push_text(id, text),
            DocumentNode::Element(element) => {
                let tag = element.tag();
                if SKIP_TAGS.contains(&tag.as_str()) {
                    return;
                }
                if tag == "a" && self.policy.link_text == LinkTextPolicy::Exclude {
                    return;
                }

                let is_block = BLOCK_TAGS.contains(&tag.as_str());
                if is_block {
                    self.break_paragraph();
                }
                for &child in &element.children {
                    self.visit(child);
                }
                if is_block {
                    self.break_paragraph();
                }
            }
            DocumentNode::Comment(_) | DocumentNode::CData(_) | DocumentNode::Raw(_) => {}
        }
    }

    fn push_text(&mut self, id: NodeId, text: &str) {
        let fragment = text.trim();
        if fragment.is_empty() {
            return;
        }
        let fragment = BLANK_LINES_REGEX.replace_all(fragment, "\n");
        match self.blocks.last_mut() {
            Some(block) => {
                if !block.text.is_empty() && !block.text.ends_with(char::is_whitespace) {
                    block.text.push(' ');
                }
                block.text.push_str(&fragment);
                block.nodes.push(id);
            }
            None => self.blocks.push(OpenBlock {
                text: fragment.to_string(),
                nodes: vec![id],
            }),
        }
    }

    /// Close the open block if it holds any content
    fn break_paragraph(&mut self) {
        if self.blocks.last().is_some_and(|block| !block.text.trim().is_empty()) {
            self.blocks.push(OpenBlock::default());
        }
    }

    fn finish(self) -> Vec<TextBlock> {
        self.blocks
            .into_iter()
            .filter_map(|block| {
                let text = block.text.trim();
                (!text.is_empty()).then(|| (text.to_string(), block.nodes))
            })
            .enumerate()
            .map(|(sequence_index, (text, source_nodes))| TextBlock {
                sequence_index,
                text,
                source_nodes,
            })
            .collect()
    }
}
