/*!
 * Writes aligned translations back into chapter markup.
 *
 * The chapter is parsed again and re-extracted with the same policy, which recovers the
 * text nodes behind every block. Each block's translation is then spread over those nodes,
 * leaving tags, attributes, images and links as they were.
 */

use log::{debug, warn};

use super::dom::{Document, NodeId, split_prolog};
use super::extractor::{ExtractionPolicy, extract_from_document};
use crate::errors::{Degraded, Diagnostic, MarkupError};
use crate::translation::aligner::{AlignmentResult, split_proportionally};

/// Replace the text of every mapped block with its translation.
///
/// On any failure the original markup is returned unchanged inside `Degraded`.
pub fn reinsert_translations(
    markup: &str,
    alignment: &AlignmentResult,
    policy: &ExtractionPolicy,
) -> Result<String, Degraded<String>> {
    try_reinsert(markup, alignment, policy).map_err(|e| {
        warn!("Reinsertion failed, keeping original markup: {}", e);
        Degraded::new(markup.to_string(), Diagnostic::ReinsertionFailure(e.to_string()))
    })
}

fn try_reinsert(
    markup: &str,
    alignment: &AlignmentResult,
    policy: &ExtractionPolicy,
) -> Result<String, MarkupError> {
    let (prolog, body) = split_prolog(markup);
    let mut doc = Document::parse(body)?;
    let extraction = extract_from_document(&doc, policy);

    let available = extraction.blocks.len();
    if let Some(&index) = alignment.translations.keys().find(|&&index| index >= available) {
        return Err(MarkupError::UnknownBlock { index, available });
    }

    for block in &extraction.blocks {
        let Some(translation) = alignment.translations.get(&block.sequence_index) else {
            continue;
        };
        debug!(
            "Reinserting block {} across {} text nodes",
            block.sequence_index,
            block.source_nodes.len()
        );
        write_block(&mut doc, &block.source_nodes, translation.trim());
    }

    Ok(format!("{}{}", prolog, doc.serialize_xhtml()))
}

/// Split `translation` over the nodes in proportion to each node's trimmed length
fn write_block(doc: &mut Document, nodes: &[NodeId], translation: &str) {
    let originals: Vec<String> = nodes
        .iter()
        .map(|&id| doc.text(id).unwrap_or_default().to_string())
        .collect();
    let weights: Vec<usize> = originals.iter().map(|text| text.trim().chars().count()).collect();
    let slices = split_proportionally(translation, &weights);

    for ((&id, original), slice) in nodes.iter().zip(&originals).zip(slices) {
        let (leading, trailing) = surrounding_whitespace(original);
        doc.set_text(id, format!("{}{}{}", leading, slice, trailing));
    }
}

fn surrounding_whitespace(text: &str) -> (&str, &str) {
    let leading_len = text.len() - text.trim_start().len();
    if leading_len == text.len() {
        return (text, "");
    }
    let trailing_len = text.len() - text.trim_end().len();
    (&text[..leading_len], &text[text.len() - trailing_len..])
}
