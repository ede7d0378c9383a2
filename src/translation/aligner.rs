/*!
 * Maps translated paragraphs back onto the extracted blocks of a chapter.
 *
 * Two tiers are used. Containment alignment walks the original paragraphs in order and
 * pairs each block with the translated paragraph at the index of the first original
 * paragraph that contains it (or is contained by it). When the translation has fewer
 * than half as many paragraphs as the source, paragraph structure is considered lost and
 * the whole translated text is instead distributed over the blocks by length.
 */

use std::collections::BTreeMap;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::Diagnostic;
use crate::markup::TextBlock;

/// Blank line, possibly containing spaces
static PARAGRAPH_BREAK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("Invalid paragraph break regex"));

/// Which alignment strategy produced a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentTier {
    /// Paragraph-by-paragraph containment matching
    Containment,
    /// Length-proportional distribution of the whole translation
    Proportional,
}

/// Translations keyed by block `sequence_index`
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentResult {
    pub translations: BTreeMap<usize, String>,
    pub tier: AlignmentTier,
    /// Paragraphs found in the source text
    pub original_paragraphs: usize,
    /// Paragraphs found in the translated text
    pub translated_paragraphs: usize,
    /// Blocks that were given a translation already used for another block
    pub reused: usize,
}

impl AlignmentResult {
    /// A mapping that changes nothing
    pub fn empty() -> Self {
        Self {
            translations: BTreeMap::new(),
            tier: AlignmentTier::Containment,
            original_paragraphs: 0,
            translated_paragraphs: 0,
            reused: 0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.tier == AlignmentTier::Proportional
    }

    /// `AlignmentDegraded` when the proportional fallback was used
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        self.is_degraded().then(|| Diagnostic::AlignmentDegraded {
            original_paragraphs: self.original_paragraphs,
            translated_paragraphs: self.translated_paragraphs,
        })
    }
}

/// Split text into trimmed, non-empty paragraphs on blank lines
pub fn split_paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH_BREAK_REGEX
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Align a chapter's translated text with its extracted blocks
pub fn align_translations(blocks: &[TextBlock], translated_text: &str) -> AlignmentResult {
    let source_text = blocks
        .iter()
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let original = split_paragraphs(&source_text);
    let translated = split_paragraphs(translated_text);

    debug!(
        "Aligning {} blocks: {} original paragraphs, {} translated paragraphs",
        blocks.len(),
        original.len(),
        translated.len()
    );

    if translated.len() * 2 < original.len() {
        warn!(
            "Only {} translated paragraphs for {} original paragraphs, distributing by length",
            translated.len(),
            original.len()
        );
        let (translations, reused) = align_proportionally(blocks, &translated);
        return AlignmentResult {
            translations,
            tier: AlignmentTier::Proportional,
            original_paragraphs: original.len(),
            translated_paragraphs: translated.len(),
            reused,
        };
    }

    let (translations, reused) = align_by_containment(blocks, &original, &translated);
    AlignmentResult {
        translations,
        tier: AlignmentTier::Containment,
        original_paragraphs: original.len(),
        translated_paragraphs: translated.len(),
        reused,
    }
}

fn align_by_containment(
    blocks: &[TextBlock],
    original: &[String],
    translated: &[String],
) -> (BTreeMap<usize, String>, usize) {
    let mut translations = BTreeMap::new();
    let mut cursor = 0;
    let mut last_match: Option<&String> = None;
    let mut reused = 0;

    for block in blocks {
        let block_text = block.text.trim();
        let matched = (cursor..original.len()).find(|&i| {
            let paragraph = original[i].as_str();
            i < translated.len() && (paragraph.contains(block_text) || block_text.contains(paragraph))
        });

        match matched {
            Some(i) => {
                translations.insert(block.sequence_index, translated[i].clone());
                last_match = Some(&translated[i]);
                cursor = i + 1;
            }
            None => match last_match {
                Some(previous) => {
                    debug!("Block {} unmatched, reusing previous translation", block.sequence_index);
                    translations.insert(block.sequence_index, previous.clone());
                    reused += 1;
                }
                None if cursor < translated.len() => {
                    translations.insert(block.sequence_index, translated[cursor].clone());
                    cursor += 1;
                }
                None => debug!("Block {} left untranslated", block.sequence_index),
            },
        }
    }

    (translations, reused)
}

fn align_proportionally(blocks: &[TextBlock], translated: &[String]) -> (BTreeMap<usize, String>, usize) {
    let combined: String = translated.concat();
    let weights: Vec<usize> = blocks.iter().map(|block| block.text.chars().count()).collect();
    let mut slices = split_proportionally(&combined, &weights);

    let mut reused = 0;
    let Some(first_filled) = slices.iter().position(|s| !s.is_empty()) else {
        return (BTreeMap::new(), 0);
    };
    let mut previous = slices[first_filled].clone();
    for slice in slices.iter_mut() {
        if slice.is_empty() {
            *slice = previous.clone();
            reused += 1;
        } else {
            previous = slice.clone();
        }
    }

    let translations = blocks
        .iter()
        .zip(slices)
        .map(|(block, slice)| (block.sequence_index, slice))
        .collect();
    (translations, reused)
}

/// Cut `text` into `weights.len()` consecutive trimmed pieces sized by weight, counted in
/// characters. The last piece runs to the end of the text so nothing is dropped. With all
/// weights zero the first piece takes everything.
pub fn split_proportionally(text: &str, weights: &[usize]) -> Vec<String> {
    if weights.is_empty() {
        return Vec::new();
    }
    let total_weight: usize = weights.iter().sum();
    if total_weight == 0 {
        let mut slices = vec![String::new(); weights.len()];
        slices[0] = text.trim().to_string();
        return slices;
    }

    let chars: Vec<char> = text.chars().collect();
    let mut slices = Vec::with_capacity(weights.len());
    let mut start = 0;
    let mut cumulative = 0;
    for (i, weight) in weights.iter().enumerate() {
        cumulative += weight;
        let end = if i + 1 == weights.len() {
            chars.len()
        } else {
            (chars.len() * cumulative + total_weight / 2) / total_weight
        };
        let end = end.clamp(start, chars.len());
        slices.push(chars[start..end].iter().collect::<String>().trim().to_string());
        start = end;
    }
    slices
}
