/*!
 * Sentence-aware chunking of chapter text.
 *
 * Chapter text arrives as paragraphs separated by blank lines. Paragraphs are packed
 * into chunks of at most `max_chars` characters; a paragraph that alone exceeds the
 * limit is split at sentence boundaries, and a sentence that alone exceeds it is cut
 * at character boundaries. Every chunk records how it attaches to its predecessor so
 * the text can be put back together exactly.
 */

use std::collections::BTreeMap;
use std::ops::Range;

use log::{debug, warn};

use crate::errors::Diagnostic;

/// Separator between paragraphs of chapter text
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Characters that end a sentence
const SENTENCE_TERMINATORS: &[char] = &['。', '！', '？', '.', '!', '?'];

/// Characters that stay attached to the sentence they close
const SENTENCE_CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']', '）', '】', '」', '』', '》'];

/// How a chunk attaches to the chunk before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkJoin {
    /// First chunk of the text
    Start,
    /// Starts a new paragraph
    ParagraphBreak,
    /// Continues the previous chunk's paragraph
    Continuation,
}

impl ChunkJoin {
    /// Text placed between the previous chunk and this one
    pub fn separator(&self) -> &'static str {
        match self {
            ChunkJoin::ParagraphBreak => PARAGRAPH_SEPARATOR,
            ChunkJoin::Start | ChunkJoin::Continuation => "",
        }
    }
}

/// A unit of text sent to the translator
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Position in the chunk sequence
    pub index: usize,
    /// Source text of the chunk
    pub text: String,
    /// Blank-line separated paragraphs of the input this chunk draws from
    pub paragraphs: Range<usize>,
    /// Attachment to the previous chunk
    pub join: ChunkJoin,
}

impl Chunk {
    /// Number of characters in the chunk
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the chunk holds anything worth translating
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Chunks of a text plus the conditions met while producing them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkPlan {
    pub chunks: Vec<Chunk>,
    /// Some sentence exceeded the limit and was cut mid-sentence
    pub hard_cut: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ChunkPlan {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The source text rebuilt from the chunks
    pub fn source_text(&self) -> String {
        reassemble_chunks(&self.chunks, std::iter::empty())
    }
}

/// Split `text` into ordered chunks of at most `max_chars` characters
pub fn chunk_text(text: &str, max_chars: usize) -> ChunkPlan {
    let max_chars = max_chars.max(1);
    let mut builder = PlanBuilder::new(max_chars);

    if text.is_empty() {
        return builder.plan;
    }
    if char_len(text) <= max_chars {
        let paragraphs = text.split(PARAGRAPH_SEPARATOR).count();
        builder.emit(text.to_string(), 0..paragraphs, ChunkJoin::Start);
        return builder.plan;
    }

    for (paragraph_index, paragraph) in text.split(PARAGRAPH_SEPARATOR).enumerate() {
        let join = if paragraph_index == 0 {
            ChunkJoin::Start
        } else {
            ChunkJoin::ParagraphBreak
        };

        if char_len(paragraph) > max_chars {
            builder.flush();
            builder.split_paragraph(paragraph, paragraph_index, join);
        } else {
            builder.accumulate(paragraph, paragraph_index, join);
        }
    }
    builder.flush();

    debug!(
        "Chunked {} chars into {} chunks (limit {})",
        char_len(text),
        builder.plan.chunks.len(),
        max_chars
    );
    builder.plan
}

/// Rebuild text from chunks in index order.
///
/// `pieces` supplies replacement text by chunk index, in any order; chunks without a
/// replacement contribute their source text.
pub fn reassemble_chunks<'a, I>(chunks: &[Chunk], pieces: I) -> String
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    let pieces: BTreeMap<usize, &str> = pieces.into_iter().collect();
    let mut ordered: Vec<&Chunk> = chunks.iter().collect();
    ordered.sort_by_key(|chunk| chunk.index);

    let mut out = String::new();
    for (position, chunk) in ordered.into_iter().enumerate() {
        if position > 0 {
            out.push_str(chunk.join.separator());
        }
        out.push_str(pieces.get(&chunk.index).copied().unwrap_or(&chunk.text));
    }
    out
}

/// Split a paragraph into sentences. Trailing closers and whitespace stay with the
/// sentence they follow and concatenating the result gives back the input.
pub fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        if !SENTENCE_TERMINATORS.contains(&ch) {
            continue;
        }
        // ASCII terminators only end a sentence before whitespace, a closer or the end
        if ch.is_ascii() {
            let ends_here = match chars.peek() {
                None => true,
                Some(&(_, next)) => {
                    next.is_whitespace() || SENTENCE_CLOSERS.contains(&next) || SENTENCE_TERMINATORS.contains(&next)
                }
            };
            if !ends_here {
                continue;
            }
        }
        while let Some(&(_, next)) = chars.peek() {
            if SENTENCE_TERMINATORS.contains(&next) || SENTENCE_CLOSERS.contains(&next) || next.is_whitespace() {
                chars.next();
            } else {
                break;
            }
        }
        let end = chars.peek().map(|&(i, _)| i).unwrap_or(paragraph.len());
        sentences.push(&paragraph[start..end]);
        start = end;
    }
    if start < paragraph.len() {
        sentences.push(&paragraph[start..]);
    }
    sentences
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

struct PlanBuilder {
    max_chars: usize,
    plan: ChunkPlan,
    /// Paragraphs waiting to be emitted together
    pending: Option<(String, Range<usize>, ChunkJoin)>,
}

impl PlanBuilder {
    fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            plan: ChunkPlan::default(),
            pending: None,
        }
    }

    fn emit(&mut self, text: String, paragraphs: Range<usize>, join: ChunkJoin) {
        let index = self.plan.chunks.len();
        self.plan.chunks.push(Chunk {
            index,
            text,
            paragraphs,
            join,
        });
    }

    fn flush(&mut self) {
        if let Some((text, paragraphs, join)) = self.pending.take() {
            self.emit(text, paragraphs, join);
        }
    }

    fn accumulate(&mut self, paragraph: &str, paragraph_index: usize, join: ChunkJoin) {
        if let Some((text, paragraphs, _)) = self.pending.as_mut() {
            if char_len(text) + PARAGRAPH_SEPARATOR.len() + char_len(paragraph) <= self.max_chars {
                text.push_str(PARAGRAPH_SEPARATOR);
                text.push_str(paragraph);
                paragraphs.end = paragraph_index + 1;
                return;
            }
        }
        self.flush();
        self.pending = Some((paragraph.to_string(), paragraph_index..paragraph_index + 1, join));
    }

    fn split_paragraph(&mut self, paragraph: &str, paragraph_index: usize, join: ChunkJoin) {
        let range = paragraph_index..paragraph_index + 1;
        let mut join = join;
        let mut current = String::new();

        for sentence in split_sentences(paragraph) {
            if char_len(&current) + char_len(sentence) <= self.max_chars {
                current.push_str(sentence);
                continue;
            }
            if !current.is_empty() {
                self.emit(std::mem::take(&mut current), range.clone(), join);
                join = ChunkJoin::Continuation;
            }

            let sentence_chars = char_len(sentence);
            if sentence_chars <= self.max_chars {
                current.push_str(sentence);
                continue;
            }

            warn!(
                "Sentence of {} chars exceeds the {} char chunk limit, cutting it",
                sentence_chars, self.max_chars
            );
            self.plan.hard_cut = true;
            self.plan.diagnostics.push(Diagnostic::ChunkOverflow {
                sentence_chars,
                max_chars: self.max_chars,
            });
            let chars: Vec<char> = sentence.chars().collect();
            let mut pieces = chars.chunks(self.max_chars).map(|piece| piece.iter().collect::<String>());
            let mut previous = pieces.next().unwrap_or_default();
            for piece in pieces {
                self.emit(std::mem::replace(&mut previous, piece), range.clone(), join);
                join = ChunkJoin::Continuation;
            }
            current = previous;
        }

        if !current.is_empty() {
            self.emit(current, range, join);
        }
    }
}
