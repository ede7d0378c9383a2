/*!
 * Tests for sentence-aware chunking
 */

use epubzh::translation::chunker::{ChunkJoin, chunk_text, reassemble_chunks, split_sentences};

const NOVEL_OPENING: &str = "It was the best of times, it was the worst of times. It was the age of wisdom, \
it was the age of foolishness.\n\nThere were a king with a large jaw and a queen with a plain face, on the \
throne of England. \"Is it true?\" she asked. He said nothing!\n\nShort line.\n\n\
A final paragraph that is long enough to need splitting on its own sentence boundaries. It has three. Really.";

#[test]
fn test_chunk_text_should_cover_the_input_exactly() {
    for max_chars in [20, 40, 80, 150, 500] {
        let plan = chunk_text(NOVEL_OPENING, max_chars);
        assert_eq!(plan.source_text(), NOVEL_OPENING, "coverage broken at limit {}", max_chars);

        let indices: Vec<usize> = plan.chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, (0..plan.len()).collect::<Vec<_>>());
    }
}

#[test]
fn test_chunk_text_should_respect_the_limit_unless_hard_cut() {
    for max_chars in [20, 40, 80] {
        let plan = chunk_text(NOVEL_OPENING, max_chars);
        for chunk in &plan.chunks {
            assert!(
                chunk.char_count() <= max_chars,
                "chunk {} has {} chars at limit {}",
                chunk.index,
                chunk.char_count(),
                max_chars
            );
        }
        assert_eq!(plan.hard_cut, !plan.diagnostics.is_empty());
    }
}

#[test]
fn test_chunk_text_should_not_split_sentences_that_fit() {
    let plan = chunk_text(NOVEL_OPENING, 120);
    assert!(!plan.hard_cut);
    for chunk in &plan.chunks {
        let trimmed = chunk.text.trim_end();
        assert!(
            trimmed.ends_with(['.', '!', '?', '"']),
            "chunk {} ends mid-sentence: {:?}",
            chunk.index,
            chunk.text
        );
    }
}

#[test]
fn test_chunk_text_first_chunk_should_start_and_later_ones_should_join() {
    let plan = chunk_text(NOVEL_OPENING, 60);
    assert_eq!(plan.chunks[0].join, ChunkJoin::Start);
    assert!(plan.chunks[1..].iter().all(|c| c.join != ChunkJoin::Start));
}

#[test]
fn test_reassemble_chunks_with_missing_piece_should_keep_source_text() {
    let plan = chunk_text("First.\n\nSecond.\n\nThird.", 8);
    assert_eq!(plan.len(), 3);
    let rebuilt = reassemble_chunks(&plan.chunks, vec![(2, "三。"), (0, "一。")]);
    assert_eq!(rebuilt, "一。\n\nSecond.\n\n三。");
}

#[test]
fn test_split_sentences_should_recognize_chinese_terminators() {
    assert_eq!(split_sentences("第一句。第二句！第三句？"), vec!["第一句。", "第二句！", "第三句？"]);
}
