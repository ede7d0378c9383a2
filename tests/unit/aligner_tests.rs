/*!
 * Tests for paragraph alignment
 */

use epubzh::errors::Diagnostic;
use epubzh::markup::{ExtractionPolicy, TextBlock, extract_text};
use epubzh::translation::{AlignmentTier, align_translations};

fn blocks_from(paragraphs: &[&str]) -> Vec<TextBlock> {
    let body: String = paragraphs.iter().map(|p| format!("<p>{}</p>", p)).collect();
    extract_text(&body, &ExtractionPolicy::default()).unwrap().blocks
}

#[test]
fn test_align_translations_with_ten_blocks_and_three_paragraphs_should_degrade_to_proportional() {
    let originals: Vec<String> = (0..10).map(|i| format!("Paragraph number {} of the chapter.", i)).collect();
    let refs: Vec<&str> = originals.iter().map(String::as_str).collect();
    let blocks = blocks_from(&refs);
    assert_eq!(blocks.len(), 10);

    let translated = "第一段译文内容比较长一些。\n\n第二段译文。\n\n第三段译文也在这里。";
    let alignment = align_translations(&blocks, translated);

    assert_eq!(alignment.tier, AlignmentTier::Proportional);
    assert!(alignment.is_degraded());
    assert_eq!(alignment.translations.len(), 10);
    assert!(alignment.translations.values().all(|t| !t.is_empty()));
    assert_eq!(
        alignment.diagnostic(),
        Some(Diagnostic::AlignmentDegraded {
            original_paragraphs: 10,
            translated_paragraphs: 3
        })
    );

    let combined: String = alignment.translations.values().cloned().collect();
    for paragraph in translated.split("\n\n") {
        for ch in paragraph.chars().filter(|c| !c.is_whitespace()) {
            assert!(combined.contains(ch), "lost {:?}", ch);
        }
    }
}

#[test]
fn test_align_translations_with_half_the_paragraphs_should_still_use_containment() {
    let blocks = blocks_from(&["One.", "Two.", "Three.", "Four."]);
    let alignment = align_translations(&blocks, "一。\n\n二。");

    assert_eq!(alignment.tier, AlignmentTier::Containment);
    assert_eq!(alignment.translations.len(), 4);
    assert_eq!(alignment.translations[&0], "一。");
    assert_eq!(alignment.translations[&1], "二。");
}

#[test]
fn test_align_translations_with_equal_counts_should_not_be_degraded() {
    let blocks = blocks_from(&["Hello.", "Goodbye."]);
    let alignment = align_translations(&blocks, "你好。\n\n再见。");

    assert!(!alignment.is_degraded());
    assert_eq!(alignment.diagnostic(), None);
    assert_eq!(alignment.translations[&1], "再见。");
}

#[test]
fn test_align_translations_with_no_blocks_should_be_empty() {
    let alignment = align_translations(&[], "随便什么。");
    assert!(alignment.translations.is_empty());
}

#[test]
fn test_align_translations_with_blank_line_inside_block_should_keep_whole_translation() {
    let extraction = extract_text("<p>First line.\n\nSecond line.</p><p>Next.</p>", &ExtractionPolicy::default()).unwrap();
    assert_eq!(extraction.blocks.len(), 2);

    let alignment = align_translations(&extraction.blocks, "第一行。\n第二行。\n\n下一个。");

    assert_eq!(alignment.tier, AlignmentTier::Containment);
    assert_eq!(alignment.original_paragraphs, 2);
    assert_eq!(alignment.translations.get(&0).map(String::as_str), Some("第一行。\n第二行。"));
    assert_eq!(alignment.translations.get(&1).map(String::as_str), Some("下一个。"));
    assert_eq!(alignment.reused, 0);
}
