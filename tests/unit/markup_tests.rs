/*!
 * Tests for extraction and reinsertion of chapter markup
 */

use std::collections::BTreeMap;

use epubzh::errors::Diagnostic;
use epubzh::markup::{ExtractionPolicy, LinkTextPolicy, extract_text, reinsert_translations};
use epubzh::translation::{AlignmentResult, AlignmentTier, align_translations};

use crate::common::{navigation_body, xhtml};

fn policy() -> ExtractionPolicy {
    ExtractionPolicy::default()
}

fn mapping(entries: &[(usize, &str)]) -> AlignmentResult {
    AlignmentResult {
        translations: entries.iter().map(|(i, t)| (*i, t.to_string())).collect::<BTreeMap<_, _>>(),
        tier: AlignmentTier::Containment,
        original_paragraphs: entries.len(),
        translated_paragraphs: entries.len(),
        reused: 0,
    }
}

#[test]
fn test_reinsert_translations_with_empty_mapping_should_round_trip_structure() {
    let documents = [
        "<p>Plain paragraph.</p>",
        "<div class=\"a\"><p>One <em>two</em> three.</p><p>Four <a href=\"x.html#n\">five</a>.</p></div>",
        "<p>Before<br/>after</p><img src=\"cover.jpg\" alt=\"Cover\"/>",
        "<ul><li>first</li><li>second</li></ul>",
        "<p>Hi there <img alt=\"a>b\" src=\"x.png\"/></p>",
    ];
    for body in documents {
        let markup = xhtml(body);
        let output = reinsert_translations(&markup, &AlignmentResult::empty(), &policy()).unwrap();

        let before = extract_text(&markup, &policy()).unwrap();
        let after = extract_text(&output, &policy()).unwrap();
        assert_eq!(before.blocks.len(), after.blocks.len(), "block count changed for {}", body);
        assert_eq!(before.joined_text(), after.joined_text());
        assert!(output.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE html>\n"));
    }
}

#[test]
fn test_reinsert_translations_with_gt_in_attribute_should_keep_attribute_value() {
    let markup = r#"<body><p>Hi there <img alt="a>b" src="x.png"/></p><!-- <br> --></body>"#;
    let output = reinsert_translations(markup, &AlignmentResult::empty(), &policy()).unwrap();
    assert_eq!(output, r#"<body><p>Hi there <img alt="a>b" src="x.png" /></p><!-- <br> --></body>"#);
}

#[test]
fn test_reinsert_translations_should_keep_attributes_and_self_close_void_elements() {
    let markup = xhtml("<p>See <a href=\"notes.xhtml#n1\" id=\"r1\">the note</a>.</p><img src=\"a.png\" alt=\"\">");
    let extraction = extract_text(&markup, &policy()).unwrap();
    let alignment = align_translations(&extraction.blocks, "参见注释。");
    let output = reinsert_translations(&markup, &alignment, &policy()).unwrap();

    assert!(output.contains("href=\"notes.xhtml#n1\""));
    assert!(output.contains("id=\"r1\""));
    assert!(output.contains("<img src=\"a.png\" alt=\"\" />"));
    assert!(!output.contains("the note"));
}

#[test]
fn test_extract_text_with_single_paragraph_should_be_idempotent() {
    let first = extract_text(&xhtml("<p>  A lone paragraph of text.  </p>"), &policy()).unwrap();
    assert_eq!(first.blocks.len(), 1);
    assert_eq!(first.blocks[0].text, "A lone paragraph of text.");

    let second = extract_text(&xhtml(&format!("<p>{}</p>", first.joined_text())), &policy()).unwrap();
    assert_eq!(second.joined_text(), first.joined_text());
}

#[test]
fn test_extract_text_with_twenty_links_in_hundred_chars_should_detect_navigation() {
    let extraction = extract_text(&xhtml(&navigation_body(20)), &policy()).unwrap();
    assert!(extraction.is_navigation_page);
}

#[test]
fn test_extract_text_with_prose_and_one_link_should_not_detect_navigation() {
    let body = "<p>It was a bright cold day in April, and the clocks were striking thirteen. \
                See <a href=\"n.xhtml\">note</a>.</p>";
    let extraction = extract_text(&xhtml(body), &policy()).unwrap();
    assert!(!extraction.is_navigation_page);
}

#[test]
fn test_extract_text_with_excluded_links_should_keep_anchor_text_untouched() {
    let markup = xhtml("<p>Read <a href=\"c.xhtml\">Chapter One</a> now.</p>");
    let exclude = ExtractionPolicy::new(LinkTextPolicy::Exclude);
    let extraction = extract_text(&markup, &exclude).unwrap();
    assert!(!extraction.joined_text().contains("Chapter One"));

    let alignment = align_translations(&extraction.blocks, "现在阅读。");
    let output = reinsert_translations(&markup, &alignment, &exclude).unwrap();
    assert!(output.contains(">Chapter One</a>"));
}

#[test]
fn test_hello_world_should_translate_end_to_end() {
    let markup = "<p>Hello world.</p>";
    let extraction = extract_text(markup, &policy()).unwrap();
    assert_eq!(extraction.joined_text(), "Hello world.");

    let alignment = align_translations(&extraction.blocks, "你好，世界。");
    assert_eq!(alignment.tier, AlignmentTier::Containment);
    let output = reinsert_translations(markup, &alignment, &policy()).unwrap();
    assert_eq!(output, "<p>你好，世界。</p>");
}

#[test]
fn test_reinsert_translations_with_out_of_range_key_should_return_original_with_diagnostic() {
    let markup = xhtml("<p>Only block.</p>");
    let degraded = reinsert_translations(&markup, &mapping(&[(0, "唯一"), (7, "越界")]), &policy()).unwrap_err();

    assert_eq!(degraded.value, markup);
    assert!(matches!(degraded.diagnostic, Diagnostic::ReinsertionFailure(_)));
}
