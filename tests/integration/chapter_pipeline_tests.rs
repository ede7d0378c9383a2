/*!
 * Single chapters through extraction, chunking, translation, alignment and reinsertion
 */

use std::sync::Arc;

use async_trait::async_trait;
use epubzh::errors::{Diagnostic, TranslationError};
use epubzh::markup::{ExtractionPolicy, extract_text};
use epubzh::translation::chapter::{ChapterOptions, PassthroughReason};
use epubzh::translation::{ChapterPipeline, ChapterState, ChapterStatus, ChunkTranslator, TranslationStyle};

use crate::common::mock_translators::{
    DictionaryTranslator, FailingTranslator, ParagraphTranslator, ReverseDelayTranslator,
};
use crate::common::{navigation_body, xhtml};

fn pipeline(translator: Arc<dyn ChunkTranslator>, max_chunk_chars: usize) -> ChapterPipeline {
    let options = ChapterOptions {
        max_chunk_chars,
        ..ChapterOptions::default()
    };
    ChapterPipeline::new(translator, 4, options)
}

/// Returns the whole chunk as one run-on paragraph
struct MergingTranslator;

#[async_trait]
impl ChunkTranslator for MergingTranslator {
    async fn translate_chunk(&self, text: &str, _style: TranslationStyle) -> Result<String, TranslationError> {
        Ok(text.split("\n\n").map(|_| "这是合并后的译文。").collect())
    }
}

#[tokio::test]
async fn test_translate_chapter_with_hello_world_should_produce_chinese_paragraph() {
    let translator = Arc::new(DictionaryTranslator::new(&[("Hello world.", "你好，世界。")]));
    let outcome = pipeline(translator, 1500)
        .translate_chapter("hello.xhtml", "<p>Hello world.</p>")
        .await;

    assert_eq!(outcome.markup, "<p>你好，世界。</p>");
    assert_eq!(outcome.status, ChapterStatus::Translated);
    assert_eq!(
        outcome.states,
        vec![
            ChapterState::Pending,
            ChapterState::Extracting,
            ChapterState::Chunked,
            ChapterState::AwaitingTranslation,
            ChapterState::Aligning,
            ChapterState::Reinserted,
            ChapterState::Done,
        ]
    );
    assert!(outcome.diagnostics.is_empty());
}

#[tokio::test]
async fn test_translate_chapter_with_reversed_completion_should_keep_paragraph_order() {
    let body: String = (0..5).map(|i| format!("<p>Paragraph {}.</p>", i)).collect();
    let markup = xhtml(&body);
    let options = ChapterOptions {
        max_chunk_chars: 14,
        clean_output: false,
        ..ChapterOptions::default()
    };
    let translator = Arc::new(ReverseDelayTranslator::new(5, 10));
    let outcome = ChapterPipeline::new(translator, 5, options)
        .translate_chapter("order.xhtml", &markup)
        .await;

    assert_eq!(outcome.chunk_count, 5);
    let extraction = extract_text(&outcome.markup, &ExtractionPolicy::default()).unwrap();
    let texts: Vec<&str> = extraction.blocks.iter().map(|b| b.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["〔Paragraph 0.〕", "〔Paragraph 1.〕", "〔Paragraph 2.〕", "〔Paragraph 3.〕", "〔Paragraph 4.〕"]
    );
}

#[tokio::test]
async fn test_translate_chapter_with_every_chunk_failing_should_return_original_markup() {
    let markup = xhtml("<p>The first paragraph.</p><p>The second paragraph.</p>");
    let outcome = pipeline(Arc::new(FailingTranslator), 25)
        .translate_chapter("fail.xhtml", &markup)
        .await;

    assert_eq!(outcome.status, ChapterStatus::Failed);
    assert_eq!(outcome.final_state(), ChapterState::Failed);
    assert_eq!(outcome.markup, markup);
    assert_eq!(outcome.failed_chunks, outcome.chunk_count);
    assert!(
        outcome
            .diagnostics
            .iter()
            .all(|d| matches!(d, Diagnostic::MissingTranslation { .. }))
    );
}

#[tokio::test]
async fn test_translate_chapter_with_navigation_page_should_not_call_translator() {
    let translator = Arc::new(ParagraphTranslator::new());
    let markup = xhtml(&navigation_body(20));
    let outcome = pipeline(translator.clone(), 1500)
        .translate_chapter("toc.xhtml", &markup)
        .await;

    assert_eq!(outcome.status, ChapterStatus::Passthrough(PassthroughReason::NavigationPage));
    assert_eq!(outcome.markup, markup);
    assert_eq!(translator.call_count(), 0);
}

#[tokio::test]
async fn test_translate_chapter_with_merged_translation_should_degrade_and_fill_every_block() {
    let body: String = (0..6)
        .map(|i| format!("<p>Sentence number {} of a longer chapter.</p>", i))
        .collect();
    let outcome = pipeline(Arc::new(MergingTranslator), 1500)
        .translate_chapter("merged.xhtml", &xhtml(&body))
        .await;

    assert_eq!(outcome.status, ChapterStatus::Translated);
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::AlignmentDegraded { original_paragraphs: 6, translated_paragraphs: 1 }))
    );
    let extraction = extract_text(&outcome.markup, &ExtractionPolicy::default()).unwrap();
    assert_eq!(extraction.blocks.len(), 6);
    assert!(extraction.blocks.iter().all(|b| !b.text.contains("Sentence")));
}

#[tokio::test]
async fn test_translate_chapter_should_keep_inline_markup_around_translation() {
    let markup = xhtml("<p>He read <em>Moby Dick</em> twice.</p><p>Then he slept.</p>");
    let outcome = pipeline(Arc::new(ParagraphTranslator::new()), 1500)
        .translate_chapter("inline.xhtml", &markup)
        .await;

    assert!(outcome.is_translated());
    assert!(outcome.markup.contains("<em>"));
    assert!(outcome.markup.contains("</em>"));
    assert!(outcome.markup.contains("<title>Chapter</title>"));
    assert!(!outcome.markup.contains("Moby Dick"));
    assert!(!outcome.markup.contains("Then he slept."));
}

#[tokio::test]
async fn test_translate_chapter_with_scene_break_should_keep_paragraphs_in_place() {
    let translator = Arc::new(DictionaryTranslator::new(&[(
        "Hello world.\n\n* * *\n\nGoodbye.",
        "你好世界。\n\n* * *\n\n再见。",
    )]));
    let outcome = pipeline(translator, 1500)
        .translate_chapter("break.xhtml", "<body><p>Hello world.</p><p>* * *</p><p>Goodbye.</p></body>")
        .await;

    assert_eq!(outcome.status, ChapterStatus::Translated);
    assert_eq!(outcome.markup, "<body><p>你好世界。</p><p>* * *</p><p>再见。</p></body>");
}
