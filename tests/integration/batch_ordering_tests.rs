/*!
 * Chunk ordering under concurrent translation
 */

use std::sync::Arc;

use epubzh::translation::chunker::{chunk_text, reassemble_chunks};
use epubzh::translation::{BatchTranslator, TranslationStyle};

use crate::common::mock_translators::ReverseDelayTranslator;

fn paragraphs(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("Paragraph {}.", i)).collect()
}

#[tokio::test]
async fn test_translate_chunks_with_reversed_completion_should_keep_chunk_order() {
    let source = paragraphs(6).join("\n\n");
    let plan = chunk_text(&source, 14);
    assert_eq!(plan.len(), 6);

    let translator = Arc::new(ReverseDelayTranslator::new(6, 15));
    let batch = BatchTranslator::new(translator.clone(), 6);
    let results = batch.translate_chunks(&plan.chunks, TranslationStyle::General, |_, _| {}).await;

    let completed = translator.completed.lock().unwrap().clone();
    assert_eq!(completed.first().map(String::as_str), Some("Paragraph 5."));
    assert_eq!(completed.last().map(String::as_str), Some("Paragraph 0."));

    assert!(results.iter().all(|r| r.is_success()));
    let rebuilt = reassemble_chunks(
        &plan.chunks,
        results.iter().map(|r| (r.index, r.text.as_deref().unwrap_or_default())),
    );
    let expected = paragraphs(6)
        .iter()
        .map(|p| format!("〔{}〕", p))
        .collect::<Vec<_>>()
        .join("\n\n");
    assert_eq!(rebuilt, expected);
}

#[tokio::test]
async fn test_translate_chunks_with_single_slot_should_run_sequentially() {
    let source = paragraphs(3).join("\n\n");
    let plan = chunk_text(&source, 14);

    let translator = Arc::new(ReverseDelayTranslator::new(3, 5));
    let results = BatchTranslator::new(translator.clone(), 1)
        .translate_chunks(&plan.chunks, TranslationStyle::General, |_, _| {})
        .await;

    let completed = translator.completed.lock().unwrap().clone();
    assert_eq!(completed, paragraphs(3));
    assert_eq!(results.len(), 3);
}
