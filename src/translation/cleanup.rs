/*!
 * Cleanup of raw model output.
 *
 * Chat models sometimes wrap a translation in commentary ("注意：…", "开始翻译：") or echo
 * the English source back. These lines are removed before the text is aligned.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::aligner::split_paragraphs;

/// Note, explanation, hint or label lines the model prepends, with their line break
static COMMENTARY_LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:注意|说明|提示|翻译)[：:].*(?:\n|$)").expect("Invalid commentary regex"));

/// Preamble ending in "开始翻译：" ("start of translation:")
static PREAMBLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^.*?开始翻译[：:]\s*").expect("Invalid preamble regex"));

/// Lines with a smaller share of CJK ideographs may be echoed source text
const MIN_CJK_RATIO: f64 = 0.2;

/// Strip commentary and echoed source lines from the model's translation of `source`.
///
/// A line counts as echoed when it is mostly non-CJK, contains Latin letters and appears
/// verbatim in `source`. Echoed lines are only removed from paragraphs that keep other
/// lines, so scene breaks, numbers and names left in Latin script still occupy their
/// paragraph. If nothing survives, the commentary-stripped text is returned.
pub fn clean_model_output(raw: &str, source: &str) -> String {
    let without_commentary = COMMENTARY_LINE_REGEX.replace_all(raw, "");
    let stripped = PREAMBLE_REGEX.replace(&without_commentary, "");
    let stripped = stripped.trim();

    let cleaned = split_paragraphs(stripped)
        .iter()
        .map(|paragraph| drop_echoed_lines(paragraph, source))
        .collect::<Vec<_>>()
        .join("\n\n");

    if cleaned.is_empty() {
        debug!("Cleanup would remove every line, keeping model output as is");
        return stripped.to_string();
    }
    cleaned
}

fn drop_echoed_lines(paragraph: &str, source: &str) -> String {
    let lines: Vec<&str> = paragraph.lines().map(str::trim).filter(|line| !line.is_empty()).collect();
    let kept: Vec<&str> = lines.iter().copied().filter(|line| !is_echo(line, source)).collect();
    if kept.is_empty() {
        return lines.join("\n");
    }
    if kept.len() < lines.len() {
        debug!("Dropped {} echoed source lines", lines.len() - kept.len());
    }
    kept.join("\n")
}

fn is_echo(line: &str, source: &str) -> bool {
    cjk_ratio(line) <= MIN_CJK_RATIO && line.chars().any(|c| c.is_ascii_alphabetic()) && source.contains(line)
}

/// Share of CJK unified ideographs in the trimmed line
fn cjk_ratio(line: &str) -> f64 {
    let trimmed = line.trim();
    let total = trimmed.chars().count();
    if total == 0 {
        return 0.0;
    }
    let cjk = trimmed.chars().filter(|c| ('\u{4e00}'..='\u{9fa5}').contains(c)).count();
    cjk as f64 / total as f64
}
