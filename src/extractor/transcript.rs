use scraper::{Html, Selector};
use std::sync::LazyLock;

use crate::extractor::model::{ExtractError, collapse_whitespace};
use crate::extractor::reader;

static UTTERANCE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[class~='utterance'], [class~='transcript-utterance']").unwrap()
});

/// Transcript utterances in document order, each flattened to one line and
/// joined by single spaces. Pages without utterance blocks fall back to the
/// generic text extraction.
pub fn extract_text(html: &str) -> Result<String, ExtractError> {
    let document = Html::parse_document(html);

    let utterances: Vec<String> = document
        .select(&UTTERANCE_SELECTOR)
        .map(|block| collapse_whitespace(&block.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
        .collect();

    if utterances.is_empty() {
        return reader::extract_text(html);
    }

    Ok(utterances.join(" "))
}
