use scraper::{Html, Selector};
use std::sync::LazyLock;

use crate::extractor::collapse_whitespace;

static H1_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static POST_CONTENT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".post__content").unwrap());
static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// First non-empty text among `selectors`, whitespace collapsed.
fn first_text(document: &Html, selectors: &[&Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        let element = document.select(selector).next()?;
        let text = collapse_whitespace(&element.text().collect::<String>());
        (!text.is_empty()).then_some(text)
    })
}

/// Episode title: the first `<h1>`, else `<title>`.
pub fn episode_title(html: &str) -> Option<String> {
    first_text(&Html::parse_document(html), &[&*H1_SELECTOR, &*TITLE_SELECTOR])
}

/// Show-notes text of an episode page, empty when the page has none.
pub fn episode_page_text(html: &str) -> String {
    first_text(
        &Html::parse_document(html),
        &[&*POST_CONTENT_SELECTOR, &*BODY_SELECTOR],
    )
    .unwrap_or_default()
}
