use readability::extractor::{self, Product};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

use crate::extractor::model::{ExtractError, normalize_whitespace};

/// Readability only uses the base to rewrite links in its HTML output, which
/// we discard.
static READABILITY_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://localhost/").unwrap());

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static H1_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static OG_TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[property='og:title']").unwrap());
static META_TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name='title']").unwrap());

const CONTENT_SELECTORS: [&str; 9] = [
    "article",
    "main",
    "[role='main']",
    ".content",
    ".post",
    ".article",
    "#content",
    "#main",
    ".entry-content",
];

fn readability(html: &str) -> Result<Product, ExtractError> {
    extractor::extract(&mut html.as_bytes(), &READABILITY_BASE)
        .map_err(|e| ExtractError::Parse(e.to_string()))
}

/// Title cascade: readability, `<title>`, first `<h1>`, `og:title`, then
/// `<meta name=title>`.
pub fn extract_title(html: &str) -> Result<String, ExtractError> {
    if let Ok(product) = readability(html) {
        let title = product.title.trim();
        if !title.is_empty() {
            return Ok(title.to_string());
        }
    }

    let document = Html::parse_document(html);

    for selector in [&*TITLE_SELECTOR, &*H1_SELECTOR] {
        if let Some(element) = document.select(selector).next() {
            let title = element.text().collect::<String>();
            let title = title.trim();
            if !title.is_empty() {
                return Ok(title.to_string());
            }
        }
    }

    for selector in [&*OG_TITLE_SELECTOR, &*META_TITLE_SELECTOR] {
        if let Some(content) = document
            .select(selector)
            .next()
            .and_then(|element| element.value().attr("content"))
        {
            let title = content.trim();
            if !title.is_empty() {
                return Ok(title.to_string());
            }
        }
    }

    Err(ExtractError::TitleNotFound)
}

/// Main-content text, trimmed. May be empty; the caller decides whether an
/// empty body is acceptable.
pub fn extract_text(html: &str) -> Result<String, ExtractError> {
    let product = readability(html)?;
    let text = normalize_whitespace(&product.text);
    if !text.is_empty() {
        return Ok(text);
    }

    // Readability found nothing it liked; fall back to landmark elements.
    Ok(fallback_text(&Html::parse_document(html)))
}

fn fallback_text(document: &Html) -> String {
    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            let text = normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "));
            if !text.is_empty() {
                return text;
            }
        }
    }

    // Last resort: the whole body
    if let Ok(body_selector) = Selector::parse("body")
        && let Some(body) = document.select(&body_selector).next()
    {
        return normalize_whitespace(&body.text().collect::<Vec<_>>().join(" "));
    }

    String::new()
}
