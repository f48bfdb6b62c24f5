use scraper::{Html, Selector};
use std::sync::LazyLock;

static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Best transcript link on an episode page, as written in the `href`.
///
/// Links are ranked: a `.pdf`/`.txt` href whose text mentions "transcript",
/// then any `.pdf`/`.txt` href, then any link whose text mentions
/// "transcript". Document order breaks ties.
pub fn find_transcript_url(html: &str) -> Option<String> {
    if html.trim().is_empty() {
        return None;
    }

    let document = Html::parse_document(html);
    document
        .select(&LINK_SELECTOR)
        .filter_map(|link| {
            let href = link.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let text = link.text().collect::<String>().to_lowercase();
            let rank = match (is_document_href(href), text.contains("transcript")) {
                (true, true) => 0,
                (true, false) => 1,
                (false, true) => 2,
                (false, false) => return None,
            };
            Some((rank, href.to_string()))
        })
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, href)| href)
}

fn is_document_href(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    let extension = path
        .rsplit_once('/')
        .map_or(path, |(_, file)| file)
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    matches!(extension.as_deref(), Some("pdf" | "txt"))
}
