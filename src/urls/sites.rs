use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

use crate::entities::UrlRef;
use crate::urls::generic::extract_generic;
use crate::urls::html::{LinkCollector, UrlExtractor};

static SE_RADIO_LINKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "div.col-12.megaphone-order-1.col-lg-8 article.megaphone-item.megaphone-post h2.entry-title a",
    )
    .unwrap()
});

static EPISODE_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.episodeLink[href^='/episodepage/']").unwrap());

pub const GENERIC: &str = "generic";
pub const SE_RADIO: &str = "se-radio";
pub const DATA_ENGINEERING_PODCAST: &str = "data-engineering-podcast";

/// Episode cards in the main column of se-radio.net listings.
pub fn extract_se_radio(html: &str, page_url: &Url) -> Vec<UrlRef> {
    let document = Html::parse_document(html);
    let mut links = LinkCollector::new();
    for link in document.select(&SE_RADIO_LINKS) {
        links.push(&link, page_url);
    }
    links.into_urls()
}

/// `/episodepage/` links on dataengineeringpodcast.com listings.
pub fn extract_data_engineering_podcast(html: &str, page_url: &Url) -> Vec<UrlRef> {
    let document = Html::parse_document(html);
    let mut links = LinkCollector::new();
    for link in document.select(&EPISODE_LINKS) {
        links.push(&link, page_url);
    }
    links.into_urls()
}

/// Listing extractor registered under `name`.
pub fn extractor_by_name(name: &str) -> Option<UrlExtractor> {
    match name {
        GENERIC => Some(extract_generic as UrlExtractor),
        SE_RADIO => Some(extract_se_radio as UrlExtractor),
        DATA_ENGINEERING_PODCAST => Some(extract_data_engineering_podcast as UrlExtractor),
        _ => None,
    }
}

/// Name of the extractor best suited to `base_url`'s host.
pub fn extractor_name_for(base_url: &str) -> &'static str {
    let host = Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_lowercase))
        .unwrap_or_default();

    if host.ends_with("se-radio.net") {
        SE_RADIO
    } else if host.ends_with("dataengineeringpodcast.com") {
        DATA_ENGINEERING_PODCAST
    } else {
        GENERIC
    }
}

pub fn extractor_names() -> [&'static str; 3] {
    [GENERIC, SE_RADIO, DATA_ENGINEERING_PODCAST]
}
