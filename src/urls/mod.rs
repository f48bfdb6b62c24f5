//! URL discovery: source adapters, listing-page extractors and filters.

pub mod errors;
pub mod feed;
pub mod file;
pub mod filter;
pub mod generic;
pub mod html;
pub mod sitemap;
pub mod sites;

pub use errors::{FilterError, SourceError};
pub use feed::FeedSource;
pub use file::FileSource;
pub use filter::{AlreadyPersistedFilter, BaseUrlFilter, ContainsPathFilter, FilterChain, UrlFilter};
pub use generic::extract_generic;
pub use html::{HtmlPageSource, UrlExtractor};
pub use sitemap::SitemapSource;
pub use sites::{extractor_by_name, extractor_name_for};
