use thiserror::Error;

use crate::entities::UrlRef;
use crate::fetcher::FetchError;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to parse {format}: {reason}")]
    Parse { format: &'static str, reason: String },

    #[error("no URLs found in feed {0}")]
    EmptyFeed(String),

    #[error("no URLs found in file {0}")]
    EmptyFile(String),

    #[error("no URLs found in page {0}")]
    NoUrlsFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid page pattern {0:?}: expected exactly one %d placeholder")]
    InvalidPattern(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("cancelled after {} URLs", partial.len())]
    Cancelled { partial: Vec<UrlRef> },
}

impl SourceError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::Fetch(err) => err.is_cancelled(),
            Self::Filter(err) => matches!(err, FilterError::Cancelled),
            _ => false,
        }
    }

    pub fn is_filter(&self) -> bool {
        matches!(self, Self::Filter(_))
    }
}

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("filter {filter} failed for {url}: {reason}")]
    Failed {
        filter: &'static str,
        url: String,
        reason: String,
    },

    #[error("filter cancelled")]
    Cancelled,
}
