use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::entities::UrlRef;
use crate::pipeline::Fetcher;
use crate::urls::errors::SourceError;

/// Line-delimited URL list on local disk. The "url" handed to `fetch` is the
/// file path.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSource;

#[async_trait]
impl Fetcher for FileSource {
    #[instrument(skip_all, fields(path = %path))]
    async fn fetch(&self, cancel: &CancellationToken, path: &str) -> Result<Vec<UrlRef>, SourceError> {
        let contents = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SourceError::Cancelled { partial: Vec::new() }),
            read = tokio::fs::read_to_string(path) => read.map_err(|source| SourceError::Io {
                path: path.to_string(),
                source,
            })?,
        };

        let urls = parse_lines(&contents);
        if urls.is_empty() {
            return Err(SourceError::EmptyFile(path.to_string()));
        }

        info!(count = urls.len(), "url file read");
        Ok(urls)
    }
}

/// One URL per line. Blank lines and `#` comments are skipped, trailing
/// whitespace and commas stripped.
pub fn parse_lines(contents: &str) -> Vec<UrlRef> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.trim_end_matches([',', ' ', '\t']))
        .filter(|line| !line.is_empty())
        .map(UrlRef::new)
        .collect()
}
