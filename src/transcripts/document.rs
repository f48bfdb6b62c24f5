use std::path::Path;
use url::Url;

use crate::fetcher::Download;
use crate::transcripts::TranscriptError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptFormat {
    Pdf,
    Text,
}

impl TranscriptFormat {
    /// By the file extension of the URL path, then by content type.
    pub fn detect(url: &Url, content_type: &str) -> Option<Self> {
        let extension = Path::new(url.path())
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("pdf") => Some(Self::Pdf),
            Some("txt") => Some(Self::Text),
            _ => {
                let content_type = content_type.to_ascii_lowercase();
                if content_type.contains("application/pdf") {
                    Some(Self::Pdf)
                } else if content_type.contains("text/plain") {
                    Some(Self::Text)
                } else {
                    None
                }
            }
        }
    }
}

/// Plain text of a downloaded transcript document.
pub async fn transcript_text(download: &Download) -> Result<String, TranscriptError> {
    let format = TranscriptFormat::detect(&download.url_final, &download.content_type)
        .ok_or_else(|| TranscriptError::Unsupported(download.url_final.to_string()))?;

    let text = match format {
        TranscriptFormat::Text => String::from_utf8_lossy(&download.body).into_owned(),
        TranscriptFormat::Pdf => {
            let body = download.body.clone();
            // CPU bound, and the parser can panic on malformed files.
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&body))
                .await
                .map_err(|err| TranscriptError::Pdf(err.to_string()))?
                .map_err(|err| TranscriptError::Pdf(err.to_string()))?
        }
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(TranscriptError::EmptyTranscript);
    }
    Ok(text.to_string())
}
