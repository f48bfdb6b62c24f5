pub mod model;
pub mod reader;
pub mod transcript;

#[cfg(test)]
mod tests;

pub use model::{ExtractError, collapse_whitespace, normalize_whitespace};

/// Turns an article page into a title and a body text.
pub trait ContentExtractor: Send + Sync {
    fn extract_title(&self, html: &str) -> Result<String, ExtractError>;

    fn extract_text(&self, html: &str) -> Result<String, ExtractError>;
}

/// Readability heuristic with landmark-element fallbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadabilityExtractor;

impl ContentExtractor for ReadabilityExtractor {
    fn extract_title(&self, html: &str) -> Result<String, ExtractError> {
        reader::extract_title(html)
    }

    fn extract_text(&self, html: &str) -> Result<String, ExtractError> {
        reader::extract_text(html)
    }
}

/// Podcast episode pages: the body is the transcript.
#[derive(Debug, Default, Clone, Copy)]
pub struct TranscriptExtractor;

impl ContentExtractor for TranscriptExtractor {
    fn extract_title(&self, html: &str) -> Result<String, ExtractError> {
        reader::extract_title(html)
    }

    fn extract_text(&self, html: &str) -> Result<String, ExtractError> {
        transcript::extract_text(html)
    }
}
