use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static SPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static NEWLINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\n\s*\n\s*").unwrap());
static ANY_WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("title not found in HTML")]
    TitleNotFound,

    #[error("no readable text in HTML")]
    EmptyText,

    #[error("failed to parse HTML: {0}")]
    Parse(String),
}

/// Collapse runs of spaces and keep paragraph breaks as a single blank line.
pub fn normalize_whitespace(text: &str) -> String {
    let spaced = SPACE_REGEX.replace_all(text.trim(), " ");
    NEWLINE_REGEX.replace_all(&spaced, "\n\n").into_owned()
}

/// Collapse every whitespace run, newlines included, into one space.
pub fn collapse_whitespace(text: &str) -> String {
    ANY_WHITESPACE_REGEX
        .replace_all(text.trim(), " ")
        .into_owned()
}
