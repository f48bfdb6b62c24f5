use crate::fetcher::{
    errors::FetchError,
    types::{Charset, PageResponse},
};
use bytes::Bytes;
use chrono::Utc;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::LazyLock;
use url::Url;

/// Bytes scanned for in-document charset declarations.
const SNIFF_WINDOW: usize = 4096;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

static XML_ENCODING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<\?xml\s+[^>]*?encoding\s*=\s*["']([^"']+)["']"#).unwrap());

pub fn process_response(
    url_final: Url,
    status: StatusCode,
    body_bytes: Bytes,
    content_type: &str,
) -> Result<PageResponse, FetchError> {
    let charset = detect_charset(content_type, &body_bytes);
    let body_utf8 = decode_to_utf8(&body_bytes, charset)?;

    Ok(PageResponse {
        url_final,
        status,
        body_raw: body_bytes,
        body_utf8,
        charset,
        fetched_at: Utc::now(),
    })
}

fn label_to_charset(regex: &Regex, haystack: &str) -> Option<Charset> {
    let label = regex.captures(haystack)?.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes()).map(Charset::from_encoding)
}

fn detect_charset(content_type: &str, body_bytes: &[u8]) -> Charset {
    // 1. Content-Type header
    if let Some(charset) = label_to_charset(&CHARSET_REGEX, content_type) {
        return charset;
    }

    // 2. In-document declarations (<meta charset>, http-equiv, <?xml encoding?>)
    let window = &body_bytes[..body_bytes.len().min(SNIFF_WINDOW)];
    let head = String::from_utf8_lossy(window);
    for regex in [&*META_CHARSET_REGEX, &*XML_ENCODING_REGEX] {
        if let Some(charset) = label_to_charset(regex, &head) {
            return charset;
        }
    }

    // 3. Heuristic detection
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(window, body_bytes.len() <= SNIFF_WINDOW);
    Charset::from_encoding(detector.guess(None, true))
}

fn decode_to_utf8(body_bytes: &[u8], charset: Charset) -> Result<String, FetchError> {
    let (decoded, encoding, had_errors) = charset.encoding().decode(body_bytes);

    if had_errors {
        return Err(FetchError::Charset(format!(
            "failed to decode content with encoding: {}",
            encoding.name()
        )));
    }

    Ok(decoded.into_owned())
}
