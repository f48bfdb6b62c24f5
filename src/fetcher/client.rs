use crate::fetcher::{
    decode::process_response,
    errors::FetchError,
    types::{Download, PageResponse},
};
use reqwest::{
    Client, ClientBuilder, StatusCode,
    header::{self, HeaderMap, HeaderValue},
};
use std::{future::Future, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const MAX_BODY_SIZE: u64 = 20 * 1024 * 1024; // 20MB, sitemaps can be large
const MAX_REDIRECTS: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body returned by gateways that reject the request headers.
pub const SOFT_ERROR_MARKER: &str = "Not Acceptable";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const MINIMAL_USER_AGENT: &str = "curl/8.7.1";

/// Fixed request-header policy, chosen once per adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpProfile {
    /// Desktop browser headers; gets past `406 Not Acceptable` gateways.
    Browser,
    /// A bare curl user agent; gets past edge challenges that block browsers.
    Minimal,
}

impl HttpProfile {
    fn user_agent(self) -> &'static str {
        match self {
            Self::Browser => BROWSER_USER_AGENT,
            Self::Minimal => MINIMAL_USER_AGENT,
        }
    }

    fn default_headers(self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if self == Self::Browser {
            headers.insert(
                header::ACCEPT,
                HeaderValue::from_static(
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                ),
            );
            headers.insert(
                header::ACCEPT_LANGUAGE,
                HeaderValue::from_static("en-US,en;q=0.9"),
            );
            headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
            headers.insert(
                header::UPGRADE_INSECURE_REQUESTS,
                HeaderValue::from_static("1"),
            );
        }
        headers
    }
}

/// HTTP transport bound to one [`HttpProfile`]. Cheap to clone and safe to
/// share between workers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    profile: HttpProfile,
}

impl HttpClient {
    pub fn new(profile: HttpProfile) -> Result<Self, FetchError> {
        Self::with_timeout(profile, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(profile: HttpProfile, timeout: Duration) -> Result<Self, FetchError> {
        let inner = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .user_agent(profile.user_agent())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .default_headers(profile.default_headers())
            .build()
            .map_err(|e| FetchError::Unknown(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { inner, profile })
    }

    /// GET `url` and decode the body. Anything but `200 OK` is an error, as is
    /// an empty body or a bare soft-error page.
    #[instrument(skip_all, fields(url = %url, profile = ?self.profile))]
    pub async fn get(&self, cancel: &CancellationToken, url: &str) -> Result<PageResponse, FetchError> {
        let download = self.fetch_body(cancel, url).await?;

        let page = process_response(
            download.url_final,
            StatusCode::OK,
            download.body,
            &download.content_type,
        )?;
        let trimmed = page.body_utf8.trim();
        if trimmed.is_empty() || trimmed == SOFT_ERROR_MARKER {
            return Err(FetchError::SoftError(format!(
                "{} returned {:?}",
                page.url_final, trimmed
            )));
        }

        debug!(
            status = %page.status,
            charset = page.charset.name(),
            bytes = page.body_raw.len(),
            "fetched page"
        );
        Ok(page)
    }

    /// GET `url` without decoding, for binary documents.
    #[instrument(skip_all, fields(url = %url, profile = ?self.profile))]
    pub async fn download(&self, cancel: &CancellationToken, url: &str) -> Result<Download, FetchError> {
        let download = self.fetch_body(cancel, url).await?;
        debug!(
            content_type = %download.content_type,
            bytes = download.body.len(),
            "downloaded document"
        );
        Ok(download)
    }

    async fn fetch_body(&self, cancel: &CancellationToken, url: &str) -> Result<Download, FetchError> {
        let parsed_url = url::Url::parse(url)?;

        let response = race(cancel, self.inner.get(parsed_url).send())
            .await?
            .map_err(FetchError::from_reqwest_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::UnexpectedStatus(status));
        }

        // Check content length before downloading
        if let Some(content_length) = response.content_length()
            && content_length > MAX_BODY_SIZE
        {
            return Err(FetchError::BodyTooLarge(content_length));
        }

        let url_final = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        let body = race(cancel, response.bytes())
            .await?
            .map_err(|e| FetchError::Io(e.to_string()))?;

        // Content-Length may be missing
        if body.len() as u64 > MAX_BODY_SIZE {
            return Err(FetchError::BodyTooLarge(body.len() as u64));
        }

        Ok(Download {
            url_final,
            content_type,
            body,
        })
    }

    /// HEAD `url` and report the final status after redirects.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn head(&self, cancel: &CancellationToken, url: &str) -> Result<StatusCode, FetchError> {
        let parsed_url = url::Url::parse(url)?;

        let response = race(cancel, self.inner.head(parsed_url).send())
            .await?
            .map_err(FetchError::from_reqwest_error)?;

        Ok(response.status())
    }
}

/// Run `fut` unless `cancel` fires first.
async fn race<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output, FetchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_profile_sends_no_browser_headers() {
        let headers = HttpProfile::Minimal.default_headers();
        assert!(headers.is_empty());
        assert_eq!(HttpProfile::Minimal.user_agent(), "curl/8.7.1");
    }

    #[test]
    fn browser_profile_headers() {
        let headers = HttpProfile::Browser.default_headers();
        assert!(headers.get(header::ACCEPT).is_some());
        assert_eq!(headers.get(header::CONNECTION).unwrap(), "keep-alive");
        assert_eq!(headers.get(header::UPGRADE_INSECURE_REQUESTS).unwrap(), "1");
        assert!(HttpProfile::Browser.user_agent().contains("Chrome"));
    }

    #[tokio::test]
    async fn cancelled_scope_aborts_request() {
        let client = HttpClient::new(HttpProfile::Minimal).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        // Non-routable address; the cancelled token must win the race.
        let result = client.get(&cancel, "http://10.255.255.1/").await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
    }
}
