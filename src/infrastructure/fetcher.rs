//! HTTP egress for the Fetcher Worker. Owns conditional GET, redirect-chain
//! tracking with a Gatekeeper re-check on every hop, and `Retry-After`
//! parsing. Entry upsert and feed-health bookkeeping live in
//! `domain::ingest`, which drives this module.

use crate::infrastructure::gatekeeper;
use chrono::{DateTime, Utc};
use reqwest::{header, redirect::Policy, Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("URL rejected by gatekeeper: {0}")]
    UnsafeUrl(#[from] gatekeeper::UnsafeUrl),

    #[error("HTTP {status}: {message}")]
    RequestFailed {
        status: StatusCode,
        message: String,
        retry_after: Option<String>,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("too many redirects")]
    TooManyRedirects,
}

impl FetchError {
    /// Whether this failure is worth retrying at all. A URL that fails the
    /// Gatekeeper will never become safe by retrying.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::UnsafeUrl(_))
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            FetchError::UnsafeUrl(_) => "unsafe_url",
            FetchError::RequestFailed { .. } => "http_error",
            FetchError::Network(_) => "network_error",
            FetchError::TooManyRedirects => "too_many_redirects",
        }
    }
}

pub enum FetchResult {
    NotModified {
        final_url: String,
        permanent_redirect: bool,
    },
    Updated {
        final_url: String,
        body: Vec<u8>,
        etag: Option<String>,
        last_modified: Option<String>,
        permanent_redirect: bool,
    },
    RateLimited {
        retry_after: Option<RetryAfter>,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum RetryAfter {
    At(DateTime<Utc>),
}

pub struct Fetcher {
    client: Client,
}

const MAX_REDIRECTS: u32 = 10;

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        // Redirects are followed by hand in `fetch` (below) so each hop can
        // be re-validated through the Gatekeeper and its status code
        // inspected to tell a permanent redirect (301/308) from a
        // temporary one (302/303/307) — `Policy::custom` only sees the
        // target URL, not the status that produced it.
        let client = Client::builder()
            .user_agent(crate::user_agent())
            .gzip(true)
            .brotli(true)
            .timeout(timeout)
            .redirect(Policy::none())
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch(
        &self,
        url: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<FetchResult, FetchError> {
        let mut current_url = url.to_string();
        let mut permanent_redirect = false;
        let mut hop = 0u32;

        loop {
            gatekeeper::validate(&current_url)?;

            let mut request = self.client.get(current_url.as_str());
            if hop == 0 {
                if let Some(etag) = etag {
                    request = request.header(header::IF_NONE_MATCH, etag);
                }
                if let Some(modified) = last_modified {
                    request = request.header(header::IF_MODIFIED_SINCE, modified);
                }
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_redirection() {
                hop += 1;
                if hop > MAX_REDIRECTS {
                    return Err(FetchError::TooManyRedirects);
                }
                if status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::PERMANENT_REDIRECT {
                    permanent_redirect = true;
                }

                let location = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| FetchError::RequestFailed {
                        status,
                        message: "redirect missing a Location header".to_string(),
                        retry_after: None,
                    })?;
                let next = Url::parse(&current_url)
                    .and_then(|base| base.join(location))
                    .map_err(|_| FetchError::RequestFailed {
                        status,
                        message: "redirect target is not a valid URL".to_string(),
                        retry_after: None,
                    })?;

                current_url = next.to_string();
                continue;
            }

            if status == StatusCode::NOT_MODIFIED {
                return Ok(FetchResult::NotModified {
                    final_url: current_url,
                    permanent_redirect,
                });
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_retry_after);
                return Ok(FetchResult::RateLimited { retry_after });
            }

            if !status.is_success() {
                let retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                let message = format!(
                    "{} - {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("unknown")
                );
                return Err(FetchError::RequestFailed {
                    status,
                    message,
                    retry_after,
                });
            }

            let etag = response
                .headers()
                .get(header::ETAG)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            let last_modified = response
                .headers()
                .get(header::LAST_MODIFIED)
                .and_then(|v| v.to_str().ok())
                .map(String::from);

            let body = response.bytes().await?.to_vec();

            return Ok(FetchResult::Updated {
                final_url: current_url,
                body,
                etag,
                last_modified,
                permanent_redirect,
            });
        }
    }
}

/// Parses a `Retry-After` header as either delta-seconds or an HTTP-date
/// (the IMF-fixdate format RFC 7231 mandates is RFC 2822-compatible).
fn parse_retry_after(raw: &str) -> Option<RetryAfter> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        let secs = secs.max(0);
        return Some(RetryAfter::At(Utc::now() + chrono::Duration::seconds(secs)));
    }
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|t| RetryAfter::At(t.with_timezone(&Utc)))
}

/// Default backoff applied when `429` arrives without a `Retry-After`.
pub fn default_backoff() -> DateTime<Utc> {
    Utc::now() + chrono::Duration::seconds(60)
}

pub type SharedFetcher = Arc<Fetcher>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_delta_seconds_retry_after() {
        let before = Utc::now();
        let parsed = parse_retry_after("120").unwrap();
        let RetryAfter::At(at) = parsed;
        assert!(at >= before + chrono::Duration::seconds(119));
    }

    #[test]
    fn parses_http_date_retry_after() {
        let parsed = parse_retry_after("Wed, 21 Oct 2099 07:28:00 GMT");
        assert!(parsed.is_some());
    }

    #[test]
    fn rejects_garbage_retry_after() {
        assert!(parse_retry_after("not-a-date-or-int").is_none());
    }

    #[test]
    fn unsafe_url_errors_are_not_retryable() {
        assert!(!FetchError::UnsafeUrl(gatekeeper::UnsafeUrl::PrivateOrInternal).is_retryable());
    }

    #[test]
    fn too_many_redirects_is_retryable() {
        assert!(FetchError::TooManyRedirects.is_retryable());
    }

    #[test]
    fn http_errors_are_retryable() {
        let err = FetchError::RequestFailed {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "500 - Internal Server Error".to_string(),
            retry_after: None,
        };
        assert!(err.is_retryable());
    }
}
