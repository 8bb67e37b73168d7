use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::retry::{is_retryable_status, with_retry_if, RetryConfig};

const NASA_API_BASE: &str = "https://api.nasa.gov/planetary/apod";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Error, Debug)]
pub enum ApodApiError {
    #[error("API request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("No entry found: {0}")]
    NotFound(String),

    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl ApodApiError {
    /// Whether trying again has any chance of a different outcome
    pub fn is_retryable(&self) -> bool {
        match self {
            ApodApiError::RequestFailed { status, .. } => {
                reqwest::StatusCode::from_u16(*status)
                    .map(is_retryable_status)
                    .unwrap_or(false)
            }
            ApodApiError::RateLimitExceeded => true,
            ApodApiError::NetworkError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApodApiError>;

/// Where the entries come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upstream {
    /// The explorer's own proxy: `/today`, `?date=`, `/range?start=&end=`
    Proxy { base_url: String },
    /// NASA's planetary/apod endpoint, called directly with an API key
    Nasa { base_url: String, api_key: String },
}

impl Upstream {
    pub fn nasa(api_key: impl Into<String>) -> Self {
        Upstream::Nasa {
            base_url: NASA_API_BASE.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn proxy(base_url: impl Into<String>) -> Self {
        Upstream::Proxy {
            base_url: base_url.into(),
        }
    }
}

/// One APOD record as it comes over the wire.
///
/// The proxy and NASA disagree on naming (`mediaType` vs `media_type`,
/// `hdUrl` vs `hdurl`), so both spellings are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApodResponse {
    pub date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, alias = "mediaType")]
    pub media_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "hdUrl")]
    pub hdurl: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub service_version: Option<String>,
}

/// A resolved request: URL plus query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub url: String,
    pub query: Vec<(&'static str, String)>,
}

pub struct ApodClient {
    client: reqwest::Client,
    upstream: Upstream,
    retry_config: RetryConfig,
}

impl ApodClient {
    pub fn new(upstream: Upstream) -> Self {
        Self::with_timeout(upstream, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(upstream: Upstream, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("apod-explorer/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            upstream,
            retry_config: RetryConfig::default(),
        }
    }

    /// Swap in a custom retry configuration
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// Today's entry, as the upstream defines "today"
    pub async fn today(&self) -> Result<ApodResponse> {
        let target = self.today_target();
        self.fetch(target, "today").await
    }

    /// The entry for one calendar day
    pub async fn by_date(&self, date: NaiveDate) -> Result<ApodResponse> {
        let target = self.date_target(date);
        self.fetch(target, &date.to_string()).await
    }

    /// Every entry in the inclusive range, in the order the upstream returns them
    pub async fn range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ApodResponse>> {
        let target = self.range_target(start, end);
        self.fetch(target, &format!("{}..{}", start, end)).await
    }

    pub fn today_target(&self) -> RequestTarget {
        match &self.upstream {
            Upstream::Proxy { base_url } => RequestTarget {
                url: format!("{}/today", trim_base(base_url)),
                query: Vec::new(),
            },
            Upstream::Nasa { base_url, api_key } => RequestTarget {
                url: trim_base(base_url).to_string(),
                query: vec![("api_key", api_key.clone())],
            },
        }
    }

    pub fn date_target(&self, date: NaiveDate) -> RequestTarget {
        let date = date.format("%Y-%m-%d").to_string();
        match &self.upstream {
            Upstream::Proxy { base_url } => RequestTarget {
                url: trim_base(base_url).to_string(),
                query: vec![("date", date)],
            },
            Upstream::Nasa { base_url, api_key } => RequestTarget {
                url: trim_base(base_url).to_string(),
                query: vec![("api_key", api_key.clone()), ("date", date)],
            },
        }
    }

    pub fn range_target(&self, start: NaiveDate, end: NaiveDate) -> RequestTarget {
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        match &self.upstream {
            Upstream::Proxy { base_url } => RequestTarget {
                url: format!("{}/range", trim_base(base_url)),
                query: vec![("start", start), ("end", end)],
            },
            Upstream::Nasa { base_url, api_key } => RequestTarget {
                url: trim_base(base_url).to_string(),
                query: vec![
                    ("api_key", api_key.clone()),
                    ("start_date", start),
                    ("end_date", end),
                ],
            },
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, target: RequestTarget, what: &str) -> Result<T> {
        debug!("GET {} ({})", target.url, what);

        with_retry_if(
            &self.retry_config,
            || self.fetch_once(&target, what),
            ApodApiError::is_retryable,
        )
        .await
    }

    /// One round trip, with the status mapped onto our error type
    async fn fetch_once<T: DeserializeOwned>(&self, target: &RequestTarget, what: &str) -> Result<T> {
        let response = self
            .client
            .get(&target.url)
            .query(&target.query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match status.as_u16() {
            404 => Err(ApodApiError::NotFound(what.to_string())),
            400 => Err(ApodApiError::InvalidRequest(error_message(&body))),
            401 | 403 => Err(ApodApiError::AuthRequired(error_message(&body))),
            429 => Err(ApodApiError::RateLimitExceeded),
            code if !status.is_success() => Err(ApodApiError::RequestFailed {
                status: code,
                message: error_message(&body),
            }),
            _ => parse_body(&body, what),
        }
    }
}

fn trim_base(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

/// Decode a success body. The proxy answers an out-of-archive date with an
/// empty body rather than an error status, which we treat as not found.
pub fn parse_body<T: DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(ApodApiError::NotFound(what.to_string()));
    }
    Ok(serde_json::from_str(trimmed)?)
}

/// Pull a human-readable message out of an error body.
///
/// NASA uses `{"code": 400, "msg": "..."}` for bad dates and
/// `{"error": {"message": "..."}}` for key problems; the proxy uses
/// `{"message": "..."}`. Anything else is passed through, shortened.
pub fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let candidates = [
            value.get("msg"),
            value.get("message"),
            value.get("error").and_then(|e| e.get("message")),
        ];
        for candidate in candidates.into_iter().flatten() {
            if let Some(text) = candidate.as_str() {
                return text.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_proxy_targets() {
        let client = ApodClient::new(Upstream::proxy("http://localhost:8080/api/apod/"));

        let today = client.today_target();
        assert_eq!(today.url, "http://localhost:8080/api/apod/today");
        assert!(today.query.is_empty());

        let by_date = client.date_target(date("2024-01-01"));
        assert_eq!(by_date.url, "http://localhost:8080/api/apod");
        assert_eq!(by_date.query, vec![("date", "2024-01-01".to_string())]);

        let range = client.range_target(date("2024-01-01"), date("2024-01-03"));
        assert_eq!(range.url, "http://localhost:8080/api/apod/range");
        assert_eq!(
            range.query,
            vec![
                ("start", "2024-01-01".to_string()),
                ("end", "2024-01-03".to_string())
            ]
        );
    }

    #[test]
    fn test_nasa_targets_carry_api_key() {
        let client = ApodClient::new(Upstream::nasa("DEMO_KEY"));

        let today = client.today_target();
        assert_eq!(today.url, NASA_API_BASE);
        assert_eq!(today.query, vec![("api_key", "DEMO_KEY".to_string())]);

        let range = client.range_target(date("2023-12-30"), date("2024-01-02"));
        assert_eq!(
            range.query,
            vec![
                ("api_key", "DEMO_KEY".to_string()),
                ("start_date", "2023-12-30".to_string()),
                ("end_date", "2024-01-02".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_nasa_shaped_entry() {
        let body = r#"{
            "copyright": "\nJane Doe\n",
            "date": "2024-01-01",
            "explanation": "A galaxy.",
            "hdurl": "https://apod.nasa.gov/apod/image/2401/big.jpg",
            "media_type": "image",
            "service_version": "v1",
            "title": "Galaxy",
            "url": "https://apod.nasa.gov/apod/image/2401/small.jpg"
        }"#;

        let entry: ApodResponse = parse_body(body, "2024-01-01").unwrap();
        assert_eq!(entry.date, "2024-01-01");
        assert_eq!(entry.media_type, "image");
        assert_eq!(
            entry.hdurl.as_deref(),
            Some("https://apod.nasa.gov/apod/image/2401/big.jpg")
        );
        assert_eq!(entry.service_version.as_deref(), Some("v1"));
    }

    #[test]
    fn test_parse_camel_case_entry() {
        let body = r#"{
            "date": "2024-01-02",
            "title": "Moon",
            "explanation": "",
            "mediaType": "video",
            "url": "https://www.youtube.com/embed/xyz",
            "hdUrl": null
        }"#;

        let entry: ApodResponse = parse_body(body, "2024-01-02").unwrap();
        assert_eq!(entry.media_type, "video");
        assert!(entry.hdurl.is_none());
        assert!(entry.copyright.is_none());
    }

    #[test]
    fn test_parse_range_array() {
        let body = r#"[
            {"date": "2024-01-01", "title": "A", "media_type": "image", "url": "a"},
            {"date": "2024-01-02", "title": "B", "media_type": "image", "url": "b"}
        ]"#;

        let entries: Vec<ApodResponse> = parse_body(body, "range").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].title, "B");
    }

    #[test]
    fn test_empty_body_is_not_found() {
        let result: Result<ApodResponse> = parse_body("  ", "1990-01-01");
        assert!(matches!(result, Err(ApodApiError::NotFound(d)) if d == "1990-01-01"));

        let result: Result<ApodResponse> = parse_body("null", "1990-01-01");
        assert!(matches!(result, Err(ApodApiError::NotFound(_))));
    }

    #[test]
    fn test_malformed_body_is_parse_error() {
        let result: Result<ApodResponse> = parse_body("{not json", "2024-01-01");
        assert!(matches!(result, Err(ApodApiError::ParseError(_))));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"code": 400, "msg": "Date must be between Jun 16, 1995 and today."}"#),
            "Date must be between Jun 16, 1995 and today."
        );
        assert_eq!(
            error_message(r#"{"error": {"code": "API_KEY_INVALID", "message": "bad key"}}"#),
            "bad key"
        );
        assert_eq!(
            error_message(r#"{"message": "NASA API is currently unavailable.", "status": 503}"#),
            "NASA API is currently unavailable."
        );
        assert_eq!(error_message("Gateway Timeout"), "Gateway Timeout");
        assert_eq!(error_message(""), "empty response body");
    }

    #[test]
    fn test_retryable_classification() {
        let server = ApodApiError::RequestFailed {
            status: 503,
            message: "down".into(),
        };
        assert!(server.is_retryable());
        assert!(ApodApiError::RateLimitExceeded.is_retryable());

        assert!(!ApodApiError::NotFound("2024-01-01".into()).is_retryable());
        assert!(!ApodApiError::InvalidRequest("bad".into()).is_retryable());
        assert!(!ApodApiError::AuthRequired("key".into()).is_retryable());
    }
}
