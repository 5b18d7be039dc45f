use crate::error::IngestError;
use crate::normalize::types::Record;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Status and body of one HTTP response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Anything that can GET a page of results
pub trait PageSource {
    fn get(&mut self, url: &str) -> Result<RawResponse, IngestError>;
}

/// One page of results from the API
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// URL of the following page, absent on the last page
    pub next_url: Option<String>,
    pub data: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    data: Option<Vec<Record>>,
    #[serde(default)]
    error: Option<Value>,
}

/// How transient failures are retried
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub tries: u32,
    pub backoff: Duration,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            tries: 2,
            backoff: Duration::from_secs(60),
            // throttling and server-side failures
            retryable_statuses: vec![429, 500, 501, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }
}

/// Parse a response body into a [`Page`].
///
/// An `error` member in the body, or a body that is not a page, fails.
pub fn parse_page(url: &str, status: u16, body: &str) -> Result<Page, IngestError> {
    let parsed: PageBody = serde_json::from_str(body).map_err(|err| IngestError::Parse {
        url: url.to_string(),
        status,
        reason: err.to_string(),
    })?;

    match parsed.error {
        None | Some(Value::Null) => {}
        Some(Value::String(message)) if message.is_empty() => {}
        Some(Value::String(message)) => {
            return Err(IngestError::Api {
                url: url.to_string(),
                message,
            });
        }
        Some(other) => {
            return Err(IngestError::Api {
                url: url.to_string(),
                message: other.to_string(),
            });
        }
    }

    Ok(Page {
        next_url: parsed.next.filter(|next| !next.is_empty()),
        data: parsed.data.unwrap_or_default(),
    })
}

/// GET `url`, retrying retryable statuses per `policy`, and parse the page
pub fn fetch_page<S: PageSource + ?Sized>(
    source: &mut S,
    url: &str,
    policy: &RetryPolicy,
) -> Result<Page, IngestError> {
    let mut attempt = 1;
    loop {
        let response = source.get(url)?;
        if !policy.is_retryable(response.status) {
            return parse_page(url, response.status, &response.body);
        }

        if attempt >= policy.tries {
            return Err(IngestError::RetriesExhausted {
                status: response.status,
                url: url.to_string(),
            });
        }

        warn!(
            status = response.status,
            url,
            backoff_secs = policy.backoff.as_secs(),
            "retryable HTTP status, will retry"
        );
        std::thread::sleep(policy.backoff);
        attempt += 1;
    }
}

/// Fetches pages over HTTP with a bearer token
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, IngestError> {
        let mut headers = HeaderMap::new();
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|err| IngestError::Config(format!("invalid API key: {}", err)))?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);

        // one client for every page so connections are reused
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| IngestError::Config(format!("failed to build HTTP client: {}", err)))?;

        Ok(HttpPageSource { client })
    }
}

impl PageSource for HttpPageSource {
    fn get(&mut self, url: &str) -> Result<RawResponse, IngestError> {
        let network = |source: reqwest::Error| IngestError::Network {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().map_err(network)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(network)?;

        Ok(RawResponse { status, body })
    }
}
