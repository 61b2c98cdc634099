//! Collector client for the usage agent.
//!
//! Posts each flushed batch as JSON to a configured HTTPS endpoint, with a
//! static API key in a request header. The response status is returned for
//! logging; the body is never read.

pub mod wire;

use std::fmt;
use std::time::Duration;

use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use thiserror::Error;
use tracing::debug;
use ua_core::{UsageReport, UsageSink};

/// Default request timeout. Bounds how long a flush can stall sampling.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Header carrying the API key unless configured otherwise.
pub const DEFAULT_API_KEY_HEADER: &str = "ApiKey";
const JSON: &str = "application/json";

/// Reporting client errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// The configured API key header name is not a valid HTTP header name.
    #[error("invalid API key header name: {0}")]
    InvalidHeaderName(#[source] reqwest::header::InvalidHeaderName),
    /// The collector endpoint could not be used.
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// Failed to serialize the report body.
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Tunables for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Name of the header that carries the API key.
    pub api_key_header: String,
    /// Total time allowed for one request, including connect.
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Collector API client.
pub struct Client {
    http: reqwest::Client,
    endpoint: Url,
    api_key_header: HeaderName,
    api_key: HeaderValue,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key_header", &self.api_key_header)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an `https` URL, the API key is
    /// blank or not a valid header value, the header name is invalid, or the
    /// HTTP client fails to build.
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        options: &ClientOptions,
    ) -> Result<Self, ReportError> {
        let endpoint = parse_endpoint(endpoint)?;

        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ReportError::InvalidApiKey {
                reason: "API key cannot be empty",
            });
        }
        if api_key.trim().is_empty() {
            return Err(ReportError::InvalidApiKey {
                reason: "API key cannot be whitespace-only",
            });
        }
        let mut api_key =
            HeaderValue::from_str(&api_key).map_err(|_| ReportError::InvalidApiKey {
                reason: "API key contains characters not allowed in a header",
            })?;
        api_key.set_sensitive(true);

        let api_key_header = HeaderName::from_bytes(options.api_key_header.as_bytes())
            .map_err(ReportError::InvalidHeaderName)?;

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(ReportError::ClientBuild)?;

        Ok(Self {
            http,
            endpoint,
            api_key_header,
            api_key,
        })
    }

    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Builds the POST request for a report without sending it.
    pub fn build_request(&self, report: &UsageReport) -> Result<reqwest::Request, ReportError> {
        let body = wire::encode(report)?;
        let request = self
            .http
            .post(self.endpoint.clone())
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON)
            .header(self.api_key_header.clone(), self.api_key.clone())
            .body(body)
            .build()?;
        Ok(request)
    }

    /// Posts a report and returns the response status.
    pub async fn post_report(&self, report: &UsageReport) -> Result<u16, ReportError> {
        let request = self.build_request(report)?;
        let response = self.http.execute(request).await?;
        let status = response.status();
        debug!(%status, endpoint = %self.endpoint, "collector responded");
        Ok(status.as_u16())
    }
}

impl UsageSink for Client {
    type Error = ReportError;

    async fn send(&self, report: &UsageReport) -> Result<u16, ReportError> {
        self.post_report(report).await
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ReportError> {
    let url = Url::parse(endpoint).map_err(|err| ReportError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: err.to_string(),
    })?;
    if url.scheme() != "https" {
        return Err(ReportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: format!("scheme must be https, got {}", url.scheme()),
        });
    }
    Ok(url)
}
