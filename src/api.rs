//! HTTP access to the results endpoint.
//!
//! The fetcher never talks to `reqwest` directly. It goes through the
//! [`HttpGet`] trait so tests can drive the pagination loop with canned
//! responses and production code can carry its own timeout policy.
//!
//! # Architecture
//!
//! - [`HttpGet`]: Core trait, one GET request returning status and body
//! - [`ReqwestClient`]: Production implementation over a shared `reqwest::Client`
//!
//! Status codes are not interpreted here; a 500 is still a successful
//! [`HttpResponse`]. Only failures to complete the exchange are reported as
//! [`TransportError`].

use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

/// Status code and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request could not be completed (connection, timeout, bad URL, body read).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Trait for issuing a single GET request.
///
/// Implementors must complete (or fail) the request before returning; the
/// fetcher awaits each call before issuing the next one.
pub trait HttpGet {
    /// Send a GET to `url` with the given headers and query parameters.
    ///
    /// # Arguments
    ///
    /// * `url` - Endpoint URL without query string
    /// * `headers` - Header name/value pairs
    /// * `params` - Query parameter name/value pairs, appended in order
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        params: &[(String, String)],
    ) -> Result<HttpResponse, TransportError>;
}

/// Build the full request URL, percent-encoding every parameter.
pub fn build_url(url: &str, params: &[(String, String)]) -> Result<Url, TransportError> {
    Url::parse_with_params(url, params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .map_err(|e| TransportError(format!("invalid url {url:?}: {e}")))
}

/// [`HttpGet`] over `reqwest`, with a per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpGet for ReqwestClient {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        params: &[(String, String)],
    ) -> Result<HttpResponse, TransportError> {
        let full_url = build_url(url, params)?;
        let mut request = self.client.get(full_url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let t0 = Instant::now();
        let response = request.send().await.map_err(|e| {
            warn!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %e, "Request failed");
            TransportError(e.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("failed to read response body: {e}")))?;

        debug!(
            status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Response received"
        );
        Ok(HttpResponse { status, body })
    }
}
