//! HTTP transport for the BBJ pipeline.
//!
//! # Design
//! Requests and responses are plain data. The pipeline builds an
//! `HttpRequest`, hands it to a `Transport`, and parses the `HttpResponse`
//! that comes back. Swapping the transport is how tests feed canned
//! responses without a network.
//!
//! A transport must return the body of 4xx/5xx responses exactly like a
//! success body: the service carries its structured errors in the body and
//! the status line is not meaningful to the client.

use std::time::Duration;

use crate::error::ApiError;

/// A POST request described as plain data. The service only accepts POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// One blocking request/response exchange.
///
/// Implementations return `ApiError::Unreachable` when no response was
/// received at all, and `Ok` for every response that was, whatever its status.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// `Transport` backed by a `ureq` agent.
///
/// ureq's status-code-as-error behavior is disabled so error envelopes
/// arrive as data.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// `timeout` bounds the whole exchange. `None` blocks until the server
    /// answers or the connection fails.
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder.send(request.body.as_bytes()).map_err(|e| transport_error(&request.url, e))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| ApiError::Decode(format!("failed to read response body: {e}")))?;

        Ok(HttpResponse { status, body })
    }
}

/// Sort a ureq failure into the pipeline's fault kinds.
///
/// Only failures to reach the host are `Unreachable`. A request ureq refused
/// to build never left the client, and a garbled reply came from a live
/// server.
fn transport_error(url: &str, error: ureq::Error) -> ApiError {
    match error {
        ureq::Error::Http(_) | ureq::Error::BadUri(_) => {
            ApiError::Serialization(format!("request to {url} could not be built: {error}"))
        }
        ureq::Error::Protocol(_) => ApiError::Decode(format!("malformed HTTP response from {url}: {error}")),
        other => ApiError::Unreachable {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}
