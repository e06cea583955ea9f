//! Transport layer: the abstract HTTP send capability and its reqwest-backed
//! implementation.
//!
//! The client core only consumes [`HttpTransport`]; connection pooling, TLS,
//! and socket behavior belong to the implementation. Retries are deliberately
//! absent at every layer.

use std::error::Error as StdError;

use reqwest::Method;
use serde_json::Value;
use url::Url;

#[derive(Debug, Clone)]
/// One outgoing API call, fully resolved.
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    /// Header name/value pairs, already including authorization.
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
/// Raw response as received, before any status or JSON handling.
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
/// Network-level failure: no response was received.
///
/// Timeouts are split out from other connection failures so callers can
/// surface them as a distinct error variant.
pub enum TransportFailure {
    #[error("connection failed: {0}")]
    Connection(#[source] Box<dyn StdError + Send + Sync>),

    #[error("request timed out: {0}")]
    Timeout(#[source] Box<dyn StdError + Send + Sync>),
}

/// Abstract `send(request) -> response-or-failure` capability.
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: &ApiRequest) -> Result<HttpResponse, TransportFailure>;
}

#[derive(Debug)]
/// Production transport over a blocking reqwest client.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &ApiRequest) -> Result<HttpResponse, TransportFailure> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(classify_reqwest_error)?;
        Ok(HttpResponse { status, body })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout(Box::new(err))
    } else {
        TransportFailure::Connection(Box::new(err))
    }
}
