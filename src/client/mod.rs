//! Client layer: orchestrates transport calls and maps wire payloads to
//! schema-backed models.

mod error;
mod page;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::resources::{
    LookupResource, SubscriptionsResource, TransactionalResource, ValidationError,
    VerificationResource, WatchResource,
};
use crate::transport::{ApiRequest, HttpTransport, ReqwestTransport, TransportFailure};

pub use error::{ApiErrorBody, Error, RequestSummary, StatusKind};
pub use page::{Page, PageItems, PageShape, Pages};

const DEFAULT_BASE_URL: &str = "https://api.textpulse.io";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// TextPulse API key, sent as a bearer token.
///
/// Invariant: non-empty after trimming.
pub struct ApiKey(String);

impl ApiKey {
    /// Create a validated [`ApiKey`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "api_key" });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
/// Builder for [`Client`].
///
/// Use this when you need to customize the base URL, timeout, or user-agent.
pub struct ClientBuilder {
    api_key: String,
    base_url: String,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a builder with the default base URL and no timeout/user-agent
    /// override.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: None,
            user_agent: None,
        }
    }

    /// Override the API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set an HTTP timeout applied to the entire request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the HTTP `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build a [`Client`].
    pub fn build(self) -> Result<Client, Error> {
        let api_key = ApiKey::new(self.api_key)?;
        let base_url = parse_base_url(&self.base_url)?;

        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let http = builder
            .build()
            .map_err(|err| Error::Transport(Box::new(err)))?;

        Ok(Client {
            api_key,
            base_url,
            transport: Arc::new(ReqwestTransport::new(http)),
        })
    }
}

#[derive(Clone)]
/// Synchronous TextPulse API client.
///
/// Each operation issues one blocking request and returns the decoded,
/// schema-coerced result. The client performs no retries; transient handling
/// belongs to the caller.
pub struct Client {
    api_key: ApiKey,
    base_url: Url,
    transport: Arc<dyn HttpTransport>,
}

impl Client {
    /// Create a client for the production API.
    ///
    /// For more customization, use [`Client::builder`].
    pub fn new(api_key: impl Into<String>) -> Result<Self, Error> {
        Self::builder(api_key).build()
    }

    /// Start building a client with custom settings.
    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(api_key)
    }

    /// Phone verification operations (`/v2/verification`).
    pub fn verification(&self) -> VerificationResource<'_> {
        VerificationResource { client: self }
    }

    /// Phone number lookup (`/v2/lookup`).
    pub fn lookup(&self) -> LookupResource<'_> {
        LookupResource { client: self }
    }

    /// Fraud-watch signals (`/v2/watch`).
    pub fn watch(&self) -> WatchResource<'_> {
        WatchResource { client: self }
    }

    /// Transactional messaging (`/v2/transactional`).
    pub fn transactional(&self) -> TransactionalResource<'_> {
        TransactionalResource { client: self }
    }

    /// Notification subscriptions (`/v2/subscriptions`).
    pub fn subscriptions(&self) -> SubscriptionsResource<'_> {
        SubscriptionsResource { client: self }
    }

    /// Issue one request and decode the response body.
    ///
    /// Non-2xx statuses become [`Error::Status`] with the body attached;
    /// empty 2xx bodies decode to [`Value::Null`].
    pub(crate) fn request_value(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value, Error> {
        let summary = RequestSummary {
            method: method.clone(),
            path: path.to_owned(),
        };

        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| Error::InvalidBaseUrl(format!("{}{path}", self.base_url)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let request = ApiRequest {
            method,
            url,
            headers: vec![
                ("authorization", format!("Bearer {}", self.api_key.as_str())),
                ("accept", "application/json".to_owned()),
            ],
            body,
        };

        tracing::debug!(method = %summary.method, path = %summary.path, "sending request");
        let response = self.transport.send(&request).map_err(|failure| match failure {
            TransportFailure::Timeout(source) => Error::Timeout {
                request: summary.clone(),
                source,
            },
            TransportFailure::Connection(source) => Error::Connection {
                request: summary.clone(),
                source,
            },
        })?;
        tracing::debug!(status = response.status, "received response");

        if !(200..=299).contains(&response.status) {
            let body = serde_json::from_str::<Value>(&response.body)
                .unwrap_or(Value::String(response.body));
            let detail = serde_json::from_value::<ApiErrorBody>(body.clone()).ok();
            return Err(Error::Status {
                kind: StatusKind::classify(response.status),
                status: response.status,
                request: summary,
                body,
                detail,
            });
        }

        if response.body.trim().is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str(&response.body).map_err(|source| Error::Decode {
                request: summary,
                source,
            })
        }
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, Error> {
    let parsed =
        Url::parse(base_url).map_err(|_| Error::InvalidBaseUrl(base_url.to_owned()))?;
    Ok(ensure_trailing_slash(parsed))
}

// Relative endpoint paths only join correctly under a trailing slash.
fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_owned();
        path.push('/');
        url.set_path(&path);
    }
    url
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::{FakeTransport, make_client};
    use super::*;

    fn connection_failure() -> TransportFailure {
        TransportFailure::Connection(Box::new(std::io::Error::other("refused")))
    }

    fn timeout_failure() -> TransportFailure {
        TransportFailure::Timeout(Box::new(std::io::Error::other("deadline")))
    }

    #[test]
    fn request_carries_bearer_auth_and_accept_headers() {
        let transport = FakeTransport::new(200, "{}");
        let client = make_client(transport.clone());

        client
            .request_value(Method::GET, "/v2/lookup/+30123456789", &[], None)
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(
            requests[0]
                .headers
                .contains(&("authorization", "Bearer test_key".to_owned()))
        );
        assert!(
            requests[0]
                .headers
                .contains(&("accept", "application/json".to_owned()))
        );
    }

    #[test]
    fn request_joins_path_and_query_onto_base_url() {
        let transport = FakeTransport::new(200, "{}");
        let client = make_client(transport.clone());

        let query = vec![("type".to_owned(), "line_type".to_owned())];
        client
            .request_value(Method::GET, "/v2/lookup/+30123456789", &query, None)
            .unwrap();

        let url = &transport.requests()[0].url;
        assert_eq!(url.path(), "/v2/lookup/+30123456789");
        assert_eq!(url.query(), Some("type=line_type"));
        assert_eq!(url.host_str(), Some("example.invalid"));
    }

    #[test]
    fn non_2xx_status_is_classified_with_decoded_body() {
        let transport =
            FakeTransport::new(404, r#"{"code":"not_found","message":"no verification"}"#);
        let client = make_client(transport);

        let err = client
            .request_value(Method::POST, "/v2/verification", &[], Some(json!({})))
            .unwrap_err();

        match err {
            Error::Status {
                kind,
                status,
                request,
                body,
                detail,
            } => {
                assert_eq!(kind, StatusKind::NotFound);
                assert_eq!(status, 404);
                assert_eq!(request.path, "/v2/verification");
                assert_eq!(body["code"], json!("not_found"));
                assert_eq!(
                    detail.and_then(|detail| detail.message),
                    Some("no verification".to_owned())
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unmapped_status_yields_generic_kind() {
        let transport = FakeTransport::new(418, "short and stout");
        let client = make_client(transport);

        let err = client
            .request_value(Method::GET, "/v2/subscriptions", &[], None)
            .unwrap_err();
        match err {
            Error::Status {
                kind, status, body, ..
            } => {
                assert_eq!(kind, StatusKind::Other);
                assert_eq!(status, 418);
                // Non-JSON bodies are preserved as a JSON string.
                assert_eq!(body, json!("short and stout"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn timeout_and_connection_failures_are_distinct_variants() {
        let transport = FakeTransport::new(200, "{}");
        transport.push_failure(timeout_failure());
        transport.push_failure(connection_failure());
        let client = make_client(transport);

        let err = client
            .request_value(Method::GET, "/v2/subscriptions", &[], None)
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));

        let err = client
            .request_value(Method::GET, "/v2/subscriptions", &[], None)
            .unwrap_err();
        match err {
            Error::Connection { request, .. } => {
                assert_eq!(request.path, "/v2/subscriptions");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_success_body_decodes_to_null() {
        let transport = FakeTransport::new(204, "  ");
        let client = make_client(transport);

        let value = client
            .request_value(Method::GET, "/v2/subscriptions", &[], None)
            .unwrap();
        assert_eq!(value, serde_json::Value::Null);
    }

    #[test]
    fn invalid_success_body_is_a_decode_error() {
        let transport = FakeTransport::new(200, "{ not json }");
        let client = make_client(transport);

        let err = client
            .request_value(Method::GET, "/v2/subscriptions", &[], None)
            .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn builder_validates_api_key_and_base_url() {
        assert!(matches!(
            Client::builder("   ").build(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            Client::builder("key").base_url("not a url").build(),
            Err(Error::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn builder_normalizes_base_url_with_trailing_slash() {
        let url = parse_base_url("https://example.invalid/sandbox").unwrap();
        assert_eq!(url.as_str(), "https://example.invalid/sandbox/");

        let joined = url.join("v2/verification").unwrap();
        assert_eq!(joined.path(), "/sandbox/v2/verification");
    }
}
