use std::error::Error as StdError;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::schema::{ConfigurationError, ConversionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Classification of a non-2xx HTTP status into a typed error kind.
pub enum StatusKind {
    BadRequest,
    Authentication,
    PermissionDenied,
    NotFound,
    Conflict,
    UnprocessableEntity,
    RateLimit,
    InternalServer,
    /// Any status the fixed mapping does not name.
    Other,
}

impl StatusKind {
    /// Fixed status-code mapping; every 5xx is [`StatusKind::InternalServer`].
    pub fn classify(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Authentication,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            409 => Self::Conflict,
            422 => Self::UnprocessableEntity,
            429 => Self::RateLimit,
            500..=599 => Self::InternalServer,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BadRequest => "bad request",
            Self::Authentication => "authentication",
            Self::PermissionDenied => "permission denied",
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::UnprocessableEntity => "unprocessable entity",
            Self::RateLimit => "rate limit",
            Self::InternalServer => "internal server",
            Self::Other => "status",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The request that triggered an error: method and path only.
pub struct RequestSummary {
    pub method: reqwest::Method,
    pub path: String,
}

impl fmt::Display for RequestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// Error envelope the API returns in status-error bodies, when decodable.
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`crate::Client`] operations.
///
/// Network-level failures carry only the originating request; status errors
/// additionally carry the numeric status and the decoded body. No variant is
/// retried by this crate.
pub enum Error {
    /// No response was received.
    #[error("connection failed for {request}")]
    Connection {
        request: RequestSummary,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The request timed out before a response arrived.
    #[error("request timed out for {request}")]
    Timeout {
        request: RequestSummary,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Non-2xx HTTP status, classified per [`StatusKind::classify`].
    #[error("{} returned {} ({}): {}", .request, .status, .kind, summarize_body(.body))]
    Status {
        kind: StatusKind,
        status: u16,
        request: RequestSummary,
        /// Decoded JSON body, or the raw text as a JSON string.
        body: Value,
        /// Typed error envelope, when the body matched it.
        detail: Option<ApiErrorBody>,
    },

    /// A 2xx response body that is not valid JSON.
    #[error("failed to decode response body for {request}: {source}")]
    Decode {
        request: RequestSummary,
        #[source]
        source: serde_json::Error,
    },

    /// HTTP client construction failed.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    /// The configured base URL is not a valid absolute URL.
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    /// A schema declaration failed to resolve.
    #[error(transparent)]
    Config(#[from] ConfigurationError),

    /// Coercing or dumping a payload failed.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A domain constructor rejected caller input.
    #[error("validation error: {0}")]
    Validation(#[from] crate::resources::ValidationError),
}

fn summarize_body(body: &Value) -> String {
    serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string())
}
