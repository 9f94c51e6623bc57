//! Failures surfaced by [`ApiClient`](super::ApiClient).

use reqwest::StatusCode;
use std::fmt;

use super::request::Endpoint;

/// Why no response reached the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The client-side timeout elapsed.
    Timeout,
    /// Anything else: unreachable host, DNS, refused connection, TLS.
    Network,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Timeout => write!(f, "timeout"),
            TransportKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No HTTP response was obtained.
    #[error("{kind} while requesting {url}")]
    Transport {
        url: String,
        kind: TransportKind,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP {} from {url}", .status.as_u16())]
    Status {
        status: StatusCode,
        url: String,
        endpoint: Endpoint,
        body: String,
    },

    /// The before-send hook failed; the request was never sent.
    #[error("failed to prepare request to {url}: {source}")]
    Hook {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The request could not be built (malformed URL, unencodable body).
    #[error("invalid request to {url}: {message}")]
    InvalidRequest { url: String, message: String },

    /// A successful response carried a body that is not the expected JSON.
    #[error("failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),
}

impl ApiError {
    /// Maps an error returned by `reqwest`'s `send()`.
    pub(crate) fn from_send(url: &str, source: reqwest::Error) -> Self {
        if source.is_builder() {
            return ApiError::InvalidRequest {
                url: url.to_string(),
                message: source.to_string(),
            };
        }
        let kind = if source.is_timeout() {
            TransportKind::Timeout
        } else {
            TransportKind::Network
        };
        ApiError::Transport {
            url: url.to_string(),
            kind,
            source,
        }
    }

    /// Maps an error raised while reading a response body.
    ///
    /// The client timeout covers the body too, so a stalled body is a
    /// timeout and a dropped connection is a network failure.
    pub(crate) fn from_body(url: &str, source: reqwest::Error) -> Self {
        let kind = if source.is_timeout() {
            TransportKind::Timeout
        } else {
            TransportKind::Network
        };
        ApiError::Transport {
            url: url.to_string(),
            kind,
            source,
        }
    }

    /// HTTP status of the response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// URL the failed request was sent to.
    pub fn url(&self) -> Option<&str> {
        match self {
            ApiError::Transport { url, .. }
            | ApiError::Status { url, .. }
            | ApiError::Hook { url, .. }
            | ApiError::InvalidRequest { url, .. }
            | ApiError::Decode { url, .. } => Some(url),
            ApiError::Build(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ApiError::Transport {
                kind: TransportKind::Timeout,
                ..
            }
        )
    }

    /// Response body of a status failure, for callers that show server messages.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}
