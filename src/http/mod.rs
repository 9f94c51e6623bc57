//! Session-aware HTTP client for a JSON API.

mod client;
mod error;
mod hooks;
mod request;

pub use client::{ApiClient, ClientConfig, DEFAULT_TIMEOUT, RequestBuilder};
pub use error::{ApiError, TransportKind};
pub use hooks::{
    Action, CSRF_HEADER, FORBIDDEN_MESSAGE, LOGIN_PATH, NETWORK_ERROR_MESSAGE,
    SERVER_ERROR_MESSAGE, SESSION_EXPIRED_MESSAGE, TIMEOUT_MESSAGE, build_auth_headers,
    classify_failure,
};
pub use request::{ApiRequest, Endpoint};
