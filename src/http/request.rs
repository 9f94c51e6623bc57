//! Outgoing request description.

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

/// URL fragments that mark a request as part of the authentication flow.
const AUTH_URL_MARKERS: [&str; 2] = ["/auth/", "/login"];

/// Which kind of endpoint a request targets.
///
/// A 401 from an [`Endpoint::Auth`] request is a rejected credential the
/// caller handles; from anything else it means the stored session expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Auth,
    Standard,
}

impl Endpoint {
    /// Guesses the endpoint kind from the request URL.
    ///
    /// Substring matching misfires on unrelated paths that happen to contain
    /// `/login`; callers that know better should tag the request explicitly
    /// with [`ApiRequest::endpoint`].
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if AUTH_URL_MARKERS.iter().any(|marker| path.contains(marker)) {
            Endpoint::Auth
        } else {
            Endpoint::Standard
        }
    }
}

/// A request as the caller describes it, before the client's hooks run.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Relative to the client's base URL, or absolute.
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub endpoint: Endpoint,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let url = url.into();
        let endpoint = Endpoint::from_url(&url);
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            endpoint,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query<K: ToString, V: ToString>(mut self, pairs: &[(K, V)]) -> Self {
        self.query
            .extend(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Overrides the URL-derived endpoint kind.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }
}
