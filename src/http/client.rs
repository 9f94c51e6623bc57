//! The request pipeline: resolve URL, run the before-send hook, send, and
//! route failures through the after-receive hook.

use log::{debug, info, warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use super::error::ApiError;
use super::hooks::{self, Action, LOGIN_PATH, SESSION_EXPIRED_MESSAGE};
use super::request::{ApiRequest, Endpoint};
use crate::notify::Notifier;
use crate::platform::Platform;
use crate::session::{self, SessionStore};

/// Per-request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Static settings of an [`ApiClient`]. Fixed once the client is built.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Sent with every request, on top of the JSON content headers.
    pub default_headers: HeaderMap,
    pub timeout: Duration,
    /// Keep and send cookies. Off for bearer-token APIs.
    pub send_credentials: bool,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            default_headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
            send_credentials: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn with_credentials(mut self, send_credentials: bool) -> Self {
        self.send_credentials = send_credentials;
        self
    }
}

/// HTTP client bound to one API, carrying the user's session.
pub struct ApiClient<S, P, N> {
    client: Client,
    base_url: String,
    session: Arc<S>,
    platform: Arc<P>,
    notifier: Arc<N>,
}

impl<S, P, N> Clone for ApiClient<S, P, N> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            session: Arc::clone(&self.session),
            platform: Arc::clone(&self.platform),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<S, P, N> ApiClient<S, P, N>
where
    S: SessionStore,
    P: Platform,
    N: Notifier,
{
    #[tracing::instrument(skip_all, fields(base_url = %config.base_url))]
    pub fn new(config: ClientConfig, session: S, platform: P, notifier: N) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.extend(config.default_headers);

        let client = Client::builder()
            .user_agent(concat!("apiclient/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(config.timeout)
            .cookie_store(config.send_credentials)
            .build()
            .map_err(ApiError::Build)?;

        debug!(
            "API client ready for {:?} (timeout {:?}, credentials {})",
            base_url, config.timeout, config.send_credentials
        );

        Ok(Self {
            client,
            base_url,
            session: Arc::new(session),
            platform: Arc::new(platform),
            notifier: Arc::new(notifier),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Joins a request URL onto the base URL. Absolute URLs pass through.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") || self.base_url.is_empty() {
            return url.to_string();
        }
        if url.is_empty() {
            return self.base_url.clone();
        }
        format!("{}/{}", self.base_url, url.trim_start_matches('/'))
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder<'_, S, P, N> {
        RequestBuilder {
            client: self,
            request: Ok(ApiRequest::new(method, url)),
        }
    }

    pub fn get(&self, url: &str) -> RequestBuilder<'_, S, P, N> {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder<'_, S, P, N> {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: &str) -> RequestBuilder<'_, S, P, N> {
        self.request(Method::PUT, url)
    }

    pub fn patch(&self, url: &str) -> RequestBuilder<'_, S, P, N> {
        self.request(Method::PATCH, url)
    }

    pub fn delete(&self, url: &str) -> RequestBuilder<'_, S, P, N> {
        self.request(Method::DELETE, url)
    }

    /// Performs a GET request and deserializes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        self.get(url).send_json().await
    }

    /// Performs a POST request with a JSON body and deserializes the JSON response.
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post(url).json(body).send_json().await
    }

    pub async fn put_json<B, T>(&self, url: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.put(url).json(body).send_json().await
    }

    pub async fn patch_json<B, T>(&self, url: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.patch(url).json(body).send_json().await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        self.delete(url).send_json().await
    }

    /// Runs a request through the full pipeline.
    ///
    /// Successful (2xx) responses are returned untouched. Every failure is
    /// handled by the after-receive hook and then returned as-is.
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn execute(&self, request: ApiRequest) -> Result<Response, ApiError> {
        match self.dispatch(request).await {
            Ok(response) => Ok(response),
            Err(error) => {
                self.after_failure(&error);
                Err(error)
            }
        }
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let url = self.resolve_url(&request.url);

        let auth_headers = hooks::build_auth_headers(self.session.as_ref(), self.platform.as_ref())
            .map_err(|source| ApiError::Hook {
                url: url.clone(),
                source: source.into(),
            })?;

        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method, &url)
            .headers(request.headers)
            .headers(auth_headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::from_send(&url, e))?;

        let status = response.status();
        if status.is_success() {
            debug!("{} from {}", status, url);
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Failed to read {} error body from {}: {}", status, url, e);
                String::new()
            }
        };
        Err(ApiError::Status {
            status,
            url,
            endpoint: request.endpoint,
            body,
        })
    }

    /// Reads the body of a successful response.
    ///
    /// A body that stalls past the timeout or breaks off mid-stream goes
    /// through the same failure handling as a request that never got a
    /// response.
    pub async fn read_text(&self, response: Response) -> Result<String, ApiError> {
        let url = response.url().to_string();
        match response.text().await {
            Ok(body) => Ok(body),
            Err(e) => {
                let error = ApiError::from_body(&url, e);
                self.after_failure(&error);
                Err(error)
            }
        }
    }

    fn after_failure(&self, error: &ApiError) {
        let action = hooks::classify_failure(error);
        info!("Request failed ({}), action: {:?}", error, action);

        match action {
            Action::Nothing => {}
            Action::Notify(message) => self.notifier.error(message),
            Action::ExpireSession => self.expire_session(),
        }
    }

    fn expire_session(&self) {
        warn!("Session rejected by the server, signing out");
        if let Err(e) = session::logout(self.session.as_ref()) {
            // The caller still gets the original error.
            warn!("Failed to clear stored session: {:#}", e);
        }
        self.notifier.error(SESSION_EXPIRED_MESSAGE);
        self.platform.navigate_to(LOGIN_PATH);
    }
}

/// A request being assembled against an [`ApiClient`].
pub struct RequestBuilder<'a, S, P, N> {
    client: &'a ApiClient<S, P, N>,
    request: Result<ApiRequest, ApiError>,
}

impl<S, P, N> RequestBuilder<'_, S, P, N>
where
    S: SessionStore,
    P: Platform,
    N: Notifier,
{
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.request = self.request.map(|r| r.header(name, value));
        self
    }

    pub fn query<K: ToString, V: ToString>(mut self, pairs: &[(K, V)]) -> Self {
        self.request = self.request.map(|r| r.query(pairs));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.request = self.request.and_then(|r| {
            let url = r.url.clone();
            r.json(body).map_err(|e| ApiError::InvalidRequest {
                url,
                message: format!("body is not serializable: {}", e),
            })
        });
        self
    }

    /// Tags the request explicitly instead of trusting its URL.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.request = self.request.map(|r| r.endpoint(endpoint));
        self
    }

    pub async fn send(self) -> Result<Response, ApiError> {
        self.client.execute(self.request?).await
    }

    /// Sends the request and deserializes a JSON response body.
    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let client = self.client;
        let response = self.send().await?;
        let url = response.url().to_string();
        let body = client.read_text(response).await?;
        serde_json::from_str(&body).map_err(|source| ApiError::Decode { url, source })
    }
}
