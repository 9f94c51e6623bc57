//! Decision logic for the before-send and after-receive hooks.
//!
//! Both hooks are plain functions: [`build_auth_headers`] decides what to add
//! to an outgoing request and [`classify_failure`] decides how to react to a
//! failed one. Side effects are applied by the client.

use anyhow::{Context, Result};
use log::debug;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};

use super::error::{ApiError, TransportKind};
use super::request::Endpoint;
use crate::platform::{CSRF_META_NAME, Platform};
use crate::session::{self, SessionStore};

pub const TIMEOUT_MESSAGE: &str = "Request timeout. Please try again.";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please login again.";
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";

/// Where the user is sent once their session has expired.
pub const LOGIN_PATH: &str = "/login";

pub const CSRF_HEADER: &str = "x-csrf-token";

/// What the client should do about a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave it to the caller.
    Nothing,
    /// Show the message to the user.
    Notify(&'static str),
    /// Drop the stored session, tell the user, and go to the login page.
    ExpireSession,
}

/// Headers the before-send hook adds to every request.
///
/// A missing token or missing CSRF metadata simply adds nothing. A store that
/// cannot be read, or a token that cannot be sent as a header, is an error.
pub fn build_auth_headers<S, P>(session: &S, platform: &P) -> Result<HeaderMap>
where
    S: SessionStore + ?Sized,
    P: Platform + ?Sized,
{
    let mut headers = HeaderMap::new();

    if let Some(token) = session::token(session).context("Failed to read session token")? {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Stored session token is not a valid header value")?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        debug!("Attaching bearer token {}", session::mask_token(&token));
    }

    if let Some(csrf) = platform.meta_token(CSRF_META_NAME) {
        match HeaderValue::from_str(&csrf) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(CSRF_HEADER), value);
            }
            // The CSRF header is optional; an unusable value is skipped.
            Err(_) => debug!("Ignoring CSRF token that is not a valid header value"),
        }
    }

    Ok(headers)
}

/// Decides how the after-receive hook reacts to a failure.
pub fn classify_failure(error: &ApiError) -> Action {
    match error {
        ApiError::Transport { kind, .. } => match kind {
            TransportKind::Timeout => Action::Notify(TIMEOUT_MESSAGE),
            TransportKind::Network => Action::Notify(NETWORK_ERROR_MESSAGE),
        },
        ApiError::Status {
            status, endpoint, ..
        } => classify_status(*status, *endpoint),
        ApiError::Hook { .. }
        | ApiError::InvalidRequest { .. }
        | ApiError::Decode { .. }
        | ApiError::Build(_) => Action::Nothing,
    }
}

fn classify_status(status: StatusCode, endpoint: Endpoint) -> Action {
    match status {
        StatusCode::UNAUTHORIZED if endpoint == Endpoint::Standard => Action::ExpireSession,
        // A rejected login is the caller's business.
        StatusCode::UNAUTHORIZED => Action::Nothing,
        StatusCode::FORBIDDEN => Action::Notify(FORBIDDEN_MESSAGE),
        StatusCode::NOT_FOUND => Action::Nothing,
        s if s.is_server_error() => Action::Notify(SERVER_ERROR_MESSAGE),
        _ => Action::Nothing,
    }
}
