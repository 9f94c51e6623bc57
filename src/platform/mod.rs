//! Host environment capabilities the client relies on.
//!
//! In a browser these would be a `<meta name="csrf-token">` lookup and a
//! full-page navigation. The client only sees the [`Platform`] trait, so a
//! terminal, a test, or an embedding application can supply its own.

use log::{debug, info};

use crate::runtime::Runtime;

/// Name of the metadata entry holding the CSRF token.
pub const CSRF_META_NAME: &str = "csrf-token";

/// Environment variable the console platform reads the CSRF token from.
pub const CSRF_TOKEN_ENV: &str = "API_CSRF_TOKEN";

#[cfg_attr(test, mockall::automock)]
pub trait Platform: Send + Sync {
    /// Looks up a metadata value by name. Absence is `None`, never an error.
    fn meta_token(&self, name: &str) -> Option<String>;

    /// Sends the user to `path` (e.g. the login page).
    fn navigate_to(&self, path: &str);
}

/// A platform with no metadata that ignores navigation requests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPlatform;

impl Platform for NoopPlatform {
    fn meta_token(&self, _name: &str) -> Option<String> {
        None
    }

    fn navigate_to(&self, path: &str) {
        debug!("Ignoring navigation to {}", path);
    }
}

/// Platform for the command line front-end.
///
/// Metadata comes from the environment, and navigation is rendered as a
/// hint telling the user which command takes them there.
pub struct ConsolePlatform<R: Runtime> {
    runtime: R,
}

impl<R: Runtime> ConsolePlatform<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }
}

impl<R: Runtime> Platform for ConsolePlatform<R> {
    fn meta_token(&self, name: &str) -> Option<String> {
        if name != CSRF_META_NAME {
            return None;
        }
        self.runtime
            .env_var(CSRF_TOKEN_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    fn navigate_to(&self, path: &str) {
        info!("Navigating to {}", path);
        if path == crate::http::LOGIN_PATH {
            eprintln!("Run `apiclient session login --token <TOKEN>` to sign in again.");
        } else {
            eprintln!("Continue at {}", path);
        }
    }
}
