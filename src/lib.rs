//! A session-aware client for a JSON REST API.
//!
//! [`http::ApiClient`] attaches the stored bearer token to every request and
//! turns failures into user notifications: an expired session is cleared and
//! the user is sent back to the login page. The caller still receives every
//! error.

pub mod commands;
pub mod config;
pub mod http;
pub mod notify;
pub mod platform;
pub mod runtime;
pub mod session;
