//! Command implementations for the `apiclient` binary.

mod request;
mod session;

pub use request::{RequestSpec, request};
pub use session::{login, logout, show};
