//! User-facing notifications raised by the client's error handling.

#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Shows an error message to the user.
    fn error(&self, message: &str);
}

/// Writes notifications to stderr, the terminal's toast.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn error(&self, message: &str) {
        eprintln!("error: {}", message);
    }
}
