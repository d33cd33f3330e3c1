//! Alert delivery.
//!
//! The scan loop hands each rendered alert to every configured [`Notifier`].
//! Delivery is fire-and-forget: a failure is logged and counted, never retried.

pub mod console;
pub mod telegram;

use thiserror::Error;

pub use console::ConsoleNotifier;
pub use telegram::TelegramNotifier;

/// Errors from delivering an alert.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("rejected with HTTP {status}: {description}")]
    Rejected { status: u16, description: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("notifier setup failed: {0}")]
    Setup(String),
}

/// A channel that alert text can be delivered to.
pub trait Notifier: Send + Sync {
    /// Short kind name for logs (`telegram`, `console`).
    fn name(&self) -> &str;

    /// Where messages go, for logs. Must not contain secrets.
    fn destination(&self) -> &str;

    fn send(&self, message: &str) -> Result<(), NotifyError>;
}
