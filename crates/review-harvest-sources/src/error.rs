use thiserror::Error;

/// A fault of the adapter itself (dead browser session, unusable render
/// surface). Request-level failures are never surfaced here; adapters
/// classify them into the page status so the pagination controller can
/// apply its own termination policy.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SourceError {
    message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
