/// Core error type for the bot.
///
/// Adapter crates should map their specific errors into this type so the core
/// can handle failures consistently (user-facing message vs logged-and-skipped).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// The invoking user lacks the named permission. Always surfaced privately
    /// to the requester, never logged as a system fault.
    #[error("missing permission: {0}")]
    PermissionDenied(&'static str),

    #[error("dispatch failed: {0}")]
    Dispatch(String),

    #[error("feed fetch failed: {0}")]
    Fetch(String),

    #[error("feed parse failed: {0}")]
    Parse(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
