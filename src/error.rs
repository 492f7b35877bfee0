//! Error types for waitless.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Domain errors. Every variant carries a stable, human-readable message;
/// the web layer surfaces these verbatim and maps them to status codes.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Queue is closed")]
    QueueClosed,

    #[error("Queue is full")]
    QueueFull,

    #[error("You already hold an active token in this queue")]
    AlreadyBooked,

    #[error("No waiting tokens in this queue")]
    QueueEmpty,

    #[error("Another token is already being called")]
    AlreadyCalling,

    #[error("Token is not waiting: {0}")]
    TokenNotWaiting(String),

    #[error("Token is not currently being called")]
    TokenNotCalling,

    #[error("Token already {0}")]
    TokenTerminal(String),

    #[error("Token state changed before the swap was resolved")]
    TokenStateChanged,

    #[error("Swap request was already resolved")]
    SwapAlreadyResolved,

    #[error("Swap quota exhausted for this token")]
    SwapQuotaExceeded,

    #[error("Invalid swap target: {0}")]
    InvalidTarget(String),

    #[error("Web error: {0}")]
    Web(String),
}
