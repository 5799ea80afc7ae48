use thiserror::Error;

use crate::alias::UrlError;

/// Type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for rhoas operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors from file operations, network operations, etc.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file could not be read or written.
    #[error("configuration error: {0}")]
    Storage(#[from] crate::config::StorageError),

    /// A `--api-gateway`, `--auth-url` or `--mas-auth-url` value was rejected.
    #[error(transparent)]
    Url(#[from] UrlError),

    /// The provider rejected the request, or the user declined consent.
    #[error("authorization denied by the identity provider: {description} ({error})")]
    AuthorizationDenied { error: String, description: String },

    /// The `state` parameter of the redirect did not match the one we sent.
    #[error("state parameter mismatch in authorization callback, possible forged or stale request")]
    StateMismatch,

    /// The login flow ran past its deadline.
    #[error("timed out waiting for login to complete, please try again")]
    DeadlineExceeded,

    /// No usable credentials for a required auth domain.
    #[error("{0}. Run `rhoas login` to log in")]
    NotLoggedIn(String),

    /// Discovery, token exchange or refresh failed on the remote side.
    #[error("{0}")]
    Remote(String),

    /// A management API request failed; the message is already mapped for the user.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Other(String),

    /// Errors that should be rare, and are not expected to be handled by the user.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Remote(e.to_string())
    }
}
