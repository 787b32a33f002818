//! Error types for dashboard documents and the dashboard store

use thiserror::Error;

/// A dashboard document or search result that cannot yield a usable dashboard
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Payload is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// Payload root is not a JSON object
    #[error("document root is not a JSON object")]
    NotAnObject,

    /// `dashboard` is missing or not an object
    #[error("document has no `dashboard` object")]
    MissingDashboard,

    /// `dashboard.title` is missing or not a string
    #[error("dashboard has no string `title`")]
    MissingTitle,

    /// Title contains nothing that survives slugification
    #[error("title {0:?} does not produce a slug")]
    EmptySlug(String),

    /// `dashboard.tags` exists but is not an array
    #[error("dashboard `tags` is not an array")]
    InvalidTags,

    /// Search result has no string `uri`
    #[error("search result has no string `uri`")]
    MissingUri,

    /// Search result `uri` does not look like `db/<slug>`
    #[error("search result uri {0:?} is not of the form db/<slug>")]
    InvalidUri(String),

    /// Search response is not a JSON array
    #[error("search response is not a JSON array")]
    NotAnArray,
}

/// Dashboard store error type
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Store answered with a non-success status
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Store answered with a body that could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] DocumentError),

    /// Base URL is unusable
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Credentials are missing or incomplete
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Dashboard does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Failure injected by [`crate::InMemoryDashboardStore`]
    #[error("injected failure: {0}")]
    Injected(String),
}

/// Result type for dashboard store operations
pub type StoreResult<T> = Result<T, StoreError>;
