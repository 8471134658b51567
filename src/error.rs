//! Error taxonomy for the task feed.
//!
//! Only fetch, configuration and I/O failures ever reach a command handler.
//! `InvalidDate`, `CyclicHierarchy` and `MalformedPayload` are produced inside
//! the pipeline and recovered there, surfacing as log warnings.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GanttError {
    /// The remote call did not complete or returned a non-success status.
    #[error("fetch failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    FetchFailure { status: Option<u16>, message: String },

    /// The API rejected the credential; the stored session has been cleared.
    #[error("not authorised, run `sgantt login` first")]
    Unauthorized,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("cyclic hierarchy: {0}")]
    CyclicHierarchy(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GanttError {
    fn from(e: reqwest::Error) -> Self {
        GanttError::FetchFailure {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GanttError>;
