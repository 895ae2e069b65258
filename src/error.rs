use thiserror::Error;

/// Message shown to the user when the store or session backend is unreachable.
pub const CONNECTION_MESSAGE: &str = "Error connecting to the server. Please try again later";

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("{CONNECTION_MESSAGE}")]
    Connection(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("save failed: {0}")]
    Save(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("alert {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("invalid dialog state: {0}")]
    InvalidState(&'static str),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl WatchError {
    /// True for failures caused by the backend being unreachable rather than by
    /// the request itself.
    pub fn is_connection(&self) -> bool {
        match self {
            WatchError::Connection(_) => true,
            WatchError::Database(e) => mongo_unreachable(e),
            WatchError::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

/// Server selection, socket and pool failures, as opposed to query errors.
pub fn mongo_unreachable(e: &mongodb::error::Error) -> bool {
    use mongodb::error::ErrorKind;

    matches!(
        e.kind.as_ref(),
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. }
    )
}

pub type WatchResult<T> = Result<T, WatchError>;
