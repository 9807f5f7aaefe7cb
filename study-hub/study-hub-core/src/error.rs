use thiserror::Error;

/// Error taxonomy for store and domain operations. Validation errors are
/// raised before any table is touched; a failed operation leaves the store
/// as it was.
#[derive(Error, Debug)]
pub enum HubError {
    #[error("{0}")]
    Validation(String),

    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HubError>;
