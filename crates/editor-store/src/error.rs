use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}
