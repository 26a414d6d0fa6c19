use thiserror::Error;

/// Client-side failures.
///
/// Every failed server call, whatever its status or cause, is reported as
/// [`ClientError::Request`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Not connected")]
    NotConnected,

    #[error("Invalid API token")]
    InvalidToken,

    #[error("No file is open")]
    NoOpenFile,

    #[error("File name must not be empty")]
    EmptyFileName,

    #[error("Please enter both search and replace values")]
    MissingSearchOrReplace,

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(String),

    #[error("Failed to {action}: {detail}")]
    Request { action: &'static str, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
